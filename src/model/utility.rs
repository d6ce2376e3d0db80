//! Utilities — baseline term, basket-context recurrence, and per-row softmax.
//!
//! Purpose
//! -------
//! Evaluate the deterministic part of the Shopper model for a given
//! parameter vector: the latent tensors as views, the basket-context vector
//! `omega` for every row, and the combined utility of every candidate item.
//!
//! Key behaviors
//! -------------
//! - Baseline utility of item `c` for user `u` at log-price `lp`:
//!   `lambda[c] + theta[u]·rho[c] − (gamma[u]·beta[c])·lp`.
//! - Basket context: `omega(first row) = 0`, and inside a basket
//!   `omega(i) = omega(i−1) + alpha[item(i−1)]`. [`basket_context`] runs
//!   this fold over one basket segment.
//! - Combined utility: `baseline + (rho[c]·omega(i)) · scaling(i)`.
//! - [`candidate_utilities`] evaluates the combined utility for all `C`
//!   items at once, which is what the per-row softmax normalizes over.
//!
//! Invariants & assumptions
//! ------------------------
//! - Segments passed to [`basket_context`] are exactly one basket in row
//!   order; the fold has no state across segments.
//! - Candidate log-prices come from [`CandidatePrices`]: the price observed
//!   for that item in the row's session, else the item's mean log-price.
//!
//! Conventions
//! -----------
//! - `gamma` and `beta` are held in model space (already exponentiated).
//! - All functions allocate only their outputs.
use crate::{
    data::index::BasketIndex,
    model::{
        errors::ModelResult,
        layout::{Latent, ParamLayout},
    },
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Latent tensors of one parameter vector, ready for utility evaluation.
#[derive(Debug, Clone)]
pub struct LatentValues<'a> {
    pub rho: ArrayView2<'a, f64>,
    pub alpha: ArrayView2<'a, f64>,
    pub theta: ArrayView2<'a, f64>,
    pub lambda: ArrayView1<'a, f64>,
    pub gamma: Array2<f64>,
    pub beta: Array2<f64>,
}

impl<'a> LatentValues<'a> {
    /// Split `theta` into the six tensors and exponentiate the price blocks.
    pub fn from_theta(layout: &ParamLayout, theta: ArrayView1<'a, f64>) -> ModelResult<Self> {
        let view = |kind| layout.handle(kind).view(theta);
        Ok(LatentValues {
            rho: view(Latent::Interaction)?,
            alpha: view(Latent::Attribute)?,
            theta: view(Latent::Preference)?,
            lambda: view(Latent::Popularity)?.index_axis_move(Axis(1), 0),
            gamma: view(Latent::UserPrice)?.mapv(f64::exp),
            beta: view(Latent::ItemPrice)?.mapv(f64::exp),
        })
    }

    /// `gamma[user]·beta[c]` for every item `c`.
    pub fn price_weights(&self, user: usize) -> Array1<f64> {
        self.beta.dot(&self.gamma.row(user))
    }
}

/// Baseline utility of `item` for `user` at `log_price`.
pub fn baseline_utility(
    values: &LatentValues, user: usize, item: usize, log_price: f64,
) -> f64 {
    let rho_c = values.rho.row(item);
    values.lambda[item] + values.theta.row(user).dot(&rho_c)
        - values.gamma.row(user).dot(&values.beta.row(item)) * log_price
}

/// Combined utility: baseline plus the scaled basket-context term.
pub fn combined_utility(
    values: &LatentValues, user: usize, item: usize, log_price: f64, omega: ArrayView1<f64>,
    scaling: f64,
) -> f64 {
    baseline_utility(values, user, item, log_price)
        + values.rho.row(item).dot(&omega) * scaling
}

/// Basket-context vectors for one basket, one row per item in basket order.
///
/// Row 0 is zero; row `i` is the sum of `alpha[items[j]]` for `j < i`.
pub fn basket_context(alpha: ArrayView2<f64>, items: &[usize]) -> Array2<f64> {
    let k = alpha.ncols();
    let mut omega = Array2::<f64>::zeros((items.len(), k));
    for i in 1..items.len() {
        let (done, mut rest) = omega.view_mut().split_at(Axis(0), i);
        let mut row = rest.row_mut(0);
        row.assign(&done.row(i - 1));
        row += &alpha.row(items[i - 1]);
    }
    omega
}

/// Combined utility of every candidate item for one row.
///
/// `log_prices[c]` is the log-price candidate `c` would be bought at.
pub fn candidate_utilities(
    values: &LatentValues, user: usize, omega: ArrayView1<f64>, scaling: f64,
    log_prices: ArrayView1<f64>,
) -> Array1<f64> {
    let mut taste = values.theta.row(user).to_owned();
    taste.scaled_add(scaling, &omega);
    let mut u = values.rho.dot(&taste);
    u += &values.lambda;
    u -= &(&values.price_weights(user) * &log_prices);
    u
}

/// Log-prices of every candidate item, per session.
///
/// For session `s` and item `c` the log-price is the price observed for `c`
/// in `s` when the table has one, otherwise the mean log-price of `c`.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePrices {
    mean_log: Array1<f64>,
    by_session: Vec<Vec<(usize, f64)>>,
}

impl CandidatePrices {
    /// Build from the index and per-row log-prices of the same table.
    ///
    /// `mean_log` overrides the per-item fallback (used when encoding new
    /// tables through a fitted model); otherwise item means are computed from
    /// `log_prices`.
    pub fn new(
        index: &BasketIndex, log_prices: ArrayView1<f64>, mean_log: Option<Array1<f64>>,
    ) -> CandidatePrices {
        let n_items = index.n_items();
        let mean_log = mean_log.unwrap_or_else(|| {
            let mut sums = Array1::<f64>::zeros(n_items);
            let mut counts = Array1::<f64>::zeros(n_items);
            for (&item, &lp) in index.items().iter().zip(log_prices.iter()) {
                sums[item] += lp;
                counts[item] += 1.0;
            }
            sums.iter().zip(counts.iter()).map(|(&s, &n)| if n > 0.0 { s / n } else { 0.0 }).collect()
        });

        let mut by_session: Vec<Vec<(usize, f64)>> = vec![Vec::new(); index.n_sessions()];
        for ((&session, &item), &lp) in
            index.sessions().iter().zip(index.items()).zip(log_prices.iter())
        {
            let entries = &mut by_session[session];
            if !entries.iter().any(|&(c, _)| c == item) {
                entries.push((item, lp));
            }
        }
        CandidatePrices { mean_log, by_session }
    }

    pub fn mean_log(&self) -> &Array1<f64> {
        &self.mean_log
    }

    /// Candidate log-prices for a row in `session`.
    pub fn for_session(&self, session: usize) -> Array1<f64> {
        let mut lp = self.mean_log.clone();
        if let Some(entries) = self.by_session.get(session) {
            for &(item, price) in entries {
                lp[item] = price;
            }
        }
        lp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::observations::{ObservationTable, TripLine};
    use ndarray::{array, Array1};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The basket-context fold on the [A, B, C] / [B] scenario.
    // - Consistency between per-item and all-candidate utilities.
    // - Candidate price lookup (session price vs item mean).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Omega accumulates preceding attribute vectors and starts at zero.
    //
    // Given
    // -----
    // - alpha rows A = [1, 2], B = [10, 20], C = [100, 200].
    // - Basket [A, B, C] and basket [B].
    //
    // Expect
    // ------
    // - [0, attr(A), attr(A) + attr(B)] for the first basket; [0] for the
    //   second.
    fn basket_context_accumulates_preceding_attributes() {
        let alpha = array![[1.0, 2.0], [10.0, 20.0], [100.0, 200.0]];

        let first = basket_context(alpha.view(), &[0, 1, 2]);
        assert_eq!(first, array![[0.0, 0.0], [1.0, 2.0], [11.0, 22.0]]);

        let second = basket_context(alpha.view(), &[1]);
        assert_eq!(second, array![[0.0, 0.0]]);
    }

    #[test]
    // Purpose
    // -------
    // The vectorized candidate utilities agree with the scalar definition.
    //
    // Given
    // -----
    // - U = 1, C = 3, K = 2, P = 1 and a non-trivial θ.
    // - omega = [0.5, -1], scaling 0.5, candidate log-prices [0.1, 0.2, 0.3].
    //
    // Expect
    // ------
    // - `candidate_utilities[c] == combined_utility(c, lp[c])` for all c.
    fn candidate_utilities_match_scalar_definition() {
        let layout = ParamLayout::new(1, 3, 2, 1);
        let theta: Array1<f64> = (0..layout.dim()).map(|i| (i as f64 * 0.37).sin()).collect();
        let values = LatentValues::from_theta(&layout, theta.view()).unwrap();
        let omega = array![0.5, -1.0];
        let lp = array![0.1, 0.2, 0.3];

        let all = candidate_utilities(&values, 0, omega.view(), 0.5, lp.view());
        for c in 0..3 {
            let single = combined_utility(&values, 0, c, lp[c], omega.view(), 0.5);
            assert!((all[c] - single).abs() < 1e-12, "item {c}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Candidate prices use the session price when observed and the item
    // mean otherwise.
    //
    // Given
    // -----
    // - Item A bought at price e in s1 and e^3 in s2; item B only in s1.
    //
    // Expect
    // ------
    // - Session s2 candidates: A at 3 (observed), B at its mean 2.
    fn candidate_prices_prefer_session_observations() {
        let e = std::f64::consts::E;
        let table = ObservationTable::new(vec![
            TripLine::new("u1", "A", "s1", 1.0, e),
            TripLine::new("u1", "B", "s1", 1.0, e * e),
            TripLine::new("u2", "A", "s2", 1.0, e * e * e),
        ])
        .unwrap();
        let index = BasketIndex::build(&table).unwrap();
        let prices = CandidatePrices::new(&index, table.log_prices().view(), None);

        let s2 = index.session_map().encode("s2").unwrap();
        let lp = prices.for_session(s2);
        assert!((lp[0] - 3.0).abs() < 1e-12);
        assert!((lp[1] - 2.0).abs() < 1e-12);
        assert!((prices.mean_log()[0] - 2.0).abs() < 1e-12);
    }
}
