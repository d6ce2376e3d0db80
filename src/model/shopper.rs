//! ShopperModel — the re-evaluable probabilistic graph over one observation set.
//!
//! Purpose
//! -------
//! Own everything needed to evaluate the Shopper joint density at any
//! unconstrained parameter vector `θ`: the basket index, per-row
//! log-prices, the candidate price table, the parameter layout (explicit
//! handles to the six latent tensors), and their priors.
//!
//! Key behaviors
//! -------------
//! - `log p(θ | data) = Σ_blocks log prior + Σ_rows [u_{y_i}(i) − logsumexp_c u_c(i)]`,
//!   where `u_c(i)` is the combined utility of candidate `c` in row `i`
//!   (see [`crate::model::utility`]) and `y_i` the observed item.
//! - The analytic gradient backpropagates through the softmax, the
//!   basket-context fold (a reverse scan inside each basket), and the
//!   log-space price tensors.
//! - Baskets are independent given `θ`: segments are processed in fixed-size
//!   chunks on the rayon pool and reduced in chunk order, so results do not
//!   depend on the number of worker threads.
//!
//! Invariants & assumptions
//! ------------------------
//! - The six tensors are sized once at construction from `U`, `C`, `K`,
//!   `price_dim` and never resized; `θ` must match [`ParamLayout::dim`].
//! - Declared `n_users` / `n_items` in the config must equal the encoded
//!   counts.
//!
//! Downstream usage
//! ----------------
//! - Implements [`LogDensity`], which is all the inference engines see.
//! - Results code uses [`ShopperModel::probabilities_for`] to score new
//!   tables encoded through the model's mappings.
//!
//! Testing notes
//! -------------
//! - The analytic gradient is checked against `finitediff` central
//!   differences on a small random problem.
//! - Probabilities sum to one per row, and the density is invariant to
//!   the chunking used for parallel evaluation.
use std::ops::Range;

use crate::{
    data::{index::BasketIndex, observations::ObservationTable},
    errors::ShopperResult,
    model::{
        config::ShopperConfig,
        errors::{ModelError, ModelResult},
        layout::{Latent, LatentHandle, ParamLayout},
        priors::Prior,
        utility::{CandidatePrices, LatentValues, basket_context, candidate_utilities},
    },
    optimization::{
        errors::OptResult,
        loglik_optimizer::{Grad, LogDensity, Theta},
        numerical_stability::softmax_in_place,
    },
};
use ndarray::{Array1, Array2, ArrayView1, Axis, linalg::general_mat_mul, s};
use rayon::prelude::*;
use tracing::info;

/// Lower bound on baskets per parallel work unit.
const MIN_CHUNK: usize = 64;

/// The Shopper model bound to one observation set.
#[derive(Debug, Clone)]
pub struct ShopperModel {
    config: ShopperConfig,
    layout: ParamLayout,
    priors: Vec<Prior>,
    index: BasketIndex,
    log_prices: Array1<f64>,
    prices: CandidatePrices,
    chunk: usize,
}

impl ShopperModel {
    /// Index `table` and build the model.
    ///
    /// # Errors
    /// - `DataError` if baskets are not contiguous.
    /// - `ModelError` for invalid hyperparameters or count mismatches.
    pub fn build(table: &ObservationTable, config: ShopperConfig) -> ShopperResult<ShopperModel> {
        let index = BasketIndex::build(table)?;
        Ok(ShopperModel::new(index, table.log_prices(), config)?)
    }

    /// Build the model from an existing index and per-row log-prices.
    ///
    /// # Errors
    /// - [`ModelError::NoObservations`] for an empty index.
    /// - [`ModelError::CountMismatch`] when declared user/item counts or the
    ///   number of log-prices disagree with the index.
    /// - Validation errors from [`ShopperConfig::validate`] and the priors.
    pub fn new(
        index: BasketIndex, log_prices: Array1<f64>, config: ShopperConfig,
    ) -> ModelResult<ShopperModel> {
        config.validate()?;
        if index.n_rows() == 0 {
            return Err(ModelError::NoObservations);
        }
        if log_prices.len() != index.n_rows() {
            return Err(ModelError::CountMismatch {
                entity: "log-price",
                declared: log_prices.len(),
                observed: index.n_rows(),
            });
        }
        check_count("user", config.n_users, index.n_users())?;
        check_count("item", config.n_items, index.n_items())?;

        let layout = ParamLayout::new(index.n_users(), index.n_items(), config.k, config.price_dim);
        // Indexed by `Latent as usize`, like the layout handles.
        let priors = Latent::ALL
            .iter()
            .map(|&kind| Prior::for_latent(kind, &config))
            .collect::<ModelResult<Vec<_>>>()?;
        let prices = CandidatePrices::new(&index, log_prices.view(), None);
        let chunk = MIN_CHUNK.max(index.n_baskets().div_ceil(MIN_CHUNK));

        info!(
            n_users = index.n_users(),
            n_items = index.n_items(),
            n_rows = index.n_rows(),
            n_baskets = index.n_baskets(),
            k = config.k,
            price_dim = config.price_dim,
            "Done building the Shopper model."
        );
        Ok(ShopperModel { config, layout, priors, index, log_prices, prices, chunk })
    }

    // ---- Accessors ----

    pub fn config(&self) -> &ShopperConfig {
        &self.config
    }

    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    /// Handle of one latent tensor inside `θ`.
    pub fn latent(&self, kind: Latent) -> &LatentHandle {
        self.layout.handle(kind)
    }

    pub fn prior(&self, kind: Latent) -> &Prior {
        &self.priors[kind as usize]
    }

    pub fn index(&self) -> &BasketIndex {
        &self.index
    }

    pub fn log_prices(&self) -> &Array1<f64> {
        &self.log_prices
    }

    pub fn prices(&self) -> &CandidatePrices {
        &self.prices
    }

    /// Prior-mean starting point: zeros for Normal blocks, `ln(shape/rate)`
    /// for the log-Gamma blocks.
    pub fn initial_point(&self) -> Theta {
        let mut theta = Theta::zeros(self.layout.dim());
        for handle in self.layout.handles() {
            let start = self.prior(handle.kind).initial_value();
            theta.slice_mut(s![handle.range()]).fill(start);
        }
        theta
    }

    /// Override the number of baskets per parallel work unit.
    #[cfg(test)]
    pub(crate) fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk.max(1);
        self
    }

    // ---- Deterministic graph quantities ----

    /// Basket-context vectors for every row, `N × K`.
    pub fn basket_context(&self, theta: &Theta) -> ModelResult<Array2<f64>> {
        self.layout.check(theta.view())?;
        let values = LatentValues::from_theta(&self.layout, theta.view())?;
        let mut out = Array2::<f64>::zeros((self.index.n_rows(), self.layout.k()));
        for seg in self.index.segments() {
            let omega = basket_context(values.alpha, &self.index.items()[seg.clone()]);
            out.slice_mut(s![seg.clone(), ..]).assign(&omega);
        }
        Ok(out)
    }

    /// Combined utility of every candidate item for every row, `N × C`.
    pub fn utilities(&self, theta: &Theta) -> ModelResult<Array2<f64>> {
        self.row_utilities(&self.index, &self.prices, theta)
    }

    /// Per-row softmax over candidate utilities, `N × C`.
    pub fn probabilities(&self, theta: &Theta) -> ModelResult<Array2<f64>> {
        self.probabilities_for(&self.index, &self.prices, theta)
    }

    /// Per-row choice probabilities for a table encoded through this model's
    /// mappings.
    pub fn probabilities_for(
        &self, index: &BasketIndex, prices: &CandidatePrices, theta: &Theta,
    ) -> ModelResult<Array2<f64>> {
        let mut probs = self.row_utilities(index, prices, theta)?;
        for row in probs.axis_iter_mut(Axis(0)) {
            softmax_in_place(row);
        }
        Ok(probs)
    }

    fn row_utilities(
        &self, index: &BasketIndex, prices: &CandidatePrices, theta: &Theta,
    ) -> ModelResult<Array2<f64>> {
        self.layout.check(theta.view())?;
        let values = LatentValues::from_theta(&self.layout, theta.view())?;
        let mut out = Array2::<f64>::zeros((index.n_rows(), self.layout.n_items()));
        for seg in index.segments() {
            let user = index.users()[seg.start];
            let lp = prices.for_session(index.sessions()[seg.start]);
            let omega = basket_context(values.alpha, &index.items()[seg.clone()]);
            for (i, row) in seg.clone().enumerate() {
                let u = candidate_utilities(
                    &values,
                    user,
                    omega.row(i),
                    index.scaling()[row],
                    lp.view(),
                );
                out.row_mut(row).assign(&u);
            }
        }
        Ok(out)
    }

    // ---- Density ----

    /// Sum of the prior log densities of every coordinate.
    pub fn log_prior(&self, theta: &Theta) -> ModelResult<f64> {
        self.layout.check(theta.view())?;
        Ok(self
            .layout
            .handles()
            .iter()
            .map(|h| {
                let prior = self.prior(h.kind);
                theta.slice(s![h.range()]).iter().map(|&x| prior.ln_density(x)).sum::<f64>()
            })
            .sum())
    }

    /// Choice log-likelihood `Σ_i ln p(y_i | row i, θ)`.
    pub fn log_likelihood(&self, theta: &Theta) -> ModelResult<f64> {
        self.layout.check(theta.view())?;
        let values = LatentValues::from_theta(&self.layout, theta.view())?;
        let partial: Vec<f64> = self
            .index
            .segments()
            .par_chunks(self.chunk)
            .map(|segs| segs.iter().map(|seg| self.segment(&values, seg.clone(), None)).sum())
            .collect();
        Ok(partial.into_iter().sum())
    }

    /// Unnormalized log posterior: prior plus likelihood.
    pub fn log_density(&self, theta: &Theta) -> ModelResult<f64> {
        Ok(self.log_prior(theta)? + self.log_likelihood(theta)?)
    }

    /// Gradient of [`ShopperModel::log_density`] with respect to `θ`.
    pub fn gradient(&self, theta: &Theta) -> ModelResult<Grad> {
        Ok(self.log_density_and_gradient(theta)?.1)
    }

    /// Log density and its gradient from one pass over the data.
    pub fn log_density_and_gradient(&self, theta: &Theta) -> ModelResult<(f64, Grad)> {
        self.layout.check(theta.view())?;
        let values = LatentValues::from_theta(&self.layout, theta.view())?;
        let partial: Vec<(f64, Partials)> = self
            .index
            .segments()
            .par_chunks(self.chunk)
            .map(|segs| {
                let mut parts = Partials::zeros(&self.layout);
                let ll = segs
                    .iter()
                    .map(|seg| self.segment(&values, seg.clone(), Some(&mut parts)))
                    .sum::<f64>();
                (ll, parts)
            })
            .collect();

        let mut ll = 0.0;
        let mut total = Partials::zeros(&self.layout);
        for (chunk_ll, parts) in partial {
            ll += chunk_ll;
            total.merge(&parts);
        }
        let mut grad = total.flatten(&self.layout, &values);

        let mut lp = 0.0;
        for h in self.layout.handles() {
            let prior = self.prior(h.kind);
            let block = theta.slice(s![h.range()]);
            for (g, &x) in grad.slice_mut(s![h.range()]).iter_mut().zip(block.iter()) {
                lp += prior.ln_density(x);
                *g += prior.ln_density_grad(x);
            }
        }
        Ok((lp + ll, grad))
    }

    /// Log-likelihood of one basket; accumulates model-space partials when
    /// `parts` is given.
    fn segment(
        &self, values: &LatentValues, seg: Range<usize>, mut parts: Option<&mut Partials>,
    ) -> f64 {
        let user = self.index.users()[seg.start];
        let lp = self.prices.for_session(self.index.sessions()[seg.start]);
        let items = &self.index.items()[seg.clone()];
        let scaling = &self.index.scaling()[seg];
        let omega = basket_context(values.alpha, items);
        let mut d_omega = Array2::<f64>::zeros(omega.raw_dim());

        let mut ll = 0.0;
        for (i, (&item, &sf)) in items.iter().zip(scaling).enumerate() {
            let mut u = candidate_utilities(values, user, omega.row(i), sf, lp.view());
            let chosen = u[item];
            let lse = softmax_in_place(u.view_mut());
            ll += chosen - lse;

            let Some(parts) = parts.as_deref_mut() else { continue };
            // u now holds p; turn it into onehot(y) − p.
            let mut g = u;
            g.mapv_inplace(|p| -p);
            g[item] += 1.0;

            let mut taste = values.theta.row(user).to_owned();
            taste.scaled_add(sf, &omega.row(i));
            parts.lambda += &g;
            general_mat_mul(1.0, &column(g.view()), &taste.view().insert_axis(Axis(0)), 1.0, &mut parts.rho);

            let rho_t_g = values.rho.t().dot(&g);
            parts.theta.row_mut(user).scaled_add(1.0, &rho_t_g);
            d_omega.row_mut(i).assign(&(rho_t_g * sf));

            let w = &g * &lp;
            parts.gamma.row_mut(user).scaled_add(-1.0, &values.beta.t().dot(&w));
            let gamma_u = values.gamma.row(user).insert_axis(Axis(0));
            general_mat_mul(-1.0, &column(w.view()), &gamma_u, 1.0, &mut parts.beta);
        }

        if let Some(parts) = parts {
            // omega(i) sums alpha over earlier rows, so alpha[item_j] collects
            // d_omega of every later row.
            let mut carry = Array1::<f64>::zeros(omega.ncols());
            for (i, &item) in items.iter().enumerate().rev() {
                parts.alpha.row_mut(item).scaled_add(1.0, &carry);
                carry += &d_omega.row(i);
            }
        }
        ll
    }
}

impl LogDensity for ShopperModel {
    fn dim(&self) -> usize {
        self.layout.dim()
    }

    fn value(&self, theta: &Theta) -> OptResult<f64> {
        Ok(self.log_density(theta)?)
    }

    fn check(&self, theta: &Theta) -> OptResult<()> {
        Ok(self.layout.check(theta.view())?)
    }

    fn grad(&self, theta: &Theta) -> OptResult<Grad> {
        Ok(self.gradient(theta)?)
    }
}

// ---- Helpers ----

fn check_count(entity: &'static str, declared: Option<usize>, observed: usize) -> ModelResult<()> {
    match declared {
        Some(declared) if declared != observed => {
            Err(ModelError::CountMismatch { entity, declared, observed })
        }
        _ => Ok(()),
    }
}

fn column(v: ArrayView1<f64>) -> ndarray::ArrayView2<f64> {
    v.insert_axis(Axis(1))
}

/// Model-space partial derivatives of the log-likelihood per latent tensor.
struct Partials {
    rho: Array2<f64>,
    alpha: Array2<f64>,
    theta: Array2<f64>,
    lambda: Array1<f64>,
    gamma: Array2<f64>,
    beta: Array2<f64>,
}

impl Partials {
    fn zeros(layout: &ParamLayout) -> Partials {
        let (u, c, k, p) = (layout.n_users(), layout.n_items(), layout.k(), layout.price_dim());
        Partials {
            rho: Array2::zeros((c, k)),
            alpha: Array2::zeros((c, k)),
            theta: Array2::zeros((u, k)),
            lambda: Array1::zeros(c),
            gamma: Array2::zeros((u, p)),
            beta: Array2::zeros((c, p)),
        }
    }

    fn merge(&mut self, other: &Partials) {
        self.rho += &other.rho;
        self.alpha += &other.alpha;
        self.theta += &other.theta;
        self.lambda += &other.lambda;
        self.gamma += &other.gamma;
        self.beta += &other.beta;
    }

    /// Lay the partials out like `θ`, applying `d/dη = exp(η)·d/dx` to the
    /// log-space price blocks.
    fn flatten(mut self, layout: &ParamLayout, values: &LatentValues) -> Grad {
        self.gamma *= &values.gamma;
        self.beta *= &values.beta;
        let mut grad = Grad::zeros(layout.dim());
        let blocks: [(Latent, ndarray::ArrayView2<f64>); 6] = [
            (Latent::Interaction, self.rho.view()),
            (Latent::Attribute, self.alpha.view()),
            (Latent::Preference, self.theta.view()),
            (Latent::Popularity, self.lambda.view().insert_axis(Axis(1))),
            (Latent::UserPrice, self.gamma.view()),
            (Latent::ItemPrice, self.beta.view()),
        ];
        for (kind, block) in blocks {
            let range = layout.handle(kind).range();
            for (dst, &src) in grad.slice_mut(s![range]).iter_mut().zip(block.iter()) {
                *dst = src;
            }
        }
        grad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::observations::TripLine;
    use finitediff::FiniteDiff;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Model construction logging inputs (counts, dimensions) and count checks.
    // - Omega placement for the [A,B,C] / [B] scenario.
    // - Per-row softmax mass and analytic-vs-numeric gradients.
    // - Independence of the density from the parallel chunk size.
    // -------------------------------------------------------------------------

    fn scenario_table() -> ObservationTable {
        ObservationTable::new(vec![
            TripLine::new("u1", "A", "s1", 1.0, 2.0),
            TripLine::new("u1", "B", "s1", 1.0, 3.0),
            TripLine::new("u1", "C", "s1", 2.0, 1.5),
            TripLine::new("u2", "B", "s2", 1.0, 2.5),
        ])
        .unwrap()
    }

    fn wiggle(model: &ShopperModel, scale: f64) -> Theta {
        let mut theta = model.initial_point();
        for (i, t) in theta.iter_mut().enumerate() {
            *t += scale * ((i as f64) * 0.731).sin();
        }
        theta
    }

    #[test]
    // Purpose
    // -------
    // Omega vectors are zero at basket starts and accumulate attributes.
    //
    // Given
    // -----
    // - Baskets [A, B, C] (u1) and [B] (u2), K = 2, a non-trivial θ.
    //
    // Expect
    // ------
    // - Rows 0 and 3 are zero; row 1 = attr(A); row 2 = attr(A) + attr(B).
    fn basket_context_matches_two_basket_scenario() {
        let model = ShopperModel::build(&scenario_table(), ShopperConfig::with_dims(2, 1)).unwrap();
        let theta = wiggle(&model, 0.5);
        let alpha = model.latent(Latent::Attribute).view(theta.view()).unwrap();
        let omega = model.basket_context(&theta).unwrap();

        assert!(omega.row(0).iter().all(|&v| v == 0.0));
        assert!(omega.row(3).iter().all(|&v| v == 0.0));
        assert_eq!(omega.row(1), alpha.row(0));
        assert_eq!(omega.row(2), &alpha.row(0) + &alpha.row(1));
    }

    #[test]
    // Purpose
    // -------
    // Every row's choice distribution sums to one.
    //
    // Given
    // -----
    // - The scenario model at a perturbed θ.
    //
    // Expect
    // ------
    // - Row sums of `probabilities` equal 1 within 1e-12.
    fn probabilities_sum_to_one_per_row() {
        let model = ShopperModel::build(&scenario_table(), ShopperConfig::with_dims(3, 2)).unwrap();
        let probs = model.probabilities(&wiggle(&model, 0.8)).unwrap();
        assert_eq!(probs.dim(), (4, 3));
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // The analytic gradient matches central finite differences.
    //
    // Given
    // -----
    // - The scenario model with K = 2, P = 2 and priors with unit variances.
    //
    // Expect
    // ------
    // - Max abs difference below 1e-5, and the combined density agrees with
    //   `log_density`.
    fn analytic_gradient_matches_finite_differences() {
        let model = ShopperModel::build(&scenario_table(), ShopperConfig::with_dims(2, 2)).unwrap();
        let theta = wiggle(&model, 0.3);
        let (value, grad) = model.log_density_and_gradient(&theta).unwrap();
        assert!((value - model.log_density(&theta).unwrap()).abs() < 1e-10);

        let numeric = theta.central_diff(&|t: &Theta| model.log_density(t).unwrap());
        for (i, (a, n)) in grad.iter().zip(numeric.iter()).enumerate() {
            assert!((a - n).abs() < 1e-5, "coordinate {i}: analytic {a}, numeric {n}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Parallel chunking does not change results.
    //
    // Given
    // -----
    // - The scenario model evaluated with chunk sizes 1 and the default.
    //
    // Expect
    // ------
    // - Identical log densities and gradients.
    fn density_is_independent_of_chunking() {
        let model = ShopperModel::build(&scenario_table(), ShopperConfig::with_dims(2, 1)).unwrap();
        let theta = wiggle(&model, 0.4);
        let (v1, g1) = model.log_density_and_gradient(&theta).unwrap();
        let per_basket = model.clone().with_chunk(1);
        let (v2, g2) = per_basket.log_density_and_gradient(&theta).unwrap();
        assert!((v1 - v2).abs() < 1e-12);
        assert!(g1.iter().zip(g2.iter()).all(|(a, b)| (a - b).abs() < 1e-12));
    }

    #[test]
    // Purpose
    // -------
    // Declared counts that disagree with the data are dimension errors.
    //
    // Given
    // -----
    // - A config declaring 5 items for a 3-item table.
    //
    // Expect
    // ------
    // - `ModelError::CountMismatch { entity: "item", declared: 5, observed: 3 }`.
    fn declared_item_count_must_match_data() {
        let table = scenario_table();
        let index = BasketIndex::build(&table).unwrap();
        let config = ShopperConfig { n_items: Some(5), ..ShopperConfig::with_dims(2, 1) };
        let err = ShopperModel::new(index, table.log_prices(), config).unwrap_err();
        assert_eq!(err, ModelError::CountMismatch { entity: "item", declared: 5, observed: 3 });
    }

    #[test]
    // Purpose
    // -------
    // A θ of the wrong length is rejected through the `LogDensity` seam.
    //
    // Given
    // -----
    // - A θ one entry short.
    //
    // Expect
    // ------
    // - `check` fails with a wrapped `ThetaLengthMismatch`.
    fn log_density_rejects_wrong_length() {
        let model = ShopperModel::build(&scenario_table(), ShopperConfig::with_dims(2, 1)).unwrap();
        let theta = Theta::zeros(model.dim() - 1);
        assert!(LogDensity::check(&model, &theta).is_err());
    }
}
