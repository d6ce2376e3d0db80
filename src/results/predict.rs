//! Posterior-predictive choice probabilities and accuracy.
//!
//! `predict` averages the per-row softmax over posterior draws of `θ`;
//! `score` is the share of rows whose most probable candidate is the
//! observed item. New tables are encoded through the fitted model's user and
//! item mappings (unknown ids are a data error, sessions may be new), and
//! candidates without an observed price in a new session use the fitted
//! mean log-price.
use crate::{
    data::{BasketIndex, ObservationTable},
    errors::ShopperResult,
    model::CandidatePrices,
    results::{accessor::ShopperResults, errors::UsageError},
};
use ndarray::{Array2, Axis};

impl ShopperResults {
    /// Mean choice probabilities per row of `table`, `N × C`.
    ///
    /// `draws` follows the same rule as [`ShopperResults::summary`].
    ///
    /// # Errors
    /// - `DataError` if `table` contains users or items unknown to the model.
    /// - `UsageError` for a missing or zero draw count on an approximation.
    pub fn predict(
        &self, table: &ObservationTable, draws: Option<usize>,
    ) -> ShopperResult<Array2<f64>> {
        let (index, prices) = self.encode(table)?;
        self.predict_encoded(&index, &prices, draws)
    }

    /// Accuracy of the argmax prediction on `table`, in `[0, 1]`.
    pub fn score(&self, table: &ObservationTable, draws: Option<usize>) -> ShopperResult<f64> {
        let (index, prices) = self.encode(table)?;
        let probs = self.predict_encoded(&index, &prices, draws)?;
        let hits = probs
            .axis_iter(Axis(0))
            .zip(index.items())
            .filter(|(row, &observed)| argmax(row.iter().copied()) == Some(observed))
            .count();
        Ok(hits as f64 / index.n_rows() as f64)
    }

    fn encode(&self, table: &ObservationTable) -> ShopperResult<(BasketIndex, CandidatePrices)> {
        let fitted = self.model().index();
        let index = BasketIndex::with_mappings(
            table,
            fitted.user_map().clone(),
            fitted.item_map().clone(),
            None,
        )?;
        let prices = CandidatePrices::new(
            &index,
            table.log_prices().view(),
            Some(self.model().prices().mean_log().clone()),
        );
        Ok((index, prices))
    }

    fn predict_encoded(
        &self, index: &BasketIndex, prices: &CandidatePrices, draws: Option<usize>,
    ) -> ShopperResult<Array2<f64>> {
        let model = self.model();
        let chains = self.unconstrained_draws("predict", draws)?;
        let dim = model.layout().dim();
        let mut total = Array2::<f64>::zeros((index.n_rows(), model.layout().n_items()));
        let mut count = 0usize;
        for chain in &chains {
            if chain.ncols() != dim {
                let found = chain.ncols();
                return Err(UsageError::DimensionMismatch { expected: dim, found }.into());
            }
            for theta in chain.rows() {
                total += &model.probabilities_for(index, prices, &theta.to_owned())?;
                count += 1;
            }
        }
        Ok(total / count.max(1) as f64)
    }
}

/// Index of the largest value; the first one on ties.
fn argmax(values: impl Iterator<Item = f64>) -> Option<usize> {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::TripLine,
        errors::ShopperError,
        inference::advi::MeanFieldApproximation,
        results::{
            accessor::test_support::{tiny_model, tiny_table},
            posterior::Posterior,
        },
    };
    use ndarray::Array1;

    fn point_mass(dim: usize, mu: Array1<f64>) -> Posterior {
        // ρ = -40 gives a standard deviation at the scale floor.
        let mut params = Array1::from_elem(2 * dim, -40.0);
        params.slice_mut(ndarray::s![..dim]).assign(&mu);
        Posterior::Approximation(MeanFieldApproximation::from_params(&params, vec![], 0, None))
    }

    #[test]
    // Purpose
    // -------
    // Predictions are row-stochastic and match the model's probabilities at
    // a near point-mass posterior.
    //
    // Given
    // -----
    // - The tiny model and an approximation concentrated at the initial
    //   point; the training table as input; 5 draws.
    //
    // Expect
    // ------
    // - Shape `N × C`, rows sum to 1.
    // - Close to `model.probabilities(initial)` entrywise, and `score` lies
    //   in [0, 1].
    fn predictions_are_row_stochastic() {
        let model = tiny_model();
        let dim = model.layout().dim();
        let theta0 = model.initial_point();
        let results =
            ShopperResults::new(model.clone(), point_mass(dim, theta0.clone()), 7).unwrap();

        let probs = results.predict(&tiny_table(), Some(5)).unwrap();
        assert_eq!(probs.dim(), (5, 3));
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        let exact = model.probabilities(&theta0).unwrap();
        assert!((&probs - &exact).iter().all(|d| d.abs() < 1e-6));

        let score = results.score(&tiny_table(), Some(5)).unwrap();
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    // Purpose
    // -------
    // New tables must use known users and items, and approximations need a
    // draw count.
    //
    // Given
    // -----
    // - A table with an unknown item `Z`; the training table without draws.
    //
    // Expect
    // ------
    // - `ShopperError::Data` for the unknown item.
    // - `ShopperError::Usage(DrawsRequired)` without draws.
    fn rejects_unknown_items_and_missing_draws() {
        let model = tiny_model();
        let dim = model.layout().dim();
        let theta0 = model.initial_point();
        let results = ShopperResults::new(model, point_mass(dim, theta0), 7).unwrap();

        let unknown =
            ObservationTable::new(vec![TripLine::new("u1", "Z", "s9", 1.0, 1.0)]).unwrap();
        assert!(matches!(results.predict(&unknown, Some(2)), Err(ShopperError::Data(_))));
        assert!(matches!(
            results.predict(&tiny_table(), None),
            Err(ShopperError::Usage(UsageError::DrawsRequired { operation: "predict" }))
        ));
    }

    #[test]
    // Purpose
    // -------
    // `argmax` returns the first maximum.
    //
    // Given
    // -----
    // - `[0.2, 0.5, 0.5, 0.1]` and an empty sequence.
    //
    // Expect
    // ------
    // - `Some(1)` and `None`.
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax([0.2, 0.5, 0.5, 0.1].into_iter()), Some(1));
        assert_eq!(argmax(std::iter::empty()), None);
    }
}
