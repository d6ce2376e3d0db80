//! Crate-wide error type.
//!
//! [`ShopperError`] has one variant per caller-facing error class. Each layer
//! keeps its own enum and converts into this one with `?`:
//! - `Data`: malformed inputs, non-contiguous baskets, unknown identifiers.
//! - `Dimension`: hyperparameters or declared counts that do not fit the data.
//! - `Convergence`: non-finite values or invalid options during fitting.
//! - `Usage`: a results view incompatible with the posterior kind.
//!
//! With the `python-bindings` feature every variant surfaces as a Python
//! `ValueError` carrying the same message.
use crate::{
    data::errors::DataError, inference::errors::InferenceError, model::errors::ModelError,
    results::errors::UsageError,
};

pub type ShopperResult<T> = Result<T, ShopperError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShopperError {
    #[error("Data Error: {0}")]
    Data(#[from] DataError),

    #[error("Dimension Error: {0}")]
    Dimension(#[from] ModelError),

    #[error("{0}")]
    Convergence(#[from] InferenceError),

    #[error("{0}")]
    Usage(#[from] UsageError),
}

#[cfg(feature = "python-bindings")]
impl From<ShopperError> for pyo3::PyErr {
    fn from(err: ShopperError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Layer errors land in their class and keep their message.
    //
    // Given
    // -----
    // - An empty-table data error, a zero `k` model error and a usage error.
    //
    // Expect
    // ------
    // - Variants `Data`, `Dimension`, `Usage`; messages prefixed by class
    //   and containing the original text.
    fn layer_errors_map_to_classes() {
        let data: ShopperError = DataError::EmptyTable.into();
        assert!(matches!(data, ShopperError::Data(DataError::EmptyTable)));
        assert!(data.to_string().starts_with("Data Error:"));

        let dim: ShopperError = ModelError::ZeroDimension { name: "k", value: 0 }.into();
        assert!(matches!(dim, ShopperError::Dimension(_)));
        assert!(dim.to_string().contains("'k'"));

        let usage: ShopperError = UsageError::NotSampled { operation: "energy" }.into();
        assert!(usage.to_string().starts_with("Usage Error:"));
    }
}
