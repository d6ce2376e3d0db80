//! Shopper hyperparameters — latent sizes and prior parameters.
//!
//! Purpose
//! -------
//! Collect everything fixed at model construction: the latent dimensions `K`
//! and `price_dim`, the variances of the four Normal priors, and the
//! shape/rate pairs of the two Gamma priors. Optionally, the caller may
//! declare the expected number of users and items; the model builder then
//! checks those against the encoded data.
//!
//! Key behaviors
//! -------------
//! - [`ShopperConfig::default`] reproduces the reference hyperparameters
//!   (`k = 50`, `price_dim = 10`, unit variances, Gamma(100, 1000)).
//! - [`ShopperConfig::validate`] rejects zero dimensions and non-finite or
//!   non-positive prior parameters.
//! - Configs deserialize from TOML with `#[serde(default)]`, so a file only
//!   needs the keys it overrides.
//!
//! Conventions
//! -----------
//! - `*_var` fields are variances; the Normal prior standard deviation is
//!   `sqrt(var)`.
//! - Gamma priors use the shape/rate parameterization (mean = shape / rate).
use std::path::Path;

use crate::model::errors::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// Hyperparameters of the Shopper model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShopperConfig {
    /// Number of latent factors for interaction, attribute, and preference vectors.
    pub k: usize,
    /// Number of latent factors for the two price-sensitivity tensors.
    pub price_dim: usize,
    pub rho_var: f64,
    pub alpha_var: f64,
    pub theta_var: f64,
    pub lambda_var: f64,
    pub gamma_shape: f64,
    pub gamma_rate: f64,
    pub beta_shape: f64,
    pub beta_rate: f64,
    /// Expected number of distinct users; checked against the data when set.
    pub n_users: Option<usize>,
    /// Expected number of distinct items; checked against the data when set.
    pub n_items: Option<usize>,
}

impl Default for ShopperConfig {
    fn default() -> Self {
        ShopperConfig {
            k: 50,
            price_dim: 10,
            rho_var: 1.0,
            alpha_var: 1.0,
            theta_var: 1.0,
            lambda_var: 1.0,
            gamma_shape: 100.0,
            gamma_rate: 1000.0,
            beta_shape: 100.0,
            beta_rate: 1000.0,
            n_users: None,
            n_items: None,
        }
    }
}

impl ShopperConfig {
    /// Config with the given latent sizes and default priors.
    pub fn with_dims(k: usize, price_dim: usize) -> ShopperConfig {
        ShopperConfig { k, price_dim, ..ShopperConfig::default() }
    }

    /// Check dimensions and prior parameters.
    ///
    /// # Errors
    /// - [`ModelError::ZeroDimension`] if `k` or `price_dim` is zero.
    /// - [`ModelError::InvalidHyperparameter`] for a non-finite or
    ///   non-positive variance, shape, or rate.
    pub fn validate(&self) -> ModelResult<()> {
        if self.k == 0 {
            return Err(ModelError::ZeroDimension { name: "k", value: self.k });
        }
        if self.price_dim == 0 {
            return Err(ModelError::ZeroDimension { name: "price_dim", value: self.price_dim });
        }
        let positives = [
            ("rho_var", self.rho_var),
            ("alpha_var", self.alpha_var),
            ("theta_var", self.theta_var),
            ("lambda_var", self.lambda_var),
            ("gamma_shape", self.gamma_shape),
            ("gamma_rate", self.gamma_rate),
            ("beta_shape", self.beta_shape),
            ("beta_rate", self.beta_rate),
        ];
        for (name, value) in positives {
            if !value.is_finite() {
                return Err(ModelError::InvalidHyperparameter {
                    name,
                    value,
                    reason: "must be finite",
                });
            }
            if value <= 0.0 {
                return Err(ModelError::InvalidHyperparameter {
                    name,
                    value,
                    reason: "must be strictly positive",
                });
            }
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    /// [`ModelError::InvalidConfig`] if the document does not parse, plus any
    /// [`ShopperConfig::validate`] error.
    pub fn from_toml_str(text: &str) -> ModelResult<ShopperConfig> {
        let config: ShopperConfig = toml::from_str(text)
            .map_err(|e| ModelError::InvalidConfig { reason: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_path(path: impl AsRef<Path>) -> ModelResult<ShopperConfig> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ModelError::InvalidConfig {
            reason: format!("{}: {e}", path.display()),
        })?;
        ShopperConfig::from_toml_str(&text)
    }
}
