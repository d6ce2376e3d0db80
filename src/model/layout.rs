//! Parameter layout — the six latent tensors as handles into one flat vector.
//!
//! Purpose
//! -------
//! Inference works on a single unconstrained vector `θ`. This module fixes
//! where each latent tensor lives inside `θ`, how it is shaped, and how its
//! unconstrained coordinates map back to model space.
//!
//! Layout
//! ------
//! `θ = [rho (C×K) | alpha (C×K) | theta (U×K) | lambda (C) | log gamma (U×P) | log beta (C×P)]`
//!
//! All blocks are row-major. The two price-sensitivity tensors are stored
//! as logarithms, so `gamma = exp(θ_gamma)` stays strictly positive for any
//! real input.
//!
//! Conventions
//! -----------
//! - Handles are plain offsets; they never borrow `θ`. Views are produced on
//!   demand with [`LatentHandle::view`].
//! - Scalar parameter names follow `name[row, col]` for matrices and
//!   `name[row]` for vectors, matching the summary table.
use crate::model::errors::{ModelError, ModelResult};
use ndarray::{s, Array1, ArrayView1, ArrayView2};

/// The six latent tensors of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Latent {
    /// Item-interaction vectors `rho` (C×K).
    Interaction,
    /// Item-attribute vectors `alpha` (C×K).
    Attribute,
    /// User-preference vectors `theta` (U×K).
    Preference,
    /// Item popularity `lambda` (C).
    Popularity,
    /// User price sensitivity `gamma` (U×P), positive.
    UserPrice,
    /// Item price sensitivity `beta` (C×P), positive.
    ItemPrice,
}

impl Latent {
    pub const ALL: [Latent; 6] = [
        Latent::Interaction,
        Latent::Attribute,
        Latent::Preference,
        Latent::Popularity,
        Latent::UserPrice,
        Latent::ItemPrice,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Latent::Interaction => "rho",
            Latent::Attribute => "alpha",
            Latent::Preference => "theta",
            Latent::Popularity => "lambda",
            Latent::UserPrice => "gamma",
            Latent::ItemPrice => "beta",
        }
    }

    /// `true` for the Gamma-distributed tensors stored in log space.
    pub fn is_log_scale(self) -> bool {
        matches!(self, Latent::UserPrice | Latent::ItemPrice)
    }
}

/// Location and shape of one latent tensor inside `θ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatentHandle {
    pub kind: Latent,
    pub offset: usize,
    pub rows: usize,
    pub cols: usize,
    /// `false` for vector-valued tensors (`lambda`); affects naming only.
    pub matrix: bool,
}

impl LatentHandle {
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len()
    }

    /// Unconstrained block of `theta` as a `rows × cols` view.
    pub fn view<'a>(&self, theta: ArrayView1<'a, f64>) -> ModelResult<ArrayView2<'a, f64>> {
        theta.slice_move(s![self.range()]).into_shape((self.rows, self.cols)).map_err(|e| {
            ModelError::TensorShape {
                name: self.kind.name(),
                rows: self.rows,
                cols: self.cols,
                reason: e.to_string(),
            }
        })
    }

    /// Name of the scalar at flat position `local` inside this block.
    pub fn scalar_name(&self, local: usize) -> String {
        let name = self.kind.name();
        if self.matrix {
            format!("{name}[{}, {}]", local / self.cols, local % self.cols)
        } else {
            format!("{name}[{local}]")
        }
    }
}

/// Layout of the whole flat parameter vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamLayout {
    n_users: usize,
    n_items: usize,
    k: usize,
    price_dim: usize,
    handles: [LatentHandle; 6],
}

impl ParamLayout {
    /// Lay out the six tensors for `U` users, `C` items, and latent sizes `K`, `P`.
    pub fn new(n_users: usize, n_items: usize, k: usize, price_dim: usize) -> ParamLayout {
        let shapes = [
            (Latent::Interaction, n_items, k, true),
            (Latent::Attribute, n_items, k, true),
            (Latent::Preference, n_users, k, true),
            (Latent::Popularity, n_items, 1, false),
            (Latent::UserPrice, n_users, price_dim, true),
            (Latent::ItemPrice, n_items, price_dim, true),
        ];
        let mut offset = 0;
        let handles = shapes.map(|(kind, rows, cols, matrix)| {
            let handle = LatentHandle { kind, offset, rows, cols, matrix };
            offset += rows * cols;
            handle
        });
        ParamLayout { n_users, n_items, k, price_dim, handles }
    }

    pub fn handle(&self, kind: Latent) -> &LatentHandle {
        // `handles` is built in `Latent::ALL` order.
        &self.handles[kind as usize]
    }

    pub fn handles(&self) -> &[LatentHandle] {
        &self.handles
    }

    /// Total number of unconstrained parameters.
    pub fn dim(&self) -> usize {
        self.handles.iter().map(LatentHandle::len).sum()
    }

    pub fn n_users(&self) -> usize {
        self.n_users
    }

    pub fn n_items(&self) -> usize {
        self.n_items
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn price_dim(&self) -> usize {
        self.price_dim
    }

    /// Check that `theta` has the layout's length and finite entries.
    ///
    /// # Errors
    /// - [`ModelError::ThetaLengthMismatch`] on a length mismatch.
    /// - [`ModelError::NonFiniteTheta`] for the first non-finite entry.
    pub fn check(&self, theta: ArrayView1<f64>) -> ModelResult<()> {
        if theta.len() != self.dim() {
            return Err(ModelError::ThetaLengthMismatch { expected: self.dim(), found: theta.len() });
        }
        if let Some((index, &value)) = theta.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ModelError::NonFiniteTheta { index, value });
        }
        Ok(())
    }

    /// Map an unconstrained vector to model space (exponentiate the log blocks).
    pub fn constrain(&self, theta: ArrayView1<f64>) -> Array1<f64> {
        let mut out = theta.to_owned();
        for handle in self.handles.iter().filter(|h| h.kind.is_log_scale()) {
            out.slice_mut(s![handle.range()]).mapv_inplace(f64::exp);
        }
        out
    }

    /// Scalar names for every coordinate of `θ`, in layout order.
    pub fn parameter_names(&self) -> Vec<String> {
        self.handles.iter().flat_map(|h| (0..h.len()).map(move |i| h.scalar_name(i))).collect()
    }
}
