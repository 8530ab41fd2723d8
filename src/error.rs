//! Error types for tensors, graph construction and training configuration.

use thiserror::Error;

use crate::tensor::{Element, Tensor};

/// Errors raised by tensor construction and tensor arithmetic.
///
/// Graph construction and backward passes surface the same type: a node's
/// forward value is a tensor operation, and so is every local gradient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorError {
    /// Two operands have no broadcasting rule that makes them compatible.
    #[error("shape mismatch in {op}: left is {left_rows}x{left_cols}, right is {right_rows}x{right_cols}")]
    ShapeMismatch {
        op: &'static str,
        left_rows: usize,
        left_cols: usize,
        right_rows: usize,
        right_cols: usize,
    },

    /// Data length does not match the requested shape.
    #[error("invalid shape {shape:?} for data of length {len}")]
    InvalidShape { shape: Vec<usize>, len: usize },

    /// Nested rows passed to a matrix constructor have different lengths.
    #[error("ragged rows: row {row} has {actual} elements, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Reshape would change the number of elements.
    #[error("cannot reshape {rows}x{cols} ({len} elements) into {new_rows}x{new_cols}")]
    ReshapeMismatch {
        rows: usize,
        cols: usize,
        len: usize,
        new_rows: usize,
        new_cols: usize,
    },

    /// Tensors are 2-D buffers; shapes of rank above two have no layout.
    #[error("tensor shapes of rank {rank} are not supported (at most 2)")]
    UnsupportedRank { rank: usize },
}

impl TensorError {
    pub(crate) fn shape_mismatch<T: Element>(op: &'static str, l: &Tensor<T>, r: &Tensor<T>) -> Self {
        TensorError::ShapeMismatch {
            op,
            left_rows: l.rows(),
            left_cols: l.cols(),
            right_rows: r.rows(),
            right_cols: r.cols(),
        }
    }
}

/// Invalid hyperparameters for layers, optimizers and schedules.
///
/// Validated once, at construction time. Nothing is clamped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("initial learning rate must be above zero, got {0}")]
    NonPositiveLearningRate(f64),

    #[error("decay rate must be above zero and below one, got {0}")]
    DecayRateOutOfRange(f64),

    #[error("step size must be above zero")]
    ZeroStepSize,

    #[error("momentum must be in [0, 1), got {0}")]
    MomentumOutOfRange(f64),

    #[error("the number of units in layer '{name}' must be above zero")]
    ZeroUnits { name: String },

    #[error("training needs at least one epoch")]
    ZeroEpochs,

    #[error("layer '{name}' was used before build() gave it an input shape")]
    LayerNotBuilt { name: String },

    #[error("model has no layers")]
    EmptyModel,
}

/// Crate-level error for operations that can fail either way, such as
/// [`Model::fit`](crate::nn::Model::fit).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
