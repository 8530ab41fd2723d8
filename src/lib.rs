//! A small reverse-mode automatic differentiation engine over 2-D tensors
//!
//! This library provides a dense `Tensor` type with scalar and vector
//! broadcasting, a computation graph that differentiates any expression built
//! from it, and the pieces needed to fit simple models: layers, losses,
//! optimizers and learning-rate schedules.

pub mod autodiff;
pub mod data;
pub mod error;
pub mod nn;
pub mod tensor;

// Re-export commonly used types for convenience
pub use autodiff::{Constant, Expr, NodeOps, Param, Variable};
pub use error::{ConfigError, Error, Result, TensorError};
pub use tensor::{Tensor, TensorShape};

/// Everything needed to build and train a model.
pub mod prelude {
    pub use crate::autodiff::{ops, Constant, Expr, NodeOps, Operand, Param, Variable};
    pub use crate::data::Scaler;
    pub use crate::error::{ConfigError, Error, Result, TensorError};
    pub use crate::nn::{
        Activation, Adam, ConstantRate, Dense, ExponentialDecay, FitConfig, GradientDescent, History, Layer,
        LearningRate, Loss, MeanAbsoluteError, MeanSquaredError, Model, Momentum, Optimizer, StepDecay,
    };
    pub use crate::tensor::{Element, Tensor, TensorShape};
}
