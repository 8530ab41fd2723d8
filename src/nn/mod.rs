//! Neural-network building blocks on top of the autodiff graph.

use crate::autodiff::{Constant, Param, Variable};
use crate::error::{Result, TensorError};
use crate::tensor::{Element, TensorShape};

pub mod activation;
pub mod dense;
pub mod loss;
pub mod model;
pub mod optim;
pub mod schedule;

pub use activation::Activation;
pub use dense::Dense;
pub use loss::{MeanAbsoluteError, MeanSquaredError};
pub use model::{FitConfig, History, Model};
pub use optim::{Adam, GradientDescent, Momentum, Optimizer};
pub use schedule::{ConstantRate, ExponentialDecay, LearningRate, StepDecay};

/// Generic layer interface
pub trait Layer<T: Element = f32> {
    fn name(&self) -> &str;

    /// Width of the layer's output.
    fn units(&self) -> usize;

    /// Create the layer's weights for inputs of the given shape. The last
    /// dimension is the input width.
    fn build(&mut self, input_shape: &TensorShape) -> Result<()>;

    fn forward(&self, input: &Param<T>) -> Result<Variable<T>>;

    /// Trainable weights, in a stable order.
    fn parameters_mut(&mut self) -> Vec<&mut Variable<T>>;
}

/// Trait for loss functions
pub trait Loss<T: Element = f32> {
    fn name(&self) -> &'static str;

    fn forward(&self, y_true: &Constant<T>, y_pred: &Variable<T>) -> std::result::Result<Variable<T>, TensorError>;
}
