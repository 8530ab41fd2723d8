use crate::autodiff::{ops, Constant, NodeOps, Variable};
use crate::error::TensorError;
use crate::nn::Loss;
use crate::tensor::{Element, Tensor};

/// Mean squared error: `mean((y_pred - y_true)^2)`
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanSquaredError;

impl<T: Element> Loss<T> for MeanSquaredError {
    fn name(&self) -> &'static str {
        "mean_squared_error"
    }

    fn forward(&self, y_true: &Constant<T>, y_pred: &Variable<T>) -> Result<Variable<T>, TensorError> {
        let two = Tensor::scalar(T::one() + T::one());
        let error = ops::try_sub(y_pred, y_true)?;
        Ok(Variable::wrap(error.try_pow(two)?.mean()))
    }
}

/// Mean absolute error: `mean(|y_pred - y_true|)`
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanAbsoluteError;

impl<T: Element> Loss<T> for MeanAbsoluteError {
    fn name(&self) -> &'static str {
        "mean_absolute_error"
    }

    fn forward(&self, y_true: &Constant<T>, y_pred: &Variable<T>) -> Result<Variable<T>, TensorError> {
        let error = ops::try_sub(y_pred, y_true)?;
        Ok(Variable::wrap(error.abs().mean()))
    }
}
