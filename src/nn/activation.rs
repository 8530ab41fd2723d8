use crate::autodiff::{ops, Constant, Expr, NodeOps};
use crate::error::TensorError;
use crate::tensor::{Element, Tensor};

/// Elementwise activation applied at the end of a layer's forward pass.
///
/// Every variant is a composition of graph operations, so gradients flow
/// through it without dedicated backward rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    /// Identity
    #[default]
    Linear,
    /// `1 / (1 + e^-x)`
    Sigmoid,
    /// `(x + |x|) / 2`
    Relu,
}

impl Activation {
    pub fn apply<T: Element>(&self, x: Expr<T>) -> Result<Expr<T>, TensorError> {
        let one = T::one();
        match self {
            Activation::Linear => Ok(x),
            Activation::Sigmoid => {
                let e = Constant::scalar(one.exp());
                let denom = ops::try_add(Tensor::scalar(one), e.try_pow(-&x)?)?;
                ops::try_div(Tensor::scalar(one), denom)
            }
            Activation::Relu => {
                let doubled = ops::try_add(&x, x.abs())?;
                ops::try_div(doubled, Tensor::scalar(one + one))
            }
        }
    }
}
