use tracing::instrument;

use crate::autodiff::{ops, NodeOps, Param, Variable};
use crate::error::{ConfigError, Result};
use crate::nn::{Activation, Layer};
use crate::tensor::{cast, Element, Tensor, TensorShape};

/// Fully-connected layer: `y = activation(x * kernel + bias)`
///
/// The kernel is `[in_features, units]` and the bias a `[1, units]` row that
/// is added to every input row.
pub struct Dense<T: Element = f32> {
    name: String,
    units: usize,
    activation: Activation,
    kernel: Option<Variable<T>>,
    bias: Option<Variable<T>>,
}

impl<T: Element> Dense<T> {
    pub fn new(units: usize, name: impl Into<String>) -> std::result::Result<Self, ConfigError> {
        let name = name.into();
        if units == 0 {
            return Err(ConfigError::ZeroUnits { name });
        }
        Ok(Dense {
            name,
            units,
            activation: Activation::Linear,
            kernel: None,
            bias: None,
        })
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn kernel(&self) -> Option<&Variable<T>> {
        self.kernel.as_ref()
    }

    pub fn bias(&self) -> Option<&Variable<T>> {
        self.bias.as_ref()
    }

    fn not_built(&self) -> ConfigError {
        ConfigError::LayerNotBuilt {
            name: self.name.clone(),
        }
    }
}

impl<T: Element> Layer<T> for Dense<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn units(&self) -> usize {
        self.units
    }

    #[instrument(skip(self), fields(name = %self.name, units = self.units))]
    fn build(&mut self, input_shape: &TensorShape) -> Result<()> {
        let in_features = input_shape.last();

        // Xavier init: scale = sqrt(2.0 / in_features)
        let scale: T = cast(2.0 / in_features as f64);
        let kernel = Tensor::randn(in_features, self.units).scale(scale.sqrt());

        self.kernel = Some(Variable::new(kernel));
        self.bias = Some(Variable::new(Tensor::zeros(1, self.units)));
        Ok(())
    }

    fn forward(&self, input: &Param<T>) -> Result<Variable<T>> {
        let kernel = self.kernel.as_ref().ok_or_else(|| self.not_built())?;
        let bias = self.bias.as_ref().ok_or_else(|| self.not_built())?;

        // A column of ones turns the bias row into one row per sample
        let ones = Tensor::ones(input.value().rows(), 1);
        let z = ops::try_add(ops::try_matmul(input, kernel)?, ops::try_matmul(ones, bias)?)?;
        Ok(Variable::wrap(self.activation.apply(z)?))
    }

    fn parameters_mut(&mut self) -> Vec<&mut Variable<T>> {
        self.kernel.iter_mut().chain(self.bias.iter_mut()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autodiff::Constant;
    use crate::error::Error;

    fn built(units: usize, in_features: usize) -> Dense<f64> {
        let mut layer = Dense::new(units, "dense").unwrap();
        layer.build(&TensorShape::from([4, in_features])).unwrap();
        layer
    }

    // ========================================================================
    // Construction Tests
    // ========================================================================

    #[test]
    fn test_zero_units_is_rejected() {
        let err = Dense::<f32>::new(0, "empty").err();
        assert_eq!(err, Some(ConfigError::ZeroUnits { name: "empty".to_string() }));
    }

    #[test]
    fn test_build_creates_weights() {
        let mut layer = built(3, 2);
        assert_eq!(layer.kernel().unwrap().value().dims(), (2, 3));
        assert_eq!(layer.bias().unwrap().value().dims(), (1, 3));
        assert_eq!(layer.parameters_mut().len(), 2);
    }

    #[test]
    fn test_forward_before_build_fails() {
        let layer = Dense::<f32>::new(1, "d").unwrap();
        let x = Param::from(Constant::scalar(1.0));
        assert!(matches!(
            layer.forward(&x),
            Err(Error::Config(ConfigError::LayerNotBuilt { .. }))
        ));
    }

    // ========================================================================
    // Forward / Backward Tests
    // ========================================================================

    #[test]
    fn test_forward_shape_and_bias_gradient() {
        let layer = built(3, 2);
        let x = Param::from(Constant::new(Tensor::ones(4, 2)));
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.value().dims(), (4, 3));

        y.backward().unwrap();
        // Each bias entry is added to all four rows
        assert_eq!(layer.bias().unwrap().grad().into_vec(), vec![4.0; 3]);
        assert_eq!(layer.kernel().unwrap().grad().into_vec(), vec![4.0; 6]);
    }

    #[test]
    fn test_single_unit_single_feature() {
        let layer = built(1, 1);
        let x = Param::from(Constant::from_vec(vec![1.0, 2.0, 3.0, 4.0]));
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.value().dims(), (4, 1));

        y.backward().unwrap();
        assert_eq!(layer.kernel().unwrap().grad().item(), 10.0);
        assert_eq!(layer.bias().unwrap().grad().item(), 4.0);
    }
}
