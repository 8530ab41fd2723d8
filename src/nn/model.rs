//! Sequential model and training loop

use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::autodiff::{Constant, NodeOps, Param, Variable};
use crate::error::{ConfigError, Result};
use crate::nn::{Layer, Loss, Optimizer};
use crate::tensor::{Element, Tensor, TensorShape};

/// Training-loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitConfig {
    pub epochs: usize,
    /// Log every n-th epoch at `info`; 0 disables epoch logging.
    pub log_every: usize,
}

impl FitConfig {
    pub fn new(epochs: usize) -> Self {
        FitConfig { epochs, log_every: 1 }
    }

    pub fn log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }
}

/// Loss recorded after every epoch of [`Model::fit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History<T: Element = f32> {
    pub losses: Vec<T>,
}

impl<T: Element> History<T> {
    pub fn final_loss(&self) -> Option<T> {
        self.losses.last().copied()
    }
}

/// A stack of layers trained as one function of its input.
pub struct Model<T: Element = f32> {
    layers: Vec<Box<dyn Layer<T>>>,
    optimizer: Box<dyn Optimizer<T>>,
    loss: Box<dyn Loss<T>>,
}

impl<T: Element> Model<T> {
    pub fn new(optimizer: impl Optimizer<T> + 'static, loss: impl Loss<T> + 'static) -> Self {
        Model {
            layers: Vec::new(),
            optimizer: Box::new(optimizer),
            loss: Box::new(loss),
        }
    }

    /// Append a layer to the end of the stack.
    pub fn add(&mut self, layer: impl Layer<T> + 'static) -> &mut Self {
        self.layers.push(Box::new(layer));
        self
    }

    pub fn with_optimizer(mut self, optimizer: impl Optimizer<T> + 'static) -> Self {
        self.optimizer = Box::new(optimizer);
        self
    }

    pub fn with_loss(mut self, loss: impl Loss<T> + 'static) -> Self {
        self.loss = Box::new(loss);
        self
    }

    pub fn layers(&self) -> &[Box<dyn Layer<T>>] {
        &self.layers
    }

    /// Build every layer, feeding each one the output shape of the last.
    pub fn build(&mut self, input_shape: &TensorShape) -> Result<()> {
        if self.layers.is_empty() {
            return Err(ConfigError::EmptyModel.into());
        }
        let rows = input_shape.dims().first().copied().unwrap_or(1);
        let mut shape = input_shape.clone();
        for layer in self.layers.iter_mut() {
            layer.build(&shape)?;
            debug!(layer = layer.name(), input = %shape, units = layer.units(), "built layer");
            shape = TensorShape::from([rows, layer.units()]);
        }
        Ok(())
    }

    /// Run the input through every layer in order.
    pub fn forward(&self, input: &Param<T>) -> Result<Variable<T>> {
        let (first, rest) = self.layers.split_first().ok_or(ConfigError::EmptyModel)?;
        let mut output = first.forward(input)?;
        for layer in rest {
            output = layer.forward(&Param::from(output))?;
        }
        Ok(output)
    }

    /// Train for `config.epochs` full-batch epochs.
    ///
    /// Each epoch runs the forward pass, the loss, a backward pass seeded
    /// with ones, one optimizer step and one schedule step.
    #[instrument(skip_all, fields(epochs = config.epochs, layers = self.layers.len(), loss = self.loss.name()))]
    pub fn fit(&mut self, x: &Constant<T>, y: &Constant<T>, config: &FitConfig) -> Result<History<T>> {
        if config.epochs == 0 {
            return Err(ConfigError::ZeroEpochs.into());
        }
        self.build(&x.value().shape())?;
        {
            let params: Vec<&mut Variable<T>> = self.layers.iter_mut().flat_map(|l| l.parameters_mut()).collect();
            self.optimizer.build(&params);
        }

        let input = Param::from(x.clone());
        let mut history = History { losses: Vec::with_capacity(config.epochs) };

        for epoch in 1..=config.epochs {
            let start = Instant::now();

            let output = self.forward(&input)?;
            let loss = self.loss.forward(y, &output)?;
            loss.backward()?;

            let mut params: Vec<&mut Variable<T>> = self.layers.iter_mut().flat_map(|l| l.parameters_mut()).collect();
            self.optimizer.step(&mut params)?;

            let value = loss.value().item();
            history.losses.push(value);
            if config.log_every > 0 && epoch % config.log_every == 0 {
                info!(
                    epoch,
                    loss = %value,
                    lr = self.optimizer.learning_rate(),
                    elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
                    "epoch finished"
                );
            }

            self.optimizer.end_epoch(epoch);
        }

        Ok(history)
    }

    pub fn predict(&self, x: &Constant<T>) -> Result<Tensor<T>> {
        let output = self.forward(&Param::from(x.clone()))?;
        Ok(output.value().clone())
    }

    /// Loss of the current weights on `(x, y)`, without training.
    pub fn evaluate(&self, x: &Constant<T>, y: &Constant<T>) -> Result<T> {
        let output = self.forward(&Param::from(x.clone()))?;
        let loss = self.loss.forward(y, &output)?;
        Ok(loss.value().item())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::nn::{Activation, Dense, GradientDescent, MeanSquaredError, Momentum, StepDecay};

    fn line_data() -> (Constant<f64>, Constant<f64>) {
        // y = 2x + 1
        let xs: Vec<f64> = (0..8).map(|i| i as f64 / 4.0).collect();
        let ys = xs.iter().map(|x| 2.0 * x + 1.0).collect();
        (Constant::from_vec(xs), Constant::from_vec(ys))
    }

    // ========================================================================
    // Configuration Tests
    // ========================================================================

    #[test]
    fn test_empty_model_is_rejected() {
        let model = Model::<f64>::new(GradientDescent::new(0.1).unwrap(), MeanSquaredError);
        let (x, _) = line_data();
        assert!(matches!(model.predict(&x), Err(Error::Config(ConfigError::EmptyModel))));
    }

    #[test]
    fn test_zero_epochs_is_rejected() {
        let mut model = Model::<f64>::new(GradientDescent::new(0.1).unwrap(), MeanSquaredError);
        model.add(Dense::new(1, "out").unwrap());
        let (x, y) = line_data();
        let err = model.fit(&x, &y, &FitConfig::new(0)).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ZeroEpochs)));
    }

    // ========================================================================
    // Training Tests
    // ========================================================================

    #[test]
    fn test_fit_learns_a_line() {
        let mut model = Model::new(GradientDescent::new(0.1).unwrap(), MeanSquaredError);
        model.add(Dense::new(1, "out").unwrap());
        let (x, y) = line_data();

        let history = model.fit(&x, &y, &FitConfig::new(500).log_every(0)).unwrap();
        assert_eq!(history.losses.len(), 500);
        assert!(history.final_loss().unwrap() < 1e-3);
        assert!(history.losses[0] > history.final_loss().unwrap());
        assert!(model.evaluate(&x, &y).unwrap() < 1e-3);
    }

    #[test]
    fn test_fit_with_hidden_layer_and_schedule() {
        let schedule = StepDecay::new(0.05, 0.5, 200).unwrap();
        let optimizer = Momentum::with_schedule(schedule, 0.5).unwrap();
        let mut model = Model::new(optimizer, MeanSquaredError);
        model
            .add(Dense::new(4, "hidden").unwrap().with_activation(Activation::Sigmoid))
            .add(Dense::new(1, "out").unwrap());
        let (x, y) = line_data();

        let history = model.fit(&x, &y, &FitConfig::new(300).log_every(100)).unwrap();
        assert!(history.final_loss().unwrap() < history.losses[0]);
        assert_eq!(model.predict(&x).unwrap().dims(), (8, 1));
    }
}
