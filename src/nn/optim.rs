//! Gradient-based parameter updates
//!
//! Every optimizer writes its update through [`Variable::set_value`], so
//! after a step each parameter is a fresh leaf with a zeroed gradient.

use tracing::instrument;

use crate::autodiff::{NodeOps, Variable};
use crate::error::{ConfigError, TensorError};
use crate::nn::schedule::{ConstantRate, LearningRate};
use crate::tensor::{cast, Element, Tensor};

pub trait Optimizer<T: Element = f32> {
    /// Current learning rate
    fn learning_rate(&self) -> f64;

    /// Allocate per-parameter state. Called once before training.
    fn build(&mut self, _parameters: &[&mut Variable<T>]) {}

    /// Update every parameter from its accumulated gradient.
    fn step(&mut self, parameters: &mut [&mut Variable<T>]) -> Result<(), TensorError>;

    /// Advance the learning-rate schedule after an epoch.
    fn end_epoch(&mut self, epoch: usize);

    /// Zero out all gradients
    fn zero_grad(&self, parameters: &mut [&mut Variable<T>]) {
        parameters.iter_mut().for_each(|param| param.zero_grad());
    }
}

/// Gradient descent: `param = param - lr * grad`
pub struct GradientDescent {
    schedule: Box<dyn LearningRate>,
}

impl GradientDescent {
    pub fn new(lr: f64) -> Result<Self, ConfigError> {
        Ok(Self::with_schedule(ConstantRate::new(lr)?))
    }

    pub fn with_schedule(schedule: impl LearningRate + 'static) -> Self {
        GradientDescent {
            schedule: Box::new(schedule),
        }
    }
}

impl<T: Element> Optimizer<T> for GradientDescent {
    fn learning_rate(&self) -> f64 {
        self.schedule.rate()
    }

    #[instrument(skip(self, parameters), fields(num_params = parameters.len(), lr = self.schedule.rate()))]
    fn step(&mut self, parameters: &mut [&mut Variable<T>]) -> Result<(), TensorError> {
        let lr: T = cast(self.schedule.rate());
        for param in parameters.iter_mut() {
            let update = param.grad().scale(lr);
            let value = param.value().sub(&update)?;
            param.set_value(value);
        }
        Ok(())
    }

    fn end_epoch(&mut self, epoch: usize) {
        self.schedule.step(epoch);
    }
}

/// Gradient descent with momentum:
/// `v = momentum * v - lr * grad`, then `param = param + v`
pub struct Momentum<T: Element = f32> {
    schedule: Box<dyn LearningRate>,
    momentum: f64,
    velocity: Vec<Tensor<T>>,
}

impl<T: Element> Momentum<T> {
    pub fn new(lr: f64, momentum: f64) -> Result<Self, ConfigError> {
        Self::with_schedule(ConstantRate::new(lr)?, momentum)
    }

    pub fn with_schedule(schedule: impl LearningRate + 'static, momentum: f64) -> Result<Self, ConfigError> {
        if !(0.0..1.0).contains(&momentum) {
            return Err(ConfigError::MomentumOutOfRange(momentum));
        }
        Ok(Momentum {
            schedule: Box::new(schedule),
            momentum,
            velocity: Vec::new(),
        })
    }
}

impl<T: Element> Optimizer<T> for Momentum<T> {
    fn learning_rate(&self) -> f64 {
        self.schedule.rate()
    }

    fn build(&mut self, parameters: &[&mut Variable<T>]) {
        self.velocity = parameters.iter().map(|p| Tensor::zeros_like(p.value())).collect();
    }

    #[instrument(skip(self, parameters), fields(num_params = parameters.len(), lr = self.schedule.rate()))]
    fn step(&mut self, parameters: &mut [&mut Variable<T>]) -> Result<(), TensorError> {
        if self.velocity.len() != parameters.len() {
            self.build(parameters);
        }
        let lr: T = cast(self.schedule.rate());
        let momentum: T = cast(self.momentum);

        for (param, v) in parameters.iter_mut().zip(self.velocity.iter_mut()) {
            *v = v.scale(momentum).sub(&param.grad().scale(lr))?;
            let value = param.value().add(v)?;
            param.set_value(value);
        }
        Ok(())
    }

    fn end_epoch(&mut self, epoch: usize) {
        self.schedule.step(epoch);
    }
}

/// Adam with bias-corrected first and second moment estimates.
pub struct Adam<T: Element = f32> {
    schedule: Box<dyn LearningRate>,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: i32,
    m: Vec<Tensor<T>>,
    v: Vec<Tensor<T>>,
}

impl<T: Element> Adam<T> {
    pub fn new(lr: f64) -> Result<Self, ConfigError> {
        Ok(Self::with_schedule(ConstantRate::new(lr)?))
    }

    pub fn with_schedule(schedule: impl LearningRate + 'static) -> Self {
        Adam {
            schedule: Box::new(schedule),
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }
}

impl<T: Element> Optimizer<T> for Adam<T> {
    fn learning_rate(&self) -> f64 {
        self.schedule.rate()
    }

    fn build(&mut self, parameters: &[&mut Variable<T>]) {
        self.t = 0;
        self.m = parameters.iter().map(|p| Tensor::zeros_like(p.value())).collect();
        self.v = self.m.clone();
    }

    #[instrument(skip(self, parameters), fields(num_params = parameters.len(), lr = self.schedule.rate(), t = self.t))]
    fn step(&mut self, parameters: &mut [&mut Variable<T>]) -> Result<(), TensorError> {
        if self.m.len() != parameters.len() {
            self.build(parameters);
        }
        self.t += 1;

        let one = T::one();
        let lr: T = cast(self.schedule.rate());
        let (beta1, beta2): (T, T) = (cast(self.beta1), cast(self.beta2));
        let epsilon: T = cast(self.epsilon);
        let m_correction = one - beta1.powi(self.t);
        let v_correction = one - beta2.powi(self.t);

        for ((param, m), v) in parameters.iter_mut().zip(self.m.iter_mut()).zip(self.v.iter_mut()) {
            let grad = param.grad();
            *m = m.scale(beta1).add(&grad.scale(one - beta1))?;
            *v = v.scale(beta2).add(&grad.powf(one + one).scale(one - beta2))?;

            let m_hat = m.scale(one / m_correction);
            let v_hat = v.scale(one / v_correction);
            let denom = v_hat.sqrt().map(|x| x + epsilon);
            let update = m_hat.div(&denom)?.scale(lr);

            let value = param.value().sub(&update)?;
            param.set_value(value);
        }
        Ok(())
    }

    fn end_epoch(&mut self, epoch: usize) {
        self.schedule.step(epoch);
    }
}
