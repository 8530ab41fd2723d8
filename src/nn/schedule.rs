//! Learning-rate schedules
//!
//! A schedule owns the current rate. The training loop calls
//! [`LearningRate::step`] once at the end of every epoch.

use tracing::debug;

use crate::error::ConfigError;

pub trait LearningRate {
    /// The rate to use for the next update.
    fn rate(&self) -> f64;

    /// Recompute the rate for the given (1-based) epoch.
    fn step(&mut self, epoch: usize);
}

fn check_rate(lr: f64) -> Result<f64, ConfigError> {
    if lr > 0.0 {
        Ok(lr)
    } else {
        Err(ConfigError::NonPositiveLearningRate(lr))
    }
}

fn check_decay(decay_rate: f64) -> Result<f64, ConfigError> {
    if decay_rate > 0.0 && decay_rate < 1.0 {
        Ok(decay_rate)
    } else {
        Err(ConfigError::DecayRateOutOfRange(decay_rate))
    }
}

/// A fixed learning rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantRate {
    lr: f64,
}

impl ConstantRate {
    pub fn new(lr: f64) -> Result<Self, ConfigError> {
        Ok(ConstantRate { lr: check_rate(lr)? })
    }
}

impl LearningRate for ConstantRate {
    fn rate(&self) -> f64 {
        self.lr
    }

    fn step(&mut self, _epoch: usize) {}
}

/// `lr0 * decay_rate ^ (epoch / step_size)` with integer division, so the
/// rate drops once every `step_size` epochs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepDecay {
    initial_lr: f64,
    decay_rate: f64,
    step_size: usize,
    lr: f64,
}

impl StepDecay {
    pub fn new(lr: f64, decay_rate: f64, step_size: usize) -> Result<Self, ConfigError> {
        let initial_lr = check_rate(lr)?;
        let decay_rate = check_decay(decay_rate)?;
        if step_size == 0 {
            return Err(ConfigError::ZeroStepSize);
        }
        Ok(StepDecay {
            initial_lr,
            decay_rate,
            step_size,
            lr: initial_lr,
        })
    }
}

impl LearningRate for StepDecay {
    fn rate(&self) -> f64 {
        self.lr
    }

    fn step(&mut self, epoch: usize) {
        let drops = (epoch / self.step_size) as i32;
        self.lr = self.initial_lr * self.decay_rate.powi(drops);
        debug!(epoch, lr = self.lr, "step decay");
    }
}

/// `lr0 * e^(-decay_rate * epoch)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialDecay {
    initial_lr: f64,
    decay_rate: f64,
    lr: f64,
}

impl ExponentialDecay {
    pub fn new(lr: f64, decay_rate: f64) -> Result<Self, ConfigError> {
        let initial_lr = check_rate(lr)?;
        Ok(ExponentialDecay {
            initial_lr,
            decay_rate: check_decay(decay_rate)?,
            lr: initial_lr,
        })
    }
}

impl LearningRate for ExponentialDecay {
    fn rate(&self) -> f64 {
        self.lr
    }

    fn step(&mut self, epoch: usize) {
        self.lr = self.initial_lr * (-self.decay_rate * epoch as f64).exp();
        debug!(epoch, lr = self.lr, "exponential decay");
    }
}
