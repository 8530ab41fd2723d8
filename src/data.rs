//! Feature scaling for tensors loaded from a data source.

use tracing::instrument;

use crate::tensor::{Element, Tensor};

/// Rescaling rule applied to a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaler {
    /// `x / max(|x|)`
    MaxAbs,
    /// `(x - min) / (max - min)`
    MinMax,
    /// `(x - mean) / stddev`, sample standard deviation
    Standard,
    /// `(x - mean) / (max - min)`
    Mean,
}

impl Scaler {
    /// Scale every element of `t` by statistics of the whole tensor.
    ///
    /// A constant feature divides by zero; the result is NaN or infinite, as
    /// the float arithmetic gives it.
    pub fn scale<T: Element>(&self, t: &Tensor<T>) -> Tensor<T> {
        match self {
            Scaler::MaxAbs => {
                let max_abs = t.abs().max();
                t.map(|x| x / max_abs)
            }
            Scaler::MinMax => {
                let (min, max) = (t.min(), t.max());
                t.map(|x| (x - min) / (max - min))
            }
            Scaler::Standard => {
                let mean = t.mean().item();
                let stddev = t.stddev().item();
                t.map(|x| (x - mean) / stddev)
            }
            Scaler::Mean => {
                let mean = t.mean().item();
                let range = t.max() - t.min();
                t.map(|x| (x - mean) / range)
            }
        }
    }

    /// Scale each column independently, treating columns as features.
    #[instrument(level = "debug", skip(t), fields(dims = ?t.dims()))]
    pub fn scale_columns<T: Element>(&self, t: &Tensor<T>) -> Tensor<T> {
        let (rows, cols) = t.dims();
        let mut out = vec![T::zero(); rows * cols];
        for c in 0..cols {
            let column: Vec<T> = (0..rows).map(|r| t.as_slice()[r * cols + c]).collect();
            let scaled = self.scale(&Tensor::from_vec(column));
            for (r, &value) in scaled.as_slice().iter().enumerate() {
                out[r * cols + c] = value;
            }
        }
        Tensor::from_parts(out, rows, cols)
    }
}
