use std::fmt;

use rand::distributions::Uniform;
use rand::prelude::Distribution;
use tracing::instrument;

use super::{cast, Element, TensorShape};
use crate::error::TensorError;

/// Dense 2-D numeric buffer, stored row-major.
///
/// A tensor is immutable by convention: every arithmetic method returns a new
/// tensor, and only the in-place combinators (`+=`, `-=`, `*=`, `/=`) and
/// [`reshape`](Tensor::reshape) mutate. Whether a tensor is a scalar, a row or
/// column vector, or a matrix is derived from its current dimensions on every
/// query.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T: Element = f32> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Element> Tensor<T> {
    /// Create a tensor from row-major data and explicit dimensions
    #[instrument(level = "trace", skip(data), fields(len = data.len()))]
    pub fn new(data: Vec<T>, rows: usize, cols: usize) -> Result<Self, TensorError> {
        if rows * cols != data.len() {
            return Err(TensorError::InvalidShape {
                shape: vec![rows, cols],
                len: data.len(),
            });
        }
        Ok(Tensor { data, rows, cols })
    }

    /// Caller guarantees `data.len() == rows * cols`.
    pub(crate) fn from_parts(data: Vec<T>, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(data.len(), rows * cols, "buffer does not match dims");
        Tensor { data, rows, cols }
    }

    /// 1x1 tensor holding `value`
    pub fn scalar(value: T) -> Self {
        Tensor::from_parts(vec![value], 1, 1)
    }

    /// Column vector from a flat sequence
    pub fn from_vec(values: Vec<T>) -> Self {
        let rows = values.len();
        Tensor::from_parts(values, rows, 1)
    }

    /// Matrix from nested rows. Every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, TensorError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != n_cols {
                return Err(TensorError::RaggedRows {
                    row,
                    expected: n_cols,
                    actual: values.len(),
                });
            }
            data.extend(values);
        }
        Ok(Tensor::from_parts(data, n_rows, n_cols))
    }

    /// Create a tensor from a shape and flat row-major values
    ///
    /// This is the constructor data loaders use to hand materialized feature
    /// and label matrices to the graph.
    #[instrument(level = "debug", skip(shape, data), fields(len = data.len()))]
    pub fn from_shape_vec(shape: impl Into<TensorShape>, data: Vec<T>) -> Result<Self, TensorError> {
        let shape = shape.into();
        let (rows, cols) = shape.matrix_dims()?;
        if rows * cols != data.len() {
            return Err(TensorError::InvalidShape {
                shape: shape.dims().to_vec(),
                len: data.len(),
            });
        }
        Ok(Tensor::from_parts(data, rows, cols))
    }

    /// Zero-filled tensor with the layout of `shape`
    pub fn with_shape(shape: &TensorShape) -> Result<Self, TensorError> {
        let (rows, cols) = shape.matrix_dims()?;
        Ok(Tensor::zeros(rows, cols))
    }

    pub fn full(rows: usize, cols: usize, value: T) -> Self {
        Tensor::from_parts(vec![value; rows * cols], rows, cols)
    }

    /// Create a tensor filled with zeros
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Tensor::full(rows, cols, T::zero())
    }

    /// Create a tensor filled with ones
    pub fn ones(rows: usize, cols: usize) -> Self {
        Tensor::full(rows, cols, T::one())
    }

    pub fn zeros_like(other: &Tensor<T>) -> Self {
        Tensor::zeros(other.rows, other.cols)
    }

    pub fn ones_like(other: &Tensor<T>) -> Self {
        Tensor::ones(other.rows, other.cols)
    }

    /// Create a tensor with random values between -1 and 1
    #[instrument(level = "debug")]
    pub fn randn(rows: usize, cols: usize) -> Self {
        let mut rng = rand::thread_rng();
        let uniform = Uniform::new_inclusive(-T::one(), T::one());
        let data = (0..rows * cols).map(|_| uniform.sample(&mut rng)).collect();
        Tensor::from_parts(data, rows, cols)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn shape(&self) -> TensorShape {
        TensorShape::from([self.rows, self.cols])
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// First element; the value of a scalar tensor.
    pub fn item(&self) -> T {
        self.data.first().copied().unwrap_or_else(T::nan)
    }

    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }

    pub fn is_vector(&self) -> bool {
        !self.is_scalar() && (self.rows == 1 || self.cols == 1)
    }

    pub fn is_row_vector(&self) -> bool {
        self.is_vector() && self.rows == 1
    }

    pub fn is_col_vector(&self) -> bool {
        self.is_vector() && self.cols == 1
    }

    pub fn same_dims(&self, other: &Tensor<T>) -> bool {
        self.dims() == other.dims()
    }

    /// Reinterpret the buffer with new dimensions. The element count must not
    /// change; the row-major order of the elements is kept.
    pub fn reshape(&mut self, rows: usize, cols: usize) -> Result<(), TensorError> {
        if rows * cols != self.data.len() {
            return Err(TensorError::ReshapeMismatch {
                rows: self.rows,
                cols: self.cols,
                len: self.data.len(),
                new_rows: rows,
                new_cols: cols,
            });
        }
        self.rows = rows;
        self.cols = cols;
        Ok(())
    }

    /// Transpose
    pub fn t(&self) -> Tensor<T> {
        let mut data = vec![T::zero(); self.data.len()];
        for i in 0..self.rows {
            for j in 0..self.cols {
                data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        Tensor::from_parts(data, self.cols, self.rows)
    }

    pub fn map(&self, f: impl Fn(T) -> T) -> Tensor<T> {
        Tensor::from_parts(self.data.iter().map(|&x| f(x)).collect(), self.rows, self.cols)
    }

    pub(crate) fn zip_map(&self, other: &Tensor<T>, f: impl Fn(T, T) -> T) -> Tensor<T> {
        debug_assert!(self.same_dims(other));
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| f(a, b))
            .collect();
        Tensor::from_parts(data, self.rows, self.cols)
    }

    pub(crate) fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    // ------------------------------------------------------------------
    // Reductions
    // ------------------------------------------------------------------

    pub fn min(&self) -> T {
        self.data.iter().copied().fold(T::infinity(), T::min)
    }

    pub fn max(&self) -> T {
        self.data.iter().copied().fold(T::neg_infinity(), T::max)
    }

    pub fn sum(&self) -> T {
        self.data.iter().copied().fold(T::zero(), |acc, x| acc + x)
    }

    /// Mean of all elements, as a 1x1 tensor
    pub fn mean(&self) -> Tensor<T> {
        Tensor::scalar(self.sum() / cast(self.data.len()))
    }

    /// Sample standard deviation (n - 1 normaliser) of all elements, as a 1x1
    /// tensor. A single element has a deviation of zero.
    pub fn stddev(&self) -> Tensor<T> {
        let n = self.data.len();
        if n < 2 {
            return Tensor::scalar(T::zero());
        }
        let mean = self.sum() / cast(n);
        let squares = self
            .data
            .iter()
            .fold(T::zero(), |acc, &x| acc + (x - mean) * (x - mean));
        Tensor::scalar((squares / cast(n - 1)).sqrt())
    }

    /// Per-row sums as a column vector of length `rows`.
    pub fn row_sums(&self) -> Tensor<T> {
        if self.cols == 0 {
            return Tensor::zeros(self.rows, 1);
        }
        let data = self
            .data
            .chunks(self.cols)
            .map(|row| row.iter().copied().fold(T::zero(), |acc, x| acc + x))
            .collect();
        Tensor::from_parts(data, self.rows, 1)
    }

    // ------------------------------------------------------------------
    // Elementwise functions
    // ------------------------------------------------------------------

    pub fn abs(&self) -> Tensor<T> {
        self.map(T::abs)
    }

    pub fn sin(&self) -> Tensor<T> {
        self.map(T::sin)
    }

    pub fn cos(&self) -> Tensor<T> {
        self.map(T::cos)
    }

    pub fn tan(&self) -> Tensor<T> {
        self.map(T::tan)
    }

    /// Natural logarithm. Non-positive inputs yield NaN or -inf.
    pub fn log(&self) -> Tensor<T> {
        self.map(T::ln)
    }

    pub fn exp(&self) -> Tensor<T> {
        self.map(T::exp)
    }

    pub fn sqrt(&self) -> Tensor<T> {
        self.map(T::sqrt)
    }

    pub fn powf(&self, exponent: T) -> Tensor<T> {
        self.map(|x| x.powf(exponent))
    }

    /// Sign of every element, with sign(0) = 0.
    pub fn signum(&self) -> Tensor<T> {
        self.map(|x| {
            if x > T::zero() {
                T::one()
            } else if x < T::zero() {
                -T::one()
            } else {
                T::zero()
            }
        })
    }

    pub fn scale(&self, factor: T) -> Tensor<T> {
        self.map(|x| x * factor)
    }
}

impl<T: Element> From<T> for Tensor<T> {
    fn from(value: T) -> Self {
        Tensor::scalar(value)
    }
}

impl<T: Element> From<Vec<T>> for Tensor<T> {
    fn from(values: Vec<T>) -> Self {
        Tensor::from_vec(values)
    }
}

impl<T: Element> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.data.chunks(self.cols.max(1)).take(self.rows) {
            for value in row {
                write!(f, "{value:>12.4}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ========================================================================
    // Tensor Creation Tests
    // ========================================================================

    #[test]
    fn test_tensor_new() {
        let t = Tensor::new(vec![1.0_f32, 2.0, 3.0, 4.0], 2, 2).unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t.dims(), (2, 2));
        assert_eq!(t.get(1, 0), Some(3.0));
    }

    #[test]
    fn test_invalid_tensor_creation() {
        let err = Tensor::new(vec![1.0_f32, 2.0, 3.0, 4.0], 3, 2).unwrap_err();
        assert_eq!(
            err,
            TensorError::InvalidShape {
                shape: vec![3, 2],
                len: 4
            }
        );
    }

    #[test]
    fn test_from_vec_is_column() {
        let t = Tensor::from_vec(vec![1.0_f64, 2.0, 3.0]);
        assert_eq!(t.dims(), (3, 1));
        assert!(t.is_col_vector());
        assert!(!t.is_row_vector());
    }

    #[test]
    fn test_from_rows() {
        let t = Tensor::from_rows(vec![vec![1.0_f64, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(t.dims(), (3, 2));
        assert_eq!(t.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_from_rows_ragged() {
        let err = Tensor::from_rows(vec![vec![1.0_f64, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, TensorError::RaggedRows { row: 1, .. }));
    }

    #[test]
    fn test_from_shape_vec() {
        let t = Tensor::from_shape_vec([2, 3], vec![1.0_f32; 6]).unwrap();
        assert_eq!(t.dims(), (2, 3));

        let v = Tensor::from_shape_vec([4], vec![0.0_f32; 4]).unwrap();
        assert!(v.is_col_vector());

        assert!(Tensor::from_shape_vec([2, 2], vec![0.0_f32; 3]).is_err());
        assert!(Tensor::from_shape_vec([1, 1, 1], vec![0.0_f32]).is_err());
    }

    #[test]
    fn test_with_shape_is_zero_filled() {
        let t = Tensor::<f32>::with_shape(&TensorShape::from([2, 3])).unwrap();
        assert_eq!(t.dims(), (2, 3));
        assert!(t.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_tensor_randn() {
        let t = Tensor::<f32>::randn(2, 2);
        assert_eq!(t.len(), 4);
        assert!(t.as_slice().iter().all(|&x| (-1.0..=1.0).contains(&x)));
    }

    // ========================================================================
    // Shape Classification Tests
    // ========================================================================

    #[test]
    fn test_classification() {
        assert!(Tensor::scalar(1.0_f32).is_scalar());
        assert!(!Tensor::scalar(1.0_f32).is_vector());
        assert!(Tensor::<f32>::zeros(1, 3).is_row_vector());
        assert!(Tensor::<f32>::zeros(3, 1).is_col_vector());
        assert!(!Tensor::<f32>::zeros(2, 2).is_vector());
    }

    #[test]
    fn test_reshape_updates_classification() {
        let mut t = Tensor::from_vec(vec![1.0_f32, 2.0, 3.0, 4.0]);
        assert!(t.is_col_vector());
        t.reshape(1, 4).unwrap();
        assert!(t.is_row_vector());
        t.reshape(2, 2).unwrap();
        assert!(!t.is_vector());
        assert_eq!(t.get(1, 1), Some(4.0));
        assert!(t.reshape(3, 3).is_err());
        assert_eq!(t.dims(), (2, 2));
    }

    #[test]
    fn test_transpose() {
        let t = Tensor::from_rows(vec![vec![1.0_f32, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let tt = t.t();
        assert_eq!(tt.dims(), (3, 2));
        assert_eq!(tt.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(tt.t(), t);
    }

    // ========================================================================
    // Reduction Tests
    // ========================================================================

    #[test]
    fn test_min_max_sum() {
        let t = Tensor::from_rows(vec![vec![3.0_f32, -1.0], vec![7.0, 2.0]]).unwrap();
        assert_eq!(t.min(), -1.0);
        assert_eq!(t.max(), 7.0);
        assert_eq!(t.sum(), 11.0);
    }

    #[test]
    fn test_mean_and_stddev_are_scalars() {
        let t = Tensor::from_vec(vec![2.0_f64, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let mean = t.mean();
        assert!(mean.is_scalar());
        assert_relative_eq!(mean.item(), 5.0);
        // sample variance = 32 / 7
        assert_relative_eq!(t.stddev().item(), (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
        assert_eq!(Tensor::scalar(3.0_f64).stddev().item(), 0.0);
    }

    #[test]
    fn test_row_sums() {
        let t = Tensor::from_rows(vec![vec![1.0_f32, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        let sums = t.row_sums();
        assert_eq!(sums.dims(), (3, 1));
        assert_eq!(sums.as_slice(), &[3.0, 7.0, 11.0]);
    }

    #[test]
    fn test_row_sums_of_zero_width() {
        let sums = Tensor::<f32>::zeros(3, 0).row_sums();
        assert_eq!(sums.dims(), (3, 1));
        assert_eq!(sums.as_slice(), &[0.0; 3]);
    }

    // ========================================================================
    // Elementwise Function Tests
    // ========================================================================

    #[test]
    fn test_signum_zero_is_zero() {
        let t = Tensor::from_vec(vec![-2.0_f32, 0.0, 3.0]);
        assert_eq!(t.signum().as_slice(), &[-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_trig_and_log() {
        let t = Tensor::from_vec(vec![0.0_f64, 1.0]);
        assert_eq!(t.sin().as_slice()[0], 0.0);
        assert_eq!(t.cos().as_slice()[0], 1.0);
        assert_relative_eq!(t.tan().as_slice()[1], 1.0_f64.tan());
        assert_relative_eq!(t.exp().log().as_slice()[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_display() {
        let t = Tensor::from_rows(vec![vec![1.0_f32, 2.0], vec![3.0, 4.0]]).unwrap();
        let rendered = t.to_string();
        assert_eq!(rendered.lines().count(), 2);
        assert!(rendered.contains("1.0000"));
        assert!(rendered.contains("4.0000"));
    }
}
