use std::fmt;
use std::ops::Index;

use crate::error::TensorError;

/// Ordered list of dimension sizes.
///
/// Shapes describe tensors at the API boundary (layer parameters, data
/// loading). The storage itself is always `rows x cols`, so only ranks 0, 1
/// and 2 have a layout: `[]` is a scalar, `[n]` a column vector of length
/// `n`, and `[r, c]` a matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TensorShape {
    dims: Vec<usize>,
}

impl TensorShape {
    pub fn new(dims: Vec<usize>) -> Self {
        TensorShape { dims }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Last dimension, the feature axis for layer inputs. A scalar has one.
    pub fn last(&self) -> usize {
        self.dims.last().copied().unwrap_or(1)
    }

    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Storage layout `(rows, cols)` for this shape.
    pub fn matrix_dims(&self) -> Result<(usize, usize), TensorError> {
        match self.dims.as_slice() {
            [] => Ok((1, 1)),
            [n] => Ok((*n, 1)),
            [rows, cols] => Ok((*rows, *cols)),
            _ => Err(TensorError::UnsupportedRank { rank: self.rank() }),
        }
    }
}

impl Index<usize> for TensorShape {
    type Output = usize;

    fn index(&self, dim: usize) -> &usize {
        &self.dims[dim]
    }
}

impl From<Vec<usize>> for TensorShape {
    fn from(dims: Vec<usize>) -> Self {
        TensorShape::new(dims)
    }
}

impl From<&[usize]> for TensorShape {
    fn from(dims: &[usize]) -> Self {
        TensorShape::new(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for TensorShape {
    fn from(dims: [usize; N]) -> Self {
        TensorShape::new(dims.to_vec())
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_and_layout() {
        assert_eq!(TensorShape::new(vec![]).matrix_dims(), Ok((1, 1)));
        assert_eq!(TensorShape::from([4]).matrix_dims(), Ok((4, 1)));
        assert_eq!(TensorShape::from([2, 3]).matrix_dims(), Ok((2, 3)));
        assert_eq!(TensorShape::from([2, 3]).rank(), 2);
        assert_eq!(TensorShape::from([2, 3])[1], 3);
    }

    #[test]
    fn test_rank_three_is_rejected() {
        assert_eq!(
            TensorShape::from([2, 2, 2]).matrix_dims(),
            Err(TensorError::UnsupportedRank { rank: 3 })
        );
    }

    #[test]
    fn test_last_dimension() {
        assert_eq!(TensorShape::new(vec![]).last(), 1);
        assert_eq!(TensorShape::from([7, 3]).last(), 3);
    }
}
