//! Tensor module containing the 2-D numeric container and its kernels
//!
//! This module provides the core `Tensor` type, the broadcasting rules that
//! let scalars, vectors and matrices combine, and the GEMM primitive used for
//! true matrix products.

use std::fmt::{Debug, Display};

use num_traits::{Float, ToPrimitive};
use rand::distributions::uniform::SampleUniform;

mod broadcast;
mod core;
pub mod kernels;
mod ops;
mod shape;

pub use self::core::Tensor;
pub use shape::TensorShape;

/// Floating element type a tensor can hold.
///
/// Implemented for every type that satisfies the bounds, which in practice
/// means `f32` and `f64`.
pub trait Element: Float + Debug + Display + Default + SampleUniform + 'static {}

impl<T> Element for T where T: Float + Debug + Display + Default + SampleUniform + 'static {}

/// Converts a count or hyperparameter into the element type.
pub(crate) fn cast<T: Element, N: ToPrimitive>(n: N) -> T {
    T::from(n).unwrap_or_else(T::nan)
}
