//! Kernel implementations for tensor operations
//!
//! The dense backend is a single strided GEMM. Everything above it (tensor
//! arithmetic, the autodiff graph) treats it as an opaque primitive.

pub mod gemm;

pub use gemm::{matmul, matmul_backward_left, matmul_backward_right};
