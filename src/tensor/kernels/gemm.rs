//! General Matrix Multiply (GEMM) over row-major buffers
//!
//! All three entry points run the same loop over strided views. A transposed
//! operand is the same buffer with its strides swapped, so the backward
//! products never materialize `A^T` or `B^T`.

use crate::tensor::Element;

/// Borrowed matrix with explicit strides
#[derive(Clone, Copy)]
struct View<'a, T> {
    data: &'a [T],
    rows: usize,
    cols: usize,
    row_stride: usize,
    col_stride: usize,
}

impl<'a, T: Element> View<'a, T> {
    fn row_major(data: &'a [T], shape: [usize; 2]) -> Self {
        View {
            data,
            rows: shape[0],
            cols: shape[1],
            row_stride: shape[1],
            col_stride: 1,
        }
    }

    fn t(self) -> Self {
        View {
            rows: self.cols,
            cols: self.rows,
            row_stride: self.col_stride,
            col_stride: self.row_stride,
            ..self
        }
    }

    #[inline]
    fn at(&self, i: usize, j: usize) -> T {
        self.data[i * self.row_stride + j * self.col_stride]
    }
}

/// `out += a @ b`, with `out` row-major `[a.rows, b.cols]`
fn gemm_accumulate<T: Element>(a: View<'_, T>, b: View<'_, T>, out: &mut [T]) {
    debug_assert_eq!(a.cols, b.rows);
    assert_eq!(out.len(), a.rows * b.cols, "Output buffer size mismatch");

    for i in 0..a.rows {
        let out_row = &mut out[i * b.cols..(i + 1) * b.cols];
        for (j, c) in out_row.iter_mut().enumerate() {
            let mut sum = T::zero();
            for p in 0..a.cols {
                sum = sum + a.at(i, p) * b.at(p, j);
            }
            *c = *c + sum;
        }
    }
}

/// `C = A @ B` for row-major `A: [m, k]` and `B: [k, n]`
///
/// # Panics
/// If `a_shape[1] != b_shape[0]`.
pub fn matmul<T: Element>(a_data: &[T], a_shape: [usize; 2], b_data: &[T], b_shape: [usize; 2]) -> Vec<T> {
    assert_eq!(
        a_shape[1], b_shape[0],
        "Incompatible dimensions: A has {} columns but B has {} rows",
        a_shape[1], b_shape[0]
    );

    let mut result = vec![T::zero(); a_shape[0] * b_shape[1]];
    gemm_accumulate(View::row_major(a_data, a_shape), View::row_major(b_data, b_shape), &mut result);
    result
}

/// Accumulate `dL/dA = grad_output @ B^T` into `a_grad` (`[m, k]`).
pub fn matmul_backward_left<T: Element>(
    grad_output: &[T],
    grad_shape: [usize; 2],
    b_data: &[T],
    b_shape: [usize; 2],
    a_grad: &mut [T],
) {
    assert_eq!(b_shape[1], grad_shape[1], "Dimension mismatch in backward left");
    assert_eq!(a_grad.len(), grad_shape[0] * b_shape[0], "Gradient buffer size mismatch");

    let g = View::row_major(grad_output, grad_shape);
    let b = View::row_major(b_data, b_shape);
    gemm_accumulate(g, b.t(), a_grad);
}

/// Accumulate `dL/dB = A^T @ grad_output` into `b_grad` (`[k, n]`).
pub fn matmul_backward_right<T: Element>(
    a_data: &[T],
    a_shape: [usize; 2],
    grad_output: &[T],
    grad_shape: [usize; 2],
    b_grad: &mut [T],
) {
    assert_eq!(grad_shape[0], a_shape[0], "Dimension mismatch in backward right");
    assert_eq!(b_grad.len(), a_shape[1] * grad_shape[1], "Gradient buffer size mismatch");

    let a = View::row_major(a_data, a_shape);
    let g = View::row_major(grad_output, grad_shape);
    gemm_accumulate(a.t(), g, b_grad);
}
