//! Broadcasting rules between tensors of different shapes.
//!
//! The rules are deliberately asymmetric. Ordinary binary operators replicate
//! a scalar operand on either side. In-place combinators instead shape the
//! right operand to fit the left one, which for a scalar left operand means
//! reducing the right operand to its total sum. That reduction is what lets a
//! scalar parameter accumulate the gradient of a matrix-valued expression.
//!
//! Neither function fails. When no rule applies the operand is returned
//! unchanged, and the caller's shape check reports the mismatch.

use std::borrow::Cow;

use super::{Element, Tensor};

/// Shape both operands of an ordinary elementwise operation.
pub(crate) fn elementwise_pair<'a, T: Element>(
    l: &'a Tensor<T>,
    r: &'a Tensor<T>,
) -> (Cow<'a, Tensor<T>>, Cow<'a, Tensor<T>>) {
    if l.is_scalar() && !r.is_scalar() {
        return (Cow::Owned(tile(l, r.rows(), r.cols())), Cow::Borrowed(r));
    }
    if r.is_scalar() && !l.is_scalar() {
        return (Cow::Borrowed(l), Cow::Owned(tile(r, l.rows(), l.cols())));
    }
    // A row of length n against a column of n: summing the column's columns
    // is the identity, so aligning it is a transpose.
    if l.is_row_vector() && r.is_col_vector() && l.cols() == r.rows() {
        return (Cow::Borrowed(l), Cow::Owned(r.t()));
    }
    (Cow::Borrowed(l), Cow::Borrowed(r))
}

/// Shape the right operand of an in-place combinator to the left's shape.
pub(crate) fn fit_to<'a, T: Element>(target: &Tensor<T>, t: &'a Tensor<T>) -> Cow<'a, Tensor<T>> {
    if target.is_scalar() {
        if t.is_scalar() {
            return Cow::Borrowed(t);
        }
        return Cow::Owned(Tensor::scalar(t.sum()));
    }
    if t.is_scalar() {
        return Cow::Owned(tile(t, target.rows(), target.cols()));
    }
    if target.is_row_vector() && target.cols() == t.rows() {
        return Cow::Owned(t.row_sums().t());
    }
    Cow::Borrowed(t)
}

/// Replicate a scalar over `rows x cols`.
fn tile<T: Element>(scalar: &Tensor<T>, rows: usize, cols: usize) -> Tensor<T> {
    Tensor::full(rows, cols, scalar.item())
}
