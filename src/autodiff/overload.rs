//! Operator sugar for graph handles.
//!
//! `+ - /` build Add, Sub and Div nodes. `*` builds a MatMul node and `%` the
//! elementwise Mul node. Each operator panics with the shape-mismatch
//! message; the `ops::try_*` builders return it instead.

use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

use super::handle::{Constant, Expr, Operand, Param, Variable};
use super::ops;
use crate::tensor::Element;

macro_rules! impl_handle_ops {
    ($($Handle:ident),*) => {
        $(
            impl_handle_ops!(@op $Handle, Add, add, try_add);
            impl_handle_ops!(@op $Handle, Sub, sub, try_sub);
            impl_handle_ops!(@op $Handle, Div, div, try_div);
            impl_handle_ops!(@op $Handle, Mul, mul, try_matmul);
            impl_handle_ops!(@op $Handle, Rem, rem, try_mul);

            impl<T: Element> Neg for $Handle<T> {
                type Output = Expr<T>;

                fn neg(self) -> Expr<T> {
                    ops::neg(self)
                }
            }

            impl<T: Element> Neg for &$Handle<T> {
                type Output = Expr<T>;

                fn neg(self) -> Expr<T> {
                    ops::neg(self)
                }
            }
        )*
    };
    (@op $Handle:ident, $Op:ident, $op_fn:ident, $build:ident) => {
        impl<T: Element, R: Operand<T>> $Op<R> for $Handle<T> {
            type Output = Expr<T>;

            fn $op_fn(self, rhs: R) -> Expr<T> {
                ops::$build(self, rhs).unwrap_or_else(|err| panic!("{err}"))
            }
        }

        impl<T: Element, R: Operand<T>> $Op<R> for &$Handle<T> {
            type Output = Expr<T>;

            fn $op_fn(self, rhs: R) -> Expr<T> {
                ops::$build(self, rhs).unwrap_or_else(|err| panic!("{err}"))
            }
        }
    };
}

impl_handle_ops!(Expr, Constant, Variable, Param);

// Scalars on the left: `3.0 * x`, `1.0 - y`.
macro_rules! impl_scalar_lhs {
    ($($scalar:ty),*) => {
        $(
            impl_scalar_lhs!(@handles $scalar, Expr, Constant, Variable, Param);
        )*
    };
    (@handles $scalar:ty, $($Handle:ident),*) => {
        $(
            impl_scalar_lhs!(@op $scalar, $Handle, Add, add, try_add);
            impl_scalar_lhs!(@op $scalar, $Handle, Sub, sub, try_sub);
            impl_scalar_lhs!(@op $scalar, $Handle, Div, div, try_div);
            impl_scalar_lhs!(@op $scalar, $Handle, Mul, mul, try_matmul);
            impl_scalar_lhs!(@op $scalar, $Handle, Rem, rem, try_mul);
        )*
    };
    (@op $scalar:ty, $Handle:ident, $Op:ident, $op_fn:ident, $build:ident) => {
        impl $Op<$Handle<$scalar>> for $scalar {
            type Output = Expr<$scalar>;

            fn $op_fn(self, rhs: $Handle<$scalar>) -> Expr<$scalar> {
                ops::$build(self, rhs).unwrap_or_else(|err| panic!("{err}"))
            }
        }

        impl $Op<&$Handle<$scalar>> for $scalar {
            type Output = Expr<$scalar>;

            fn $op_fn(self, rhs: &$Handle<$scalar>) -> Expr<$scalar> {
                ops::$build(self, rhs).unwrap_or_else(|err| panic!("{err}"))
            }
        }
    };
}

impl_scalar_lhs!(f32, f64);
