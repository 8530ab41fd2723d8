//! Tensor arithmetic
//!
//! Fallible named methods (`add`, `sub`, `div`, `hadamard`, `pow`, `matmul`,
//! `try_*_assign`) return [`TensorError::ShapeMismatch`] when no broadcasting
//! rule reconciles the operands. The `std::ops` operators call the same methods
//! and panic with the error message instead.
//!
//! `*` is the true matrix product; the elementwise product is `%`.

use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, Sub, SubAssign};

use tracing::instrument;

use super::broadcast::{elementwise_pair, fit_to};
use super::kernels;
use super::{Element, Tensor};
use crate::error::TensorError;

impl<T: Element> Tensor<T> {
    fn elementwise(&self, other: &Tensor<T>, op: &'static str, f: impl Fn(T, T) -> T) -> Result<Tensor<T>, TensorError> {
        let (l, r) = elementwise_pair(self, other);
        if !l.same_dims(&r) {
            return Err(TensorError::shape_mismatch(op, self, other));
        }
        Ok(l.zip_map(&r, f))
    }

    /// Element-wise addition
    pub fn add(&self, other: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        self.elementwise(other, "add", |a, b| a + b)
    }

    /// Element-wise subtraction
    pub fn sub(&self, other: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        self.elementwise(other, "sub", |a, b| a - b)
    }

    /// Element-wise division
    pub fn div(&self, other: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        self.elementwise(other, "div", |a, b| a / b)
    }

    /// Element-wise (Hadamard) product
    pub fn hadamard(&self, other: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        self.elementwise(other, "hadamard", |a, b| a * b)
    }

    /// Element-wise power. Non-positive bases with fractional exponents give
    /// NaN; they are not checked.
    pub fn pow(&self, exponent: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        self.elementwise(exponent, "pow", T::powf)
    }

    /// Matrix multiplication
    ///
    /// A scalar on either side scales the other operand. Two column vectors
    /// give their outer product `l * r^T`. Anything else is a standard matrix
    /// product and needs `self.cols() == other.rows()`.
    #[instrument(level = "debug", skip_all, fields(shape_a = ?self.dims(), shape_b = ?other.dims()))]
    pub fn matmul(&self, other: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        if self.is_scalar() {
            return Ok(other.scale(self.item()));
        }
        if other.is_scalar() {
            return Ok(self.scale(other.item()));
        }
        if self.is_col_vector() && other.is_col_vector() {
            let data = kernels::matmul(self.as_slice(), [self.rows(), 1], other.as_slice(), [1, other.rows()]);
            return Ok(Tensor::from_parts(data, self.rows(), other.rows()));
        }
        if self.cols() != other.rows() {
            return Err(TensorError::shape_mismatch("matmul", self, other));
        }
        let data = kernels::matmul(self.as_slice(), [self.rows(), self.cols()], other.as_slice(), [other.rows(), other.cols()]);
        Ok(Tensor::from_parts(data, self.rows(), other.cols()))
    }

    fn assign_with(&mut self, other: &Tensor<T>, op: &'static str, f: impl Fn(T, T) -> T) -> Result<(), TensorError> {
        let fitted = fit_to(self, other);
        if !self.same_dims(&fitted) {
            return Err(TensorError::shape_mismatch(op, self, other));
        }
        for (a, &b) in self.data_mut().iter_mut().zip(fitted.as_slice()) {
            *a = f(*a, b);
        }
        Ok(())
    }

    /// `self += other` after shaping `other` to `self`
    pub fn try_add_assign(&mut self, other: &Tensor<T>) -> Result<(), TensorError> {
        self.assign_with(other, "add_assign", |a, b| a + b)
    }

    /// `self -= other` after shaping `other` to `self`
    pub fn try_sub_assign(&mut self, other: &Tensor<T>) -> Result<(), TensorError> {
        self.assign_with(other, "sub_assign", |a, b| a - b)
    }

    /// Element-wise `self *= other` after shaping `other` to `self`
    pub fn try_mul_assign(&mut self, other: &Tensor<T>) -> Result<(), TensorError> {
        self.assign_with(other, "mul_assign", |a, b| a * b)
    }

    /// `self /= other` after shaping `other` to `self`
    pub fn try_div_assign(&mut self, other: &Tensor<T>) -> Result<(), TensorError> {
        self.assign_with(other, "div_assign", |a, b| a / b)
    }

    /// Collapse a gradient onto the shape of the value it belongs to.
    ///
    /// A gradient shaped like `like` is returned as is. A vector gradient
    /// that is the transpose of `like` is transposed back. Anything else goes
    /// through the in-place broadcast rules, so a scalar receives the total.
    pub(crate) fn reduce_to(self, like: &Tensor<T>) -> Result<Tensor<T>, TensorError> {
        if self.same_dims(like) {
            return Ok(self);
        }
        if self.is_vector() && self.dims() == (like.cols(), like.rows()) {
            return Ok(self.t());
        }
        let mut reduced = Tensor::zeros_like(like);
        reduced.try_add_assign(&self)?;
        Ok(reduced)
    }
}

macro_rules! impl_binary_op {
    ($Op:ident, $op_fn:ident, $method:ident) => {
        impl<T: Element> $Op<&Tensor<T>> for &Tensor<T> {
            type Output = Tensor<T>;

            fn $op_fn(self, rhs: &Tensor<T>) -> Tensor<T> {
                Tensor::$method(self, rhs).unwrap_or_else(|err| panic!("{err}"))
            }
        }

        impl<T: Element> $Op<Tensor<T>> for Tensor<T> {
            type Output = Tensor<T>;

            fn $op_fn(self, rhs: Tensor<T>) -> Tensor<T> {
                <&Tensor<T> as $Op<&Tensor<T>>>::$op_fn(&self, &rhs)
            }
        }

        impl<T: Element> $Op<&Tensor<T>> for Tensor<T> {
            type Output = Tensor<T>;

            fn $op_fn(self, rhs: &Tensor<T>) -> Tensor<T> {
                <&Tensor<T> as $Op<&Tensor<T>>>::$op_fn(&self, rhs)
            }
        }

        impl<T: Element> $Op<Tensor<T>> for &Tensor<T> {
            type Output = Tensor<T>;

            fn $op_fn(self, rhs: Tensor<T>) -> Tensor<T> {
                <&Tensor<T> as $Op<&Tensor<T>>>::$op_fn(self, &rhs)
            }
        }

        impl<T: Element> $Op<T> for &Tensor<T> {
            type Output = Tensor<T>;

            fn $op_fn(self, rhs: T) -> Tensor<T> {
                <&Tensor<T> as $Op<&Tensor<T>>>::$op_fn(self, &Tensor::scalar(rhs))
            }
        }

        impl<T: Element> $Op<T> for Tensor<T> {
            type Output = Tensor<T>;

            fn $op_fn(self, rhs: T) -> Tensor<T> {
                <&Tensor<T> as $Op<&Tensor<T>>>::$op_fn(&self, &Tensor::scalar(rhs))
            }
        }
    };
}

impl_binary_op!(Add, add, add);
impl_binary_op!(Sub, sub, sub);
impl_binary_op!(Div, div, div);
impl_binary_op!(Rem, rem, hadamard);
impl_binary_op!(Mul, mul, matmul);

macro_rules! impl_scalar_lhs {
    ($($scalar:ty),*) => {
        $(
            impl_scalar_lhs!(@op $scalar, Add, add);
            impl_scalar_lhs!(@op $scalar, Sub, sub);
            impl_scalar_lhs!(@op $scalar, Div, div);
            impl_scalar_lhs!(@op $scalar, Rem, rem);
            impl_scalar_lhs!(@op $scalar, Mul, mul);
        )*
    };
    (@op $scalar:ty, $Op:ident, $op_fn:ident) => {
        impl $Op<&Tensor<$scalar>> for $scalar {
            type Output = Tensor<$scalar>;

            fn $op_fn(self, rhs: &Tensor<$scalar>) -> Tensor<$scalar> {
                <&Tensor<$scalar> as $Op<&Tensor<$scalar>>>::$op_fn(&Tensor::scalar(self), rhs)
            }
        }

        impl $Op<Tensor<$scalar>> for $scalar {
            type Output = Tensor<$scalar>;

            fn $op_fn(self, rhs: Tensor<$scalar>) -> Tensor<$scalar> {
                <&Tensor<$scalar> as $Op<&Tensor<$scalar>>>::$op_fn(&Tensor::scalar(self), &rhs)
            }
        }
    };
}

impl_scalar_lhs!(f32, f64);

impl<T: Element> Neg for &Tensor<T> {
    type Output = Tensor<T>;

    fn neg(self) -> Tensor<T> {
        self.map(|x| -x)
    }
}

impl<T: Element> Neg for Tensor<T> {
    type Output = Tensor<T>;

    fn neg(self) -> Tensor<T> {
        -&self
    }
}

macro_rules! impl_assign_op {
    ($Op:ident, $op_fn:ident, $method:ident) => {
        impl<T: Element> $Op<&Tensor<T>> for Tensor<T> {
            fn $op_fn(&mut self, rhs: &Tensor<T>) {
                self.$method(rhs).unwrap_or_else(|err| panic!("{err}"))
            }
        }

        impl<T: Element> $Op<Tensor<T>> for Tensor<T> {
            fn $op_fn(&mut self, rhs: Tensor<T>) {
                <Tensor<T> as $Op<&Tensor<T>>>::$op_fn(self, &rhs)
            }
        }

        impl<T: Element> $Op<T> for Tensor<T> {
            fn $op_fn(&mut self, rhs: T) {
                <Tensor<T> as $Op<&Tensor<T>>>::$op_fn(self, &Tensor::scalar(rhs))
            }
        }
    };
}

impl_assign_op!(AddAssign, add_assign, try_add_assign);
impl_assign_op!(SubAssign, sub_assign, try_sub_assign);
impl_assign_op!(MulAssign, mul_assign, try_mul_assign);
impl_assign_op!(DivAssign, div_assign, try_div_assign);
