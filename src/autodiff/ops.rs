//! The operation catalog.
//!
//! Each builder computes the forward value eagerly and records the operands;
//! [`Op::backward`] holds the matching local-gradient rule. Every local
//! gradient is collapsed onto its operand's shape before it is sent on, and
//! operands that cannot reach a variable are skipped.

use tracing::debug;

use super::handle::{Expr, Operand};
use super::node::{Node, NodeRef};
use crate::error::TensorError;
use crate::tensor::{cast, kernels, Element, Tensor};

/// An operation node's kind and operands.
pub enum Op<T: Element> {
    Add(NodeRef<T>, NodeRef<T>),
    Sub(NodeRef<T>, NodeRef<T>),
    /// Elementwise product
    Mul(NodeRef<T>, NodeRef<T>),
    MatMul(NodeRef<T>, NodeRef<T>),
    Div(NodeRef<T>, NodeRef<T>),
    Pow(NodeRef<T>, NodeRef<T>),
    Neg(NodeRef<T>),
    Abs(NodeRef<T>),
    Mean(NodeRef<T>),
    Sin(NodeRef<T>),
    Cos(NodeRef<T>),
    Tan(NodeRef<T>),
}

impl<T: Element> Op<T> {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Add(..) => "Add",
            Op::Sub(..) => "Sub",
            Op::Mul(..) => "Mul",
            Op::MatMul(..) => "MatMul",
            Op::Div(..) => "Div",
            Op::Pow(..) => "Pow",
            Op::Neg(_) => "Neg",
            Op::Abs(_) => "Abs",
            Op::Mean(_) => "Mean",
            Op::Sin(_) => "Sin",
            Op::Cos(_) => "Cos",
            Op::Tan(_) => "Tan",
        }
    }

    pub fn operands(&self) -> Vec<&NodeRef<T>> {
        match self {
            Op::Add(l, r) | Op::Sub(l, r) | Op::Mul(l, r) | Op::MatMul(l, r) | Op::Div(l, r) | Op::Pow(l, r) => {
                vec![l, r]
            }
            Op::Neg(x) | Op::Abs(x) | Op::Mean(x) | Op::Sin(x) | Op::Cos(x) | Op::Tan(x) => vec![x],
        }
    }

    /// Send each operand its share of `g`, the gradient arriving at this node.
    pub(crate) fn backward(&self, g: &Tensor<T>) -> Result<(), TensorError> {
        match self {
            Op::Add(l, r) => {
                send(l, || Ok(g.clone()))?;
                send(r, || Ok(g.clone()))
            }
            Op::Sub(l, r) => {
                send(l, || Ok(g.clone()))?;
                send(r, || Ok(-g))
            }
            Op::Mul(l, r) => {
                send(l, || g.hadamard(r.value()))?;
                send(r, || g.hadamard(l.value()))
            }
            Op::MatMul(l, r) => matmul_backward(l, r, g),
            Op::Div(l, r) => {
                send(l, || g.div(r.value()))?;
                send(r, || {
                    // -g * l / r^2
                    let r2 = r.value().hadamard(r.value())?;
                    (-g).hadamard(l.value())?.div(&r2)
                })
            }
            Op::Pow(l, r) => {
                send(l, || {
                    let lowered = r.value().sub(&Tensor::scalar(T::one()))?;
                    g.hadamard(r.value())?.hadamard(&l.value().pow(&lowered)?)
                })?;
                send(r, || {
                    let powered = l.value().pow(r.value())?;
                    g.hadamard(&powered)?.hadamard(&l.value().log())
                })
            }
            Op::Neg(x) => send(x, || Ok(-g)),
            Op::Abs(x) => send(x, || x.value().signum().hadamard(g)),
            Op::Mean(x) => send(x, || {
                let (rows, cols) = x.value().dims();
                Ok(Tensor::full(rows, cols, g.sum() / cast(x.value().len())))
            }),
            Op::Sin(x) => send(x, || g.hadamard(&x.value().cos())),
            Op::Cos(x) => send(x, || (-g).hadamard(&x.value().sin())),
            Op::Tan(x) => send(x, || {
                let c = x.value().cos();
                g.div(&c.hadamard(&c)?)
            }),
        }
    }
}

/// Compute an operand's local gradient lazily, shape it, and recurse.
fn send<T: Element>(
    node: &NodeRef<T>,
    local: impl FnOnce() -> Result<Tensor<T>, TensorError>,
) -> Result<(), TensorError> {
    if !node.requires_grad() {
        return Ok(());
    }
    let grad = local()?.reduce_to(node.value())?;
    node.derive(&grad)
}

fn matmul_backward<T: Element>(l: &NodeRef<T>, r: &NodeRef<T>, g: &Tensor<T>) -> Result<(), TensorError> {
    let (lv, rv) = (l.value(), r.value());

    if lv.is_scalar() {
        send(l, || Ok(Tensor::scalar(g.hadamard(rv)?.sum())))?;
        return send(r, || Ok(g.scale(lv.item())));
    }
    if rv.is_scalar() {
        send(l, || Ok(g.scale(rv.item())))?;
        return send(r, || Ok(Tensor::scalar(g.hadamard(lv)?.sum())));
    }
    // Outer product of two columns: out = l * r^T
    if lv.is_col_vector() && rv.is_col_vector() {
        send(l, || g.matmul(rv))?;
        return send(r, || g.t().matmul(lv));
    }

    if g.dims() != (lv.rows(), rv.cols()) {
        return Err(TensorError::shape_mismatch("matmul_backward", g, lv));
    }
    let g_shape = [g.rows(), g.cols()];
    // dL/dA = grad_output @ B^T
    send(l, || {
        let mut a_grad = Tensor::zeros_like(lv);
        kernels::matmul_backward_left(g.as_slice(), g_shape, rv.as_slice(), [rv.rows(), rv.cols()], a_grad.data_mut());
        Ok(a_grad)
    })?;
    // dL/dB = A^T @ grad_output
    send(r, || {
        let mut b_grad = Tensor::zeros_like(rv);
        kernels::matmul_backward_right(lv.as_slice(), [lv.rows(), lv.cols()], g.as_slice(), g_shape, b_grad.data_mut());
        Ok(b_grad)
    })
}

fn record<T: Element>(op: Op<T>, value: Tensor<T>) -> Expr<T> {
    debug!(op = op.name(), dims = ?value.dims(), "recorded operation");
    Expr::from_node(Node::operation(op, value))
}

macro_rules! binary_builder {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $method:ident) => {
        $(#[$doc])*
        pub fn $name<T: Element>(l: impl Operand<T>, r: impl Operand<T>) -> Result<Expr<T>, TensorError> {
            let (l, r) = (l.into_node(), r.into_node());
            let value = l.value().$method(r.value())?;
            Ok(record(Op::$variant(l, r), value))
        }
    };
}

macro_rules! unary_builder {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $forward:expr) => {
        $(#[$doc])*
        pub fn $name<T: Element>(x: impl Operand<T>) -> Expr<T> {
            let x = x.into_node();
            let forward: fn(&Tensor<T>) -> Tensor<T> = $forward;
            let value = forward(x.value());
            record(Op::$variant(x), value)
        }
    };
}

binary_builder!(
    /// `l + r` with scalar replication
    try_add, Add, add
);
binary_builder!(
    /// `l - r` with scalar replication
    try_sub, Sub, sub
);
binary_builder!(
    /// Elementwise product
    try_mul, Mul, hadamard
);
binary_builder!(
    /// Matrix product. A scalar on either side scales the other operand and
    /// two column vectors give their outer product.
    try_matmul, MatMul, matmul
);
binary_builder!(
    /// Elementwise quotient
    try_div, Div, div
);
binary_builder!(
    /// Elementwise `l ^ r`
    try_pow, Pow, pow
);

unary_builder!(neg, Neg, |x| -x);
unary_builder!(abs, Abs, Tensor::abs);
unary_builder!(
    /// Arithmetic mean of every element, as a 1x1 value
    mean, Mean, Tensor::mean
);
unary_builder!(sin, Sin, Tensor::sin);
unary_builder!(cos, Cos, Tensor::cos);
unary_builder!(tan, Tan, Tensor::tan);
