//! User-facing handles over graph nodes.
//!
//! Every handle is a cheap `Rc` clone of a node. [`Variable`] is the only one
//! that rebinds: in-place arithmetic and [`Variable::set_value`] point the
//! handle at a new node and leave the old graph untouched.

use std::fmt;
use std::ops::{AddAssign, SubAssign};
use std::rc::Rc;

use tracing::debug_span;

use super::node::{Node, NodeKind, NodeRef};
use super::ops;
use crate::error::TensorError;
use crate::tensor::{Element, Tensor, TensorShape};

/// Anything that can stand as an operand of a graph operation.
///
/// Tensors and plain scalars become fresh Constant leaves.
pub trait Operand<T: Element> {
    fn into_node(self) -> NodeRef<T>;
}

/// Methods shared by every handle.
pub trait NodeOps<T: Element> {
    fn node(&self) -> &NodeRef<T>;

    fn value(&self) -> &Tensor<T> {
        self.node().value()
    }

    fn requires_grad(&self) -> bool {
        self.node().requires_grad()
    }

    /// A plain expression handle on the same node.
    fn expr(&self) -> Expr<T> {
        Expr::from_node(Rc::clone(self.node()))
    }

    fn sin(&self) -> Expr<T> {
        ops::sin(self.node())
    }

    fn cos(&self) -> Expr<T> {
        ops::cos(self.node())
    }

    fn tan(&self) -> Expr<T> {
        ops::tan(self.node())
    }

    fn abs(&self) -> Expr<T> {
        ops::abs(self.node())
    }

    fn mean(&self) -> Expr<T> {
        ops::mean(self.node())
    }

    fn try_pow(&self, exponent: impl Operand<T>) -> Result<Expr<T>, TensorError> {
        ops::try_pow(self.node(), exponent)
    }

    /// Elementwise power. Panics on a shape mismatch; see [`NodeOps::try_pow`].
    fn pow(&self, exponent: impl Operand<T>) -> Expr<T> {
        self.try_pow(exponent).unwrap_or_else(|err| panic!("{err}"))
    }

    fn try_matmul(&self, rhs: impl Operand<T>) -> Result<Expr<T>, TensorError> {
        ops::try_matmul(self.node(), rhs)
    }

    fn matmul(&self, rhs: impl Operand<T>) -> Expr<T> {
        self.try_matmul(rhs).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Run a backward pass from this node with the given seed gradient.
    ///
    /// A scalar seed is replicated over a non-scalar value. Gradients are
    /// added to every reachable accumulator; nothing is reset first.
    fn derive(&self, seed: &Tensor<T>) -> Result<(), TensorError> {
        let node = self.node();
        let _span = debug_span!("derive", root = node.name(), dims = ?node.value().dims()).entered();
        let value = node.value();
        if seed.same_dims(value) {
            node.derive(seed)
        } else if seed.is_scalar() {
            node.derive(&Tensor::full(value.rows(), value.cols(), seed.item()))
        } else {
            Err(TensorError::shape_mismatch("derive", value, seed))
        }
    }

    /// `derive` with a seed of ones.
    fn backward(&self) -> Result<(), TensorError> {
        self.derive(&Tensor::ones_like(self.value()))
    }

    /// `label` on its own line, then the rendered value.
    fn render(&self, label: &str) -> String {
        format!("{label}\n{}", self.value())
    }

    /// Write `render(label)` to stdout.
    fn print(&self, label: &str) {
        print!("{}", self.render(label));
    }
}

// ============================================================================
// Expr
// ============================================================================

/// A handle to an arbitrary node, usually the result of an operation.
#[derive(Clone)]
pub struct Expr<T: Element = f32> {
    node: NodeRef<T>,
}

impl<T: Element> Expr<T> {
    pub fn from_node(node: NodeRef<T>) -> Self {
        Expr { node }
    }

    pub fn into_node(self) -> NodeRef<T> {
        self.node
    }
}

impl<T: Element> NodeOps<T> for Expr<T> {
    fn node(&self) -> &NodeRef<T> {
        &self.node
    }
}

impl<T: Element> fmt::Debug for Expr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.node.fmt(f)
    }
}

// ============================================================================
// Constant
// ============================================================================

/// A handle to a Constant leaf. Gradients never flow into it.
#[derive(Clone)]
pub struct Constant<T: Element = f32> {
    node: NodeRef<T>,
}

impl<T: Element> Constant<T> {
    pub fn new(value: Tensor<T>) -> Self {
        Constant {
            node: Node::constant(value),
        }
    }

    pub fn scalar(value: T) -> Self {
        Self::new(Tensor::scalar(value))
    }

    pub fn from_vec(values: Vec<T>) -> Self {
        Self::new(Tensor::from_vec(values))
    }

    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, TensorError> {
        Ok(Self::new(Tensor::from_rows(rows)?))
    }

    /// Snapshot the current value of any operand, cutting it off the graph.
    pub fn detach(source: impl Operand<T>) -> Self {
        Self::new(source.into_node().value().clone())
    }

    /// Wrap this constant in a Dependent leaf. The result accumulates a
    /// gradient of its own, which then stops here.
    pub fn to_variable(&self) -> Variable<T> {
        Variable::wrap(self)
    }
}

impl<T: Element> NodeOps<T> for Constant<T> {
    fn node(&self) -> &NodeRef<T> {
        &self.node
    }
}

impl<T: Element> fmt::Debug for Constant<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.node.fmt(f)
    }
}

// ============================================================================
// Variable
// ============================================================================

/// A handle to a node with a gradient accumulator.
///
/// Built from a tensor it is an Independent leaf; built from an expression it
/// is a Dependent leaf that forwards gradients into the expression.
#[derive(Clone)]
pub struct Variable<T: Element = f32> {
    node: NodeRef<T>,
}

impl<T: Element> Variable<T> {
    pub fn new(value: Tensor<T>) -> Self {
        Variable {
            node: Node::independent(value),
        }
    }

    pub fn scalar(value: T) -> Self {
        Self::new(Tensor::scalar(value))
    }

    pub fn from_vec(values: Vec<T>) -> Self {
        Self::new(Tensor::from_vec(values))
    }

    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, TensorError> {
        Ok(Self::new(Tensor::from_rows(rows)?))
    }

    /// A zero-filled Independent leaf of the given shape.
    pub fn zeros(shape: &TensorShape) -> Result<Self, TensorError> {
        Ok(Self::new(Tensor::with_shape(shape)?))
    }

    /// Wrap an expression in a Dependent leaf.
    pub fn wrap(expr: impl Operand<T>) -> Self {
        Variable {
            node: Node::dependent(expr.into_node()),
        }
    }

    /// Copy of the accumulated gradient.
    pub fn grad(&self) -> Tensor<T> {
        self.node
            .grad()
            .map(|grad| grad.clone())
            .unwrap_or_else(|| Tensor::zeros_like(self.node.value()))
    }

    pub fn zero_grad(&self) {
        self.node.zero_grad();
    }

    /// Rebind this handle to a fresh Independent leaf holding `value`.
    ///
    /// Other handles to the old node, and graphs built over it, are not
    /// affected. The new leaf starts with a zero gradient.
    pub fn set_value(&mut self, value: Tensor<T>) {
        self.node = Node::independent(value);
    }

    /// Whether this handle points at an Independent leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self.node.kind(), NodeKind::Independent { .. })
    }

    fn rebind(&mut self, built: Expr<T>) {
        self.node = Node::dependent(built.into_node());
    }
}

impl<T: Element> NodeOps<T> for Variable<T> {
    fn node(&self) -> &NodeRef<T> {
        &self.node
    }
}

impl<T: Element> fmt::Debug for Variable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.node.fmt(f)
    }
}

impl<T: Element> From<Tensor<T>> for Variable<T> {
    fn from(value: Tensor<T>) -> Self {
        Variable::new(value)
    }
}

impl<T: Element> From<Expr<T>> for Variable<T> {
    fn from(expr: Expr<T>) -> Self {
        Variable::wrap(expr)
    }
}

impl<T: Element, R: Operand<T>> AddAssign<R> for Variable<T> {
    /// Rebind to a Dependent leaf over `old + rhs`. Panics on a shape mismatch.
    fn add_assign(&mut self, rhs: R) {
        let built = ops::try_add(&self.node, rhs).unwrap_or_else(|err| panic!("{err}"));
        self.rebind(built);
    }
}

impl<T: Element, R: Operand<T>> SubAssign<R> for Variable<T> {
    /// Rebind to a Dependent leaf over `old - rhs`. Panics on a shape mismatch.
    fn sub_assign(&mut self, rhs: R) {
        let built = ops::try_sub(&self.node, rhs).unwrap_or_else(|err| panic!("{err}"));
        self.rebind(built);
    }
}

// ============================================================================
// Param
// ============================================================================

/// A layer weight or bias: trainable, or frozen as a constant.
#[derive(Debug, Clone)]
pub enum Param<T: Element = f32> {
    Trainable(Variable<T>),
    Frozen(Constant<T>),
}

impl<T: Element> Param<T> {
    pub fn is_trainable(&self) -> bool {
        matches!(self, Param::Trainable(_))
    }

    pub fn as_variable(&self) -> Option<&Variable<T>> {
        match self {
            Param::Trainable(v) => Some(v),
            Param::Frozen(_) => None,
        }
    }

    pub fn as_variable_mut(&mut self) -> Option<&mut Variable<T>> {
        match self {
            Param::Trainable(v) => Some(v),
            Param::Frozen(_) => None,
        }
    }

    /// Stop training this parameter, keeping its current value.
    pub fn freeze(&mut self) {
        if let Param::Trainable(v) = self {
            *self = Param::Frozen(Constant::detach(&*v));
        }
    }
}

impl<T: Element> NodeOps<T> for Param<T> {
    fn node(&self) -> &NodeRef<T> {
        match self {
            Param::Trainable(v) => v.node(),
            Param::Frozen(c) => c.node(),
        }
    }
}

impl<T: Element> From<Variable<T>> for Param<T> {
    fn from(v: Variable<T>) -> Self {
        Param::Trainable(v)
    }
}

impl<T: Element> From<Constant<T>> for Param<T> {
    fn from(c: Constant<T>) -> Self {
        Param::Frozen(c)
    }
}

// ============================================================================
// Operand impls
// ============================================================================

impl<T: Element> Operand<T> for NodeRef<T> {
    fn into_node(self) -> NodeRef<T> {
        self
    }
}

impl<T: Element> Operand<T> for &NodeRef<T> {
    fn into_node(self) -> NodeRef<T> {
        Rc::clone(self)
    }
}

macro_rules! impl_handle_operand {
    ($($Handle:ident),*) => {
        $(
            impl<T: Element> Operand<T> for $Handle<T> {
                fn into_node(self) -> NodeRef<T> {
                    Rc::clone(self.node())
                }
            }

            impl<T: Element> Operand<T> for &$Handle<T> {
                fn into_node(self) -> NodeRef<T> {
                    Rc::clone(self.node())
                }
            }
        )*
    };
}

impl_handle_operand!(Expr, Constant, Variable, Param);

impl<T: Element> Operand<T> for Tensor<T> {
    fn into_node(self) -> NodeRef<T> {
        Node::constant(self)
    }
}

impl<T: Element> Operand<T> for &Tensor<T> {
    fn into_node(self) -> NodeRef<T> {
        Node::constant(self.clone())
    }
}

impl Operand<f32> for f32 {
    fn into_node(self) -> NodeRef<f32> {
        Node::constant(Tensor::scalar(self))
    }
}

impl Operand<f64> for f64 {
    fn into_node(self) -> NodeRef<f64> {
        Node::constant(Tensor::scalar(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Variable Tests
    // ========================================================================

    #[test]
    fn test_variable_is_independent_leaf() {
        let x = Variable::scalar(2.0_f32);
        assert!(x.is_leaf());
        assert!(x.requires_grad());
        assert_eq!(x.grad().item(), 0.0);
    }

    #[test]
    fn test_add_assign_rebinds_to_dependent() {
        let x = Variable::scalar(2.0_f32);
        let mut y = x.clone();
        y += 3.0;
        assert!(!y.is_leaf());
        assert_eq!(y.value().item(), 5.0);
        assert_eq!(x.value().item(), 2.0);

        y.backward().unwrap();
        assert_eq!(y.grad().item(), 1.0);
        assert_eq!(x.grad().item(), 1.0);
    }

    #[test]
    fn test_sub_assign_with_variable() {
        let a = Variable::scalar(5.0_f32);
        let b = Variable::scalar(2.0_f32);
        let mut c = a.clone();
        c -= &b;
        assert_eq!(c.value().item(), 3.0);
        c.backward().unwrap();
        assert_eq!(a.grad().item(), 1.0);
        assert_eq!(b.grad().item(), -1.0);
    }

    #[test]
    fn test_set_value_starts_fresh_leaf() {
        let mut x = Variable::scalar(1.0_f32);
        let old = x.clone();
        x.expr().backward().unwrap();
        x.set_value(Tensor::scalar(4.0));
        assert_eq!(x.value().item(), 4.0);
        assert_eq!(x.grad().item(), 0.0);
        assert_eq!(old.grad().item(), 1.0);
    }

    #[test]
    fn test_zeros_from_shape() {
        let v = Variable::<f32>::zeros(&TensorShape::from([2, 3])).unwrap();
        assert_eq!(v.value().dims(), (2, 3));
    }

    // ========================================================================
    // Constant / Param Tests
    // ========================================================================

    #[test]
    fn test_detach_cuts_gradient() {
        let x = Variable::scalar(3.0_f32);
        let doubled = ops::try_add(&x, &x).unwrap();
        let c = Constant::detach(&doubled);
        assert_eq!(c.value().item(), 6.0);
        assert!(!c.requires_grad());
    }

    #[test]
    fn test_constant_to_variable_accumulates_locally() {
        let c = Constant::scalar(3.0_f32);
        let v = c.to_variable();
        v.backward().unwrap();
        assert_eq!(v.grad().item(), 1.0);
    }

    #[test]
    fn test_param_freeze_keeps_value() {
        let mut p = Param::from(Variable::scalar(1.5_f32));
        assert!(p.is_trainable());
        p.freeze();
        assert!(!p.is_trainable());
        assert!(!p.requires_grad());
        assert_eq!(p.value().item(), 1.5);
    }

    // ========================================================================
    // Seed Tests
    // ========================================================================

    #[test]
    fn test_scalar_seed_is_replicated() {
        let x = Variable::from_vec(vec![1.0_f32, 2.0]);
        x.derive(&Tensor::scalar(2.0)).unwrap();
        assert_eq!(x.grad().as_slice(), &[2.0, 2.0]);
    }

    #[test]
    fn test_mismatched_seed_is_rejected() {
        let x = Variable::from_vec(vec![1.0_f32, 2.0]);
        assert!(x.derive(&Tensor::zeros(3, 1)).is_err());
    }

    // ========================================================================
    // Rendering Tests
    // ========================================================================

    #[test]
    fn test_render_puts_label_before_value() {
        let x = Variable::from_vec(vec![1.0_f32, 2.0]);
        let rendered = x.render("weights:");
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("weights:"));
        assert_eq!(lines.next().map(str::trim), Some("1.0000"));
        assert_eq!(lines.next().map(str::trim), Some("2.0000"));
        assert_eq!(lines.next(), None);
    }
}
