use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::trace_span;

use super::ops::Op;
use crate::error::TensorError;
use crate::tensor::{Element, Tensor};

/// Shared reference to a graph node. Handles, operations and the Dependent
/// leaves that wrap them all hold nodes through this.
pub type NodeRef<T = f32> = Rc<Node<T>>;

/// A vertex of the computation graph.
///
/// The forward value is computed once at construction and never changes.
/// Only the gradient accumulators of Independent and Dependent leaves are
/// mutated afterwards, through `RefCell`.
pub struct Node<T: Element = f32> {
    value: Tensor<T>,
    requires_grad: bool,
    kind: NodeKind<T>,
}

/// What a node is, and what it does with an incoming gradient.
pub enum NodeKind<T: Element> {
    /// A fixed value. Gradients sent here are discarded.
    Constant,
    /// A trainable value with its own accumulator. A leaf of the graph.
    Independent { grad: RefCell<Tensor<T>> },
    /// An expression wrapped as a variable. Accumulates like a leaf, then
    /// forwards the same gradient into the expression.
    Dependent { grad: RefCell<Tensor<T>>, expr: NodeRef<T> },
    /// The result of an operation on one or two operand nodes.
    Op(Op<T>),
}

impl<T: Element> Node<T> {
    pub fn constant(value: Tensor<T>) -> NodeRef<T> {
        Rc::new(Node {
            value,
            requires_grad: false,
            kind: NodeKind::Constant,
        })
    }

    /// Create a trainable leaf with a zeroed accumulator.
    pub fn independent(value: Tensor<T>) -> NodeRef<T> {
        let grad = RefCell::new(Tensor::zeros_like(&value));
        Rc::new(Node {
            value,
            requires_grad: true,
            kind: NodeKind::Independent { grad },
        })
    }

    /// Wrap an existing expression so it behaves like a variable.
    pub fn dependent(expr: NodeRef<T>) -> NodeRef<T> {
        let value = expr.value.clone();
        let grad = RefCell::new(Tensor::zeros_like(&value));
        Rc::new(Node {
            value,
            requires_grad: true,
            kind: NodeKind::Dependent { grad, expr },
        })
    }

    /// Record an operation whose forward value has already been computed.
    pub(crate) fn operation(op: Op<T>, value: Tensor<T>) -> NodeRef<T> {
        let requires_grad = op.operands().iter().any(|operand| operand.requires_grad);
        Rc::new(Node {
            value,
            requires_grad,
            kind: NodeKind::Op(op),
        })
    }

    pub fn value(&self) -> &Tensor<T> {
        &self.value
    }

    pub fn kind(&self) -> &NodeKind<T> {
        &self.kind
    }

    /// Whether a backward pass through this node can reach a variable.
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub fn name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Constant => "Constant",
            NodeKind::Independent { .. } => "Independent",
            NodeKind::Dependent { .. } => "Dependent",
            NodeKind::Op(op) => op.name(),
        }
    }

    /// The accumulated gradient, for leaves that keep one.
    pub fn grad(&self) -> Option<Ref<'_, Tensor<T>>> {
        match &self.kind {
            NodeKind::Independent { grad } | NodeKind::Dependent { grad, .. } => Some(grad.borrow()),
            NodeKind::Constant | NodeKind::Op(_) => None,
        }
    }

    /// Reset the accumulator to zeros. Does nothing for nodes without one.
    pub fn zero_grad(&self) {
        if let NodeKind::Independent { grad } | NodeKind::Dependent { grad, .. } = &self.kind {
            *grad.borrow_mut() = Tensor::zeros_like(&self.value);
        }
    }

    /// Push `grad`, the gradient of the output with respect to this node,
    /// down through the graph.
    ///
    /// Shared sub-expressions are visited once per path, so a leaf reached
    /// along several paths receives the sum of their contributions. The
    /// traversal recurses once per edge; depth is bounded by the call stack.
    /// Dropping the last handle to a long chain of nodes recurses once per
    /// node as well, so the same bound applies to releasing a graph.
    pub fn derive(&self, grad: &Tensor<T>) -> Result<(), TensorError> {
        match &self.kind {
            NodeKind::Constant => Ok(()),
            NodeKind::Independent { grad: acc } => acc.borrow_mut().try_add_assign(grad),
            NodeKind::Dependent { grad: acc, expr } => {
                acc.borrow_mut().try_add_assign(grad)?;
                expr.derive(grad)
            }
            NodeKind::Op(op) => {
                let _span = trace_span!("backward", op = op.name()).entered();
                op.backward(grad)
            }
        }
    }
}

impl<T: Element> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.name())
            .field("dims", &self.value.dims())
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Leaf Tests
    // ========================================================================

    #[test]
    fn test_independent_starts_with_zero_grad() {
        let node = Node::independent(Tensor::from_vec(vec![1.0_f32, 2.0]));
        assert!(node.requires_grad());
        assert_eq!(node.grad().unwrap().as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn test_constant_discards_gradient() {
        let node = Node::constant(Tensor::scalar(3.0_f32));
        assert!(!node.requires_grad());
        node.derive(&Tensor::scalar(1.0)).unwrap();
        assert!(node.grad().is_none());
    }

    #[test]
    fn test_independent_accumulates() {
        let node = Node::independent(Tensor::scalar(3.0_f32));
        node.derive(&Tensor::scalar(1.5)).unwrap();
        node.derive(&Tensor::scalar(2.0)).unwrap();
        assert_eq!(node.grad().unwrap().item(), 3.5);
    }

    #[test]
    fn test_scalar_leaf_sums_matrix_gradient() {
        let node = Node::independent(Tensor::scalar(0.0_f32));
        node.derive(&Tensor::ones(2, 3)).unwrap();
        assert_eq!(node.grad().unwrap().item(), 6.0);
    }

    #[test]
    fn test_zero_grad_resets_accumulator() {
        let node = Node::independent(Tensor::scalar(3.0_f32));
        node.derive(&Tensor::scalar(4.0)).unwrap();
        node.zero_grad();
        assert_eq!(node.grad().unwrap().item(), 0.0);
    }

    #[test]
    fn test_mismatched_gradient_is_an_error() {
        let node = Node::independent(Tensor::<f32>::zeros(2, 2));
        let err = node.derive(&Tensor::zeros(3, 3)).unwrap_err();
        assert!(matches!(err, TensorError::ShapeMismatch { .. }));
    }

    // ========================================================================
    // Dependent Tests
    // ========================================================================

    #[test]
    fn test_dependent_forwards_to_expression() {
        let leaf = Node::independent(Tensor::scalar(2.0_f32));
        let wrapped = Node::dependent(Rc::clone(&leaf));
        assert_eq!(wrapped.value().item(), 2.0);

        wrapped.derive(&Tensor::scalar(1.0)).unwrap();
        assert_eq!(wrapped.grad().unwrap().item(), 1.0);
        assert_eq!(leaf.grad().unwrap().item(), 1.0);
    }

    #[test]
    fn test_debug_names_kind() {
        let node = Node::constant(Tensor::<f32>::zeros(2, 3));
        let text = format!("{node:?}");
        assert!(text.contains("Constant"));
        assert!(text.contains("(2, 3)"));
    }
}
