//! Reverse-mode automatic differentiation over [`Tensor`](crate::tensor::Tensor) values.
//!
//! Building an expression computes its value immediately and records a graph
//! of shared nodes. Calling [`NodeOps::derive`] (or [`NodeOps::backward`]) on
//! any node walks that graph once per path and adds each contribution into the
//! accumulators of the Independent and Dependent leaves it reaches.
//!
//! ```
//! use stratos::autodiff::{NodeOps, Variable};
//!
//! let x = Variable::scalar(2.0_f32);
//! let y = &x * &x + 3.0 * &x;
//! y.backward().unwrap();
//! assert_eq!(y.value().item(), 10.0);
//! assert_eq!(x.grad().item(), 7.0);
//! ```

mod handle;
mod node;
pub mod ops;
mod overload;

pub use handle::{Constant, Expr, NodeOps, Operand, Param, Variable};
pub use node::{Node, NodeKind, NodeRef};
pub use ops::Op;
