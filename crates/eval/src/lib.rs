//! Expression evaluation: the tagged expression tree, the per-request
//! evaluation context, the function registry, and the full standard
//! function library including the higher-order bag functions.

#![deny(unsafe_code)]

pub mod context;
pub mod expr;
pub mod function;
pub mod stdlib;

pub use context::{EvaluationContext, IndividualDecisionRequest, Limits, XPathEvaluator};
pub use expr::{
    AttributeDesignator, AttributeSelector, Expression, FunctionCall, Value, VariableReference,
};
pub use function::{
    FirstOrderFn, Function, FunctionError, FunctionRegistry, HigherOrderFn, HigherOrderKind,
    Signature,
};
