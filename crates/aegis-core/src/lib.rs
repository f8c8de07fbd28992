//! AEGIS core primitives and shared types.
//!
//! Typed attribute values, bags, fully-qualified attribute names, status
//! codes, decision results, and policy version machinery shared by every
//! crate in the workspace. Everything here is immutable once constructed
//! and safe to share across request-evaluation threads.

#![deny(unsafe_code)]

/// Version of the AEGIS core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod bag;
pub mod datatype;
pub mod decision;
pub mod fqn;
pub mod names;
pub mod status;
pub mod temporal;
pub mod value;
pub mod version;

pub use bag::Bag;
pub use datatype::{Datatype, ValueType};
pub use decision::{
    Decision, DecisionResult, Effect, ExtendedDecision, IndeterminateKind, PepAction,
    PepAttribute, PolicyIdentifier,
};
pub use fqn::AttributeFqn;
pub use status::{EvalResult, IndeterminateError, Status, StatusCode};
pub use value::AttributeValue;
pub use version::{PolicyVersion, PolicyVersionPatterns, VersionPattern};
