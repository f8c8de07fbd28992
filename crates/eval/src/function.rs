//! Function model: signatures, first-order and higher-order functions, and
//! the registry keyed by identifier URI.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use thiserror::Error;

use aegis_core::{EvalResult, ValueType};

use crate::context::EvaluationContext;
use crate::expr::{Expression, Value};

/// URI prefix of the XACML 1.0 function namespace.
pub const FN_1_0: &str = "urn:oasis:names:tc:xacml:1.0:function:";
/// URI prefix of the XACML 2.0 function namespace.
pub const FN_2_0: &str = "urn:oasis:names:tc:xacml:2.0:function:";
/// URI prefix of the XACML 3.0 function namespace.
pub const FN_3_0: &str = "urn:oasis:names:tc:xacml:3.0:function:";

/// Errors raised while binding a function call at policy load time. All of
/// them are fatal: no call object is produced and PDP construction fails.
#[derive(Debug, Clone, Error)]
pub enum FunctionError {
    /// Wrong number of arguments.
    #[error("function `{id}` expects {expected} arguments, got {found}")]
    Arity {
        /// Function id.
        id: String,
        /// Expected arity description.
        expected: String,
        /// Number of arguments supplied.
        found: usize,
    },
    /// An argument's static type does not equal the declared parameter type.
    #[error("function `{id}` argument {index} has type {found}, expected {expected}")]
    ArgumentType {
        /// Function id.
        id: String,
        /// Zero-based argument index.
        index: usize,
        /// Declared parameter type.
        expected: ValueType,
        /// Actual argument type.
        found: ValueType,
    },
    /// A function id was registered twice.
    #[error("function `{id}` is already registered")]
    Duplicate {
        /// Function id.
        id: String,
    },
    /// A higher-order apply received something other than a first-order
    /// function reference as its first argument.
    #[error("higher-order function `{id}` requires a first-order function reference first")]
    MissingSubFunction {
        /// Function id.
        id: String,
    },
    /// The sub-function of a boolean higher-order function must return
    /// boolean.
    #[error("higher-order function `{id}` requires a boolean sub-function, got {found}")]
    SubFunctionNotBoolean {
        /// Function id.
        id: String,
        /// Actual sub-function return type.
        found: ValueType,
    },
    /// Structural violation specific to one higher-order shape.
    #[error("higher-order function `{id}`: {reason}")]
    InvalidHigherOrderCall {
        /// Function id.
        id: String,
        /// What was violated.
        reason: String,
    },
}

/// Declared parameter types of a first-order function: a fixed prefix plus
/// an optional homogeneous variadic tail.
#[derive(Debug, Clone)]
pub struct Signature {
    fixed: Vec<ValueType>,
    variadic: Option<ValueType>,
}

impl Signature {
    /// A fixed-arity signature.
    #[must_use]
    pub fn fixed(params: impl Into<Vec<ValueType>>) -> Self {
        Self { fixed: params.into(), variadic: None }
    }

    /// A variadic signature: the fixed prefix followed by zero or more
    /// arguments of `rest`.
    #[must_use]
    pub fn variadic(fixed: impl Into<Vec<ValueType>>, rest: ValueType) -> Self {
        Self { fixed: fixed.into(), variadic: Some(rest) }
    }

    /// The declared type of parameter `index`, extending the variadic tail
    /// indefinitely.
    #[must_use]
    pub fn param_at(&self, index: usize) -> Option<ValueType> {
        self.fixed.get(index).copied().or(self.variadic)
    }

    /// Number of mandatory parameters.
    #[must_use]
    pub fn min_arity(&self) -> usize {
        self.fixed.len()
    }

    /// True when the signature accepts a variadic tail.
    #[must_use]
    pub const fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    fn arity_description(&self) -> String {
        if self.variadic.is_some() {
            format!("at least {}", self.fixed.len())
        } else {
            self.fixed.len().to_string()
        }
    }

    /// Strict type matching of argument types against the signature.
    pub fn check(&self, id: &str, args: &[ValueType]) -> Result<(), FunctionError> {
        let arity_ok = if self.variadic.is_some() {
            args.len() >= self.fixed.len()
        } else {
            args.len() == self.fixed.len()
        };
        if !arity_ok {
            return Err(FunctionError::Arity {
                id: id.to_owned(),
                expected: self.arity_description(),
                found: args.len(),
            });
        }
        for (index, found) in args.iter().enumerate() {
            let expected = self
                .param_at(index)
                .unwrap_or_else(|| unreachable!("arity checked above"));
            if *found != expected {
                return Err(FunctionError::ArgumentType {
                    id: id.to_owned(),
                    index,
                    expected,
                    found: *found,
                });
            }
        }
        Ok(())
    }
}

type EagerKernel =
    Arc<dyn Fn(&[Value], &EvaluationContext<'_>) -> EvalResult<Value> + Send + Sync>;
type LazyKernel =
    Arc<dyn Fn(&[Expression], &EvaluationContext<'_>) -> EvalResult<Value> + Send + Sync>;

enum Kernel {
    /// Arguments are evaluated first; the first Indeterminate propagates.
    Eager(EagerKernel),
    /// The kernel drives argument evaluation itself (boolean and/or/n-of,
    /// which skip arguments once the outcome is fixed).
    Lazy(LazyKernel),
}

/// A first-order function: pure kernel plus declared parameter and return
/// types. Immutable after construction and shared behind `Arc`.
pub struct FirstOrderFn {
    id: String,
    signature: Signature,
    return_type: ValueType,
    foldable: bool,
    kernel: Kernel,
}

impl fmt::Debug for FirstOrderFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirstOrderFn")
            .field("id", &self.id)
            .field("return_type", &self.return_type)
            .finish_non_exhaustive()
    }
}

impl FirstOrderFn {
    /// A function whose kernel consumes pre-evaluated argument values.
    pub fn eager<F>(
        id: impl Into<String>,
        signature: Signature,
        return_type: ValueType,
        kernel: F,
    ) -> Self
    where
        F: Fn(&[Value], &EvaluationContext<'_>) -> EvalResult<Value> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            signature,
            return_type,
            foldable: true,
            kernel: Kernel::Eager(Arc::new(kernel)),
        }
    }

    /// A function whose kernel evaluates its argument expressions lazily.
    pub fn lazy<F>(
        id: impl Into<String>,
        signature: Signature,
        return_type: ValueType,
        kernel: F,
    ) -> Self
    where
        F: Fn(&[Expression], &EvaluationContext<'_>) -> EvalResult<Value> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            signature,
            return_type,
            foldable: true,
            kernel: Kernel::Lazy(Arc::new(kernel)),
        }
    }

    /// Marks the function as non-foldable: applications are never replaced
    /// by constants at load time, even when static evaluation would
    /// succeed. Every standard function is pure and stays foldable; this
    /// exists for impure extensions.
    #[must_use]
    pub fn non_foldable(mut self) -> Self {
        self.foldable = false;
        self
    }

    /// The function identifier URI.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The declared signature.
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The declared return type.
    #[must_use]
    pub const fn return_type(&self) -> ValueType {
        self.return_type
    }

    /// Whether applications of this function may be constant-folded.
    #[must_use]
    pub const fn is_foldable(&self) -> bool {
        self.foldable
    }

    /// Invokes the function over bound argument expressions.
    pub fn invoke(
        &self,
        args: &[Expression],
        ctx: &EvaluationContext<'_>,
    ) -> EvalResult<Value> {
        match &self.kernel {
            Kernel::Eager(kernel) => {
                let values =
                    args.iter().map(|a| a.evaluate(ctx)).collect::<EvalResult<Vec<_>>>()?;
                kernel(&values, ctx)
            }
            Kernel::Lazy(kernel) => kernel(args, ctx),
        }
    }

    /// Invokes the function over already-evaluated values; used by the
    /// higher-order machinery, which passes sub-function arguments by
    /// value.
    pub fn invoke_values(
        &self,
        values: &[Value],
        ctx: &EvaluationContext<'_>,
    ) -> EvalResult<Value> {
        match &self.kernel {
            Kernel::Eager(kernel) => kernel(values, ctx),
            Kernel::Lazy(kernel) => {
                let exprs: Vec<Expression> =
                    values.iter().cloned().map(Expression::constant).collect();
                kernel(&exprs, ctx)
            }
        }
    }
}

/// The seven higher-order bag function shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HigherOrderKind {
    /// True if the sub-function holds for some element of the one bag.
    AnyOf,
    /// True if the sub-function holds for every element of the one bag.
    AllOf,
    /// True if the sub-function holds for some tuple of the Cartesian
    /// product over all arguments.
    AnyOfAny,
    /// For every element of the first bag, some element of the second
    /// satisfies the sub-function.
    AllOfAny,
    /// For every element of the second bag, some element of the first
    /// satisfies the sub-function.
    AnyOfAll,
    /// The sub-function holds for every pair drawn from the two bags.
    AllOfAll,
    /// Applies the sub-function to each element of the one bag, collecting
    /// results into a bag.
    Map,
}

/// A higher-order bag function: consumes a first-order function reference
/// plus a mix of bag and primitive arguments.
#[derive(Debug)]
pub struct HigherOrderFn {
    id: String,
    kind: HigherOrderKind,
}

impl HigherOrderFn {
    /// Declares a higher-order function under the given id.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: HigherOrderKind) -> Self {
        Self { id: id.into(), kind }
    }

    /// The function identifier URI.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The shape of this function.
    #[must_use]
    pub const fn kind(&self) -> HigherOrderKind {
        self.kind
    }
}

/// A registered function: first-order or higher-order.
#[derive(Debug, Clone)]
pub enum Function {
    /// First-order function.
    FirstOrder(Arc<FirstOrderFn>),
    /// Higher-order bag function.
    HigherOrder(Arc<HigherOrderFn>),
}

impl Function {
    /// The function identifier URI.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::FirstOrder(f) => f.id(),
            Self::HigherOrder(f) => f.id(),
        }
    }
}

/// Functions keyed by identifier URI.
///
/// The standard library is built once behind [`FunctionRegistry::standard`];
/// deployments with custom functions start from
/// [`FunctionRegistry::with_standard`] and register extensions before
/// handing the registry to the policy compiler.
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    map: HashMap<String, Function>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry").field("registered", &self.map.len()).finish()
    }
}

impl FunctionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A mutable copy of the standard library, ready for extensions.
    #[must_use]
    pub fn with_standard() -> Self {
        Self::standard().clone()
    }

    /// The shared standard function library.
    #[must_use]
    pub fn standard() -> &'static Self {
        static STANDARD: Lazy<FunctionRegistry> = Lazy::new(|| {
            let mut registry = FunctionRegistry::empty();
            crate::stdlib::register_standard(&mut registry)
                .expect("standard function table is internally consistent");
            registry
        });
        &STANDARD
    }

    /// Registers a function.
    ///
    /// # Errors
    ///
    /// Returns [`FunctionError::Duplicate`] when the id is already taken.
    pub fn register(&mut self, function: Function) -> Result<(), FunctionError> {
        let id = function.id().to_owned();
        if self.map.contains_key(&id) {
            return Err(FunctionError::Duplicate { id });
        }
        self.map.insert(id, function);
        Ok(())
    }

    /// Registers a first-order function.
    pub fn register_first_order(&mut self, function: FirstOrderFn) -> Result<(), FunctionError> {
        self.register(Function::FirstOrder(Arc::new(function)))
    }

    /// Registers a higher-order function.
    pub fn register_higher_order(&mut self, function: HigherOrderFn) -> Result<(), FunctionError> {
        self.register(Function::HigherOrder(Arc::new(function)))
    }

    /// Looks up a function by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Function> {
        self.map.get(id)
    }

    /// Looks up a first-order function by id.
    #[must_use]
    pub fn get_first_order(&self, id: &str) -> Option<&Arc<FirstOrderFn>> {
        match self.map.get(id) {
            Some(Function::FirstOrder(f)) => Some(f),
            _ => None,
        }
    }

    /// Number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when no function is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates all registered ids.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::Datatype;

    fn prim(dt: Datatype) -> ValueType {
        ValueType::Primitive(dt)
    }

    #[test]
    fn fixed_signature_checks_arity_and_types() {
        let sig = Signature::fixed(vec![prim(Datatype::String), prim(Datatype::String)]);
        assert!(sig.check("f", &[prim(Datatype::String), prim(Datatype::String)]).is_ok());
        assert!(matches!(
            sig.check("f", &[prim(Datatype::String)]),
            Err(FunctionError::Arity { .. })
        ));
        assert!(matches!(
            sig.check("f", &[prim(Datatype::String), prim(Datatype::Integer)]),
            Err(FunctionError::ArgumentType { index: 1, .. })
        ));
    }

    #[test]
    fn variadic_signature_extends_tail() {
        let sig = Signature::variadic(vec![prim(Datatype::Integer)], prim(Datatype::Boolean));
        assert!(sig.check("n-of", &[prim(Datatype::Integer)]).is_ok());
        assert!(sig
            .check("n-of", &[prim(Datatype::Integer), prim(Datatype::Boolean), prim(Datatype::Boolean)])
            .is_ok());
        assert!(sig.check("n-of", &[]).is_err());
    }

    #[test]
    fn duplicate_registration_errors() {
        let mut reg = FunctionRegistry::empty();
        let f = || {
            FirstOrderFn::eager(
                "test:identity",
                Signature::fixed(vec![prim(Datatype::String)]),
                prim(Datatype::String),
                |args, _| Ok(args[0].clone()),
            )
        };
        reg.register_first_order(f()).unwrap();
        assert!(matches!(
            reg.register_first_order(f()),
            Err(FunctionError::Duplicate { .. })
        ));
    }

    #[test]
    fn standard_registry_is_populated() {
        let reg = FunctionRegistry::standard();
        assert!(reg.get(&format!("{FN_1_0}string-equal")).is_some());
        assert!(reg.get(&format!("{FN_3_0}any-of")).is_some());
        assert!(reg.len() > 200);
    }
}
