//! The tagged expression tree and its evaluation.

use std::sync::Arc;

use aegis_core::{
    AttributeFqn, AttributeValue, Bag, Datatype, EvalResult, IndeterminateError, ValueType,
};

use crate::context::EvaluationContext;
use crate::function::{FirstOrderFn, Function, FunctionError};
use crate::stdlib::higher_order::HigherOrderCall;

/// The result of evaluating an expression: a primitive value or a bag.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A single primitive value.
    Primitive(AttributeValue),
    /// A bag of primitives.
    Bag(Bag),
}

impl Value {
    /// Wraps a boolean primitive.
    #[must_use]
    pub const fn boolean(b: bool) -> Self {
        Self::Primitive(AttributeValue::Boolean(b))
    }

    /// The static type of this value.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Primitive(v) => ValueType::Primitive(v.datatype()),
            Self::Bag(b) => ValueType::Bag(b.datatype()),
        }
    }

    /// The primitive inside, or a processing error for a bag.
    pub fn expect_primitive(&self) -> EvalResult<&AttributeValue> {
        match self {
            Self::Primitive(v) => Ok(v),
            Self::Bag(b) => Err(IndeterminateError::processing(format!(
                "expected a primitive value, got a bag of {}",
                b.datatype()
            ))),
        }
    }

    /// The bag inside, or a processing error for a primitive.
    pub fn expect_bag(&self) -> EvalResult<&Bag> {
        match self {
            Self::Bag(b) => Ok(b),
            Self::Primitive(v) => Err(IndeterminateError::processing(format!(
                "expected a bag, got a single {}",
                v.datatype()
            ))),
        }
    }

    /// The boolean inside, or a processing error.
    pub fn expect_boolean(&self) -> EvalResult<bool> {
        match self.expect_primitive()? {
            AttributeValue::Boolean(b) => Ok(*b),
            other => Err(IndeterminateError::processing(format!(
                "expected a boolean, got {}",
                other.datatype()
            ))),
        }
    }
}

impl From<AttributeValue> for Value {
    fn from(value: AttributeValue) -> Self {
        Self::Primitive(value)
    }
}

impl From<Bag> for Value {
    fn from(bag: Bag) -> Self {
        Self::Bag(bag)
    }
}

/// Fetches an attribute bag from the request by fully-qualified name.
#[derive(Debug, Clone)]
pub struct AttributeDesignator {
    fqn: AttributeFqn,
    datatype: Datatype,
    must_be_present: bool,
}

impl AttributeDesignator {
    /// Builds a designator.
    #[must_use]
    pub const fn new(fqn: AttributeFqn, datatype: Datatype, must_be_present: bool) -> Self {
        Self { fqn, datatype, must_be_present }
    }

    /// The designated attribute name.
    #[must_use]
    pub const fn fqn(&self) -> &AttributeFqn {
        &self.fqn
    }

    /// The expected element datatype.
    #[must_use]
    pub const fn datatype(&self) -> Datatype {
        self.datatype
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> EvalResult<Value> {
        let Some(request) = ctx.request() else {
            return Err(IndeterminateError::processing(
                "attribute designators cannot be evaluated without a request",
            ));
        };
        let bag = request
            .attribute_bag(&self.fqn)
            .filter(|bag| bag.datatype() == self.datatype)
            .cloned();
        match bag {
            Some(bag) => Ok(Value::Bag(bag)),
            None if self.must_be_present => {
                Err(IndeterminateError::missing_attribute(self.fqn.clone()))
            }
            None => Ok(Value::Bag(Bag::empty(self.datatype))),
        }
    }
}

/// Selects values out of a category's XML content via the pluggable XPath
/// evaluator.
#[derive(Debug, Clone)]
pub struct AttributeSelector {
    category: String,
    path: String,
    datatype: Datatype,
    must_be_present: bool,
}

impl AttributeSelector {
    /// Builds a selector.
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        path: impl Into<String>,
        datatype: Datatype,
        must_be_present: bool,
    ) -> Self {
        Self {
            category: category.into(),
            path: path.into(),
            datatype,
            must_be_present,
        }
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> EvalResult<Value> {
        let Some(request) = ctx.request() else {
            return Err(IndeterminateError::processing(
                "attribute selectors cannot be evaluated without a request",
            ));
        };
        if let Some(bag) = ctx.selector_result(&self.category, &self.path, self.datatype) {
            if bag.is_empty() && self.must_be_present {
                return Err(IndeterminateError::missing(format!(
                    "XPath `{}` selected nothing for category {}",
                    self.path, self.category
                )));
            }
            return Ok(Value::Bag(bag));
        }
        let Some(xpath) = ctx.xpath() else {
            return Err(IndeterminateError::syntax(
                "no XPath evaluator is installed for AttributeSelector",
            ));
        };
        let Some(content) = request.content(&self.category) else {
            if self.must_be_present {
                return Err(IndeterminateError::missing(format!(
                    "no content for category {}",
                    self.category
                )));
            }
            return Ok(Value::Bag(Bag::empty(self.datatype)));
        };
        let nodes = xpath
            .select(content, &self.path)
            .map_err(|e| IndeterminateError::syntax(format!("XPath `{}`: {e}", self.path)))?;
        let mut values = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let value = AttributeValue::parse_lexical(self.datatype, node)
                .map_err(|e| IndeterminateError::syntax(e.to_string()))?;
            values.push(value);
        }
        if values.is_empty() && self.must_be_present {
            return Err(IndeterminateError::missing(format!(
                "XPath `{}` selected nothing for category {}",
                self.path, self.category
            )));
        }
        let bag = Bag::new(self.datatype, values)
            .map_err(|e| IndeterminateError::processing(e.to_string()))?;
        ctx.cache_selector_result(&self.category, &self.path, bag.clone());
        Ok(Value::Bag(bag))
    }
}

/// A reference to a named variable, resolved at compile time to the
/// defining expression and memoized per request under a policy-qualified
/// key.
#[derive(Debug, Clone)]
pub struct VariableReference {
    key: String,
    id: String,
    expr: Arc<Expression>,
}

impl VariableReference {
    /// Builds a resolved variable reference. `key` must be unique across
    /// the whole policy tree (the compiler qualifies it with the defining
    /// policy id).
    #[must_use]
    pub fn new(key: impl Into<String>, id: impl Into<String>, expr: Arc<Expression>) -> Self {
        Self { key: key.into(), id: id.into(), expr }
    }

    /// The variable id as written in the policy.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    fn evaluate(&self, ctx: &EvaluationContext<'_>) -> EvalResult<Value> {
        if let Some(value) = ctx.variable(&self.key) {
            return Ok(value);
        }
        let value = self.expr.evaluate(ctx)?;
        ctx.set_variable(self.key.clone(), value.clone());
        Ok(value)
    }
}

/// A bound function call: the apply target after resolution and
/// type-checking.
#[derive(Debug)]
pub enum FunctionCall {
    /// First-order application.
    FirstOrder {
        /// The resolved function.
        func: Arc<FirstOrderFn>,
        /// Type-checked argument expressions.
        args: Vec<Expression>,
    },
    /// Higher-order bag function application.
    HigherOrder(HigherOrderCall),
}

impl FunctionCall {
    /// Binds `function` to its arguments, performing strict type checking.
    /// For higher-order functions the first argument must be a
    /// [`Expression::FunctionReference`].
    pub fn bind(function: &Function, args: Vec<Expression>) -> Result<Self, FunctionError> {
        match function {
            Function::FirstOrder(func) => {
                let types: Vec<ValueType> = args.iter().map(Expression::return_type).collect();
                func.signature().check(func.id(), &types)?;
                Ok(Self::FirstOrder { func: Arc::clone(func), args })
            }
            Function::HigherOrder(func) => {
                let mut args = args.into_iter();
                let sub = match args.next() {
                    Some(Expression::FunctionReference(sub)) => sub,
                    _ => {
                        return Err(FunctionError::MissingSubFunction {
                            id: func.id().to_owned(),
                        })
                    }
                };
                let call = HigherOrderCall::bind(Arc::clone(func), sub, args.collect())?;
                Ok(Self::HigherOrder(call))
            }
        }
    }

    /// The id of the bound function.
    #[must_use]
    pub fn function_id(&self) -> &str {
        match self {
            Self::FirstOrder { func, .. } => func.id(),
            Self::HigherOrder(call) => call.function_id(),
        }
    }

    /// The static return type of the call.
    #[must_use]
    pub fn return_type(&self) -> ValueType {
        match self {
            Self::FirstOrder { func, .. } => func.return_type(),
            Self::HigherOrder(call) => call.return_type(),
        }
    }

    /// Evaluates the call.
    pub fn invoke(&self, ctx: &EvaluationContext<'_>) -> EvalResult<Value> {
        match self {
            Self::FirstOrder { func, args } => func.invoke(args, ctx),
            Self::HigherOrder(call) => call.invoke(ctx),
        }
    }

    fn is_foldable(&self) -> bool {
        match self {
            Self::FirstOrder { func, .. } => func.is_foldable(),
            Self::HigherOrder(call) => call.sub_function().is_foldable(),
        }
    }
}

/// A tagged expression. Evaluates to a [`Value`] or raises an
/// [`IndeterminateError`].
#[derive(Debug)]
pub enum Expression {
    /// A literal value known at load time.
    Constant(Value),
    /// A named variable.
    VariableReference(VariableReference),
    /// An attribute lookup against the request.
    AttributeDesignator(AttributeDesignator),
    /// An XPath selection against category content.
    AttributeSelector(AttributeSelector),
    /// A bound function application.
    Apply(FunctionCall),
    /// A first-order function reference; valid only as the first argument
    /// of a higher-order apply.
    FunctionReference(Arc<FirstOrderFn>),
}

impl Expression {
    /// Wraps a value as a constant expression.
    #[must_use]
    pub const fn constant(value: Value) -> Self {
        Self::Constant(value)
    }

    /// Binds a function application and constant-folds it when possible:
    /// if the bound call evaluates successfully without a request (all
    /// arguments constant, function foldable), the application collapses
    /// to the resulting constant.
    pub fn apply(function: &Function, args: Vec<Expression>) -> Result<Self, FunctionError> {
        let call = FunctionCall::bind(function, args)?;
        if call.is_foldable() {
            let ctx = EvaluationContext::constant_folding();
            if let Ok(value) = call.invoke(&ctx) {
                tracing::trace!(function = call.function_id(), "constant-folded application");
                return Ok(Self::Constant(value));
            }
        }
        Ok(Self::Apply(call))
    }

    /// Evaluates the expression under the given context.
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> EvalResult<Value> {
        match self {
            Self::Constant(value) => Ok(value.clone()),
            Self::VariableReference(var) => var.evaluate(ctx),
            Self::AttributeDesignator(d) => d.evaluate(ctx),
            Self::AttributeSelector(s) => s.evaluate(ctx),
            Self::Apply(call) => call.invoke(ctx),
            Self::FunctionReference(f) => Err(IndeterminateError::processing(format!(
                "function reference `{}` used outside a higher-order apply",
                f.id()
            ))),
        }
    }

    /// The static type of the expression's result.
    #[must_use]
    pub fn return_type(&self) -> ValueType {
        match self {
            Self::Constant(value) => value.value_type(),
            Self::VariableReference(var) => var.expr.return_type(),
            Self::AttributeDesignator(d) => ValueType::Bag(d.datatype),
            Self::AttributeSelector(s) => ValueType::Bag(s.datatype),
            Self::Apply(call) => call.return_type(),
            Self::FunctionReference(_) => ValueType::Function,
        }
    }

    /// The value of a constant expression, `None` otherwise.
    #[must_use]
    pub const fn static_value(&self) -> Option<&Value> {
        match self {
            Self::Constant(value) => Some(value),
            _ => None,
        }
    }
}
