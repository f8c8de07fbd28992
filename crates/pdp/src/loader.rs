//! Policy documents (the serde-typed tree equivalent of the XACML policy
//! schema) and the compiler that turns them into immutable evaluators.
//!
//! Everything here fails fatally: a document that resolves, type-checks,
//! and links is guaranteed not to raise load-class errors during
//! evaluation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use aegis_core::value::ValueParseError;
use aegis_core::version::VersionError;
use aegis_core::{
    AttributeFqn, AttributeValue, Datatype, Effect, PolicyVersion, PolicyVersionPatterns,
    ValueType,
};
use combining::{Combiner, CombiningAlgId, UnknownCombiningAlg};
use eval::{
    AttributeDesignator, AttributeSelector, Expression, FunctionError, FunctionRegistry, Value,
    VariableReference,
};

use crate::index::{DuplicatePolicy, PolicyMap};
use crate::pep::{AssignmentExpression, PepActionExpression};
use crate::policy::{PolicyChild, PolicyEvaluator, PolicySetEvaluator};
use crate::rule::RuleEvaluator;
use crate::target::{AllOf, AnyOf, Match, Target};

/// A fatal policy-load failure. No partially-working PDP is ever built.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A datatype name did not resolve.
    #[error("unknown datatype `{0}`")]
    UnknownDatatype(String),
    /// A function name did not resolve.
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    /// A function binding failed (arity or argument types).
    #[error(transparent)]
    Function(#[from] FunctionError),
    /// A combining-algorithm name did not resolve.
    #[error(transparent)]
    CombiningAlg(#[from] UnknownCombiningAlg),
    /// A literal did not parse under its declared datatype.
    #[error(transparent)]
    Value(#[from] ValueParseError),
    /// A version or version pattern did not parse.
    #[error(transparent)]
    Version(#[from] VersionError),
    /// Two policies share an id and version.
    #[error(transparent)]
    Duplicate(#[from] DuplicatePolicy),
    /// A variable reference has no definition in its policy.
    #[error("unknown variable `{id}` in policy `{policy}`")]
    UnknownVariable {
        /// Enclosing policy id.
        policy: String,
        /// The unresolved variable id.
        id: String,
    },
    /// A variable id is defined twice in one policy.
    #[error("variable `{id}` defined twice in policy `{policy}`")]
    DuplicateVariable {
        /// Enclosing policy id.
        policy: String,
        /// The duplicated variable id.
        id: String,
    },
    /// A rule condition is not boolean-typed.
    #[error("condition of rule `{rule}` must be boolean, found {found}")]
    NonBooleanCondition {
        /// The offending rule id.
        rule: String,
        /// The condition's actual type.
        found: ValueType,
    },
    /// A target match is structurally invalid.
    #[error("match on function `{id}`: {reason}")]
    InvalidMatch {
        /// Match function id.
        id: String,
        /// What was violated.
        reason: String,
    },
    /// The algorithm cannot combine rules (only-one-applicable).
    #[error("combining algorithm `{0:?}` cannot combine rules")]
    InvalidRuleCombiner(CombiningAlgId),
    /// A policy(-set) reference did not resolve.
    #[error("unresolved {kind} reference `{id}`")]
    UnresolvedReference {
        /// `"policy"` or `"policy set"`.
        kind: &'static str,
        /// The referenced id.
        id: String,
    },
    /// Policy-set references form a cycle.
    #[error("policy set reference cycle: {path}")]
    ReferenceCycle {
        /// The reference chain, ` -> ` separated.
        path: String,
    },
    /// A policy document could not be read.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// A policy document could not be parsed.
    #[error("document: {0}")]
    Document(#[from] serde_yaml::Error),
}

/// A typed literal: datatype (URI or short name) plus a JSON scalar.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueDef {
    /// Datatype name.
    #[serde(rename = "type")]
    pub datatype: String,
    /// The literal, as a string or a matching JSON scalar.
    pub value: serde_json::Value,
}

/// An attribute designator.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DesignatorDef {
    /// Category URI.
    pub category: String,
    /// Attribute id URI.
    pub id: String,
    /// Expected datatype.
    #[serde(rename = "type")]
    pub datatype: String,
    /// Optional issuer constraint.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Raise missing-attribute instead of returning an empty bag.
    #[serde(default)]
    pub must_be_present: bool,
}

/// An attribute selector.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SelectorDef {
    /// Category whose content is selected against.
    pub category: String,
    /// XPath expression.
    pub path: String,
    /// Datatype each selected node converts to.
    #[serde(rename = "type")]
    pub datatype: String,
    /// Raise missing-attribute instead of returning an empty bag.
    #[serde(default)]
    pub must_be_present: bool,
}

/// An expression node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub enum ExprDef {
    /// A typed literal.
    Value(ValueDef),
    /// An attribute designator.
    Designator(DesignatorDef),
    /// An attribute selector.
    Selector(SelectorDef),
    /// A reference to a policy variable.
    VarRef(String),
    /// A first-order function reference (higher-order argument).
    FunctionRef(String),
    /// A function application.
    Apply(ApplyDef),
}

/// A function application node.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyDef {
    /// Function name (URI or short name).
    pub function: String,
    /// Argument expressions.
    #[serde(default)]
    pub args: Vec<ExprDef>,
}

/// One attribute match inside a target.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MatchDef {
    /// Boolean match function of (literal, bag element).
    pub function: String,
    /// The literal compared against each element.
    pub value: ValueDef,
    /// Designator source (exactly one of designator/selector).
    #[serde(default)]
    pub designator: Option<DesignatorDef>,
    /// Selector source.
    #[serde(default)]
    pub selector: Option<SelectorDef>,
}

/// A conjunction of matches.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AllOfDef {
    /// The matches, all of which must hold.
    #[serde(rename = "match")]
    pub matches: Vec<MatchDef>,
}

/// A disjunction of [`AllOfDef`] groups.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AnyOfDef {
    /// The groups, one of which must hold.
    pub all_of: Vec<AllOfDef>,
}

/// A target.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TargetDef {
    /// The conjunction of AnyOf groups; empty matches everything.
    #[serde(default)]
    pub any_of: Vec<AnyOfDef>,
}

/// An attribute assignment inside an obligation or advice.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AssignmentDef {
    /// Assignment attribute id.
    pub attribute_id: String,
    /// Value expression.
    pub expr: ExprDef,
}

/// An obligation or advice expression.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PepActionDef {
    /// Obligation/advice id.
    pub id: String,
    /// The decision this action accompanies.
    pub fulfill_on: Effect,
    /// Attribute assignments.
    #[serde(default)]
    pub assignments: Vec<AssignmentDef>,
}

/// A variable definition scoped to its policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct VariableDef {
    /// Variable id.
    pub id: String,
    /// Defining expression.
    pub expr: ExprDef,
}

/// A rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RuleDef {
    /// Rule id.
    pub id: String,
    /// Permit or Deny.
    pub effect: Effect,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional target.
    #[serde(default)]
    pub target: Option<TargetDef>,
    /// Optional boolean condition.
    #[serde(default)]
    pub condition: Option<ExprDef>,
    /// Obligation expressions.
    #[serde(default)]
    pub obligations: Vec<PepActionDef>,
    /// Advice expressions.
    #[serde(default)]
    pub advice: Vec<PepActionDef>,
}

/// A policy: rules under one combining algorithm.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PolicyDef {
    /// Policy id.
    pub id: String,
    /// Policy version; defaults to 1.0.
    #[serde(default)]
    pub version: PolicyVersion,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Rule-combining algorithm name.
    pub combining_alg: String,
    /// Optional target.
    #[serde(default)]
    pub target: Option<TargetDef>,
    /// Variable definitions usable in this policy's expressions.
    #[serde(default)]
    pub variables: Vec<VariableDef>,
    /// The rules, in declaration order.
    pub rules: Vec<RuleDef>,
    /// Obligation expressions.
    #[serde(default)]
    pub obligations: Vec<PepActionDef>,
    /// Advice expressions.
    #[serde(default)]
    pub advice: Vec<PepActionDef>,
}

/// A reference to a policy or policy set by id and version patterns.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicyRefDef {
    /// Referenced id.
    pub id: String,
    /// Version constraints.
    #[serde(flatten)]
    pub patterns: PolicyVersionPatterns,
}

/// A child of a policy set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub enum PolicyElementDef {
    /// An inline policy.
    Policy(PolicyDef),
    /// An inline policy set.
    PolicySet(PolicySetDef),
    /// A reference to a policy defined elsewhere in the document.
    PolicyRef(PolicyRefDef),
    /// A reference to a policy set defined elsewhere in the document.
    PolicySetRef(PolicyRefDef),
}

/// A policy set: policies, policy sets, and references under one
/// combining algorithm.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PolicySetDef {
    /// Policy-set id.
    pub id: String,
    /// Version; defaults to 1.0.
    #[serde(default)]
    pub version: PolicyVersion,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Policy-combining algorithm name.
    pub combining_alg: String,
    /// Optional target.
    #[serde(default)]
    pub target: Option<TargetDef>,
    /// The children, in declaration order.
    pub policies: Vec<PolicyElementDef>,
    /// Policies and policy sets that are not children but are available
    /// to references, typically several versions of the same id.
    #[serde(default)]
    pub library: Vec<PolicyElementDef>,
    /// Obligation expressions.
    #[serde(default)]
    pub obligations: Vec<PepActionDef>,
    /// Advice expressions.
    #[serde(default)]
    pub advice: Vec<PepActionDef>,
}

/// The root of a policy document: a policy set or a bare policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PolicyRootDef {
    /// A policy set (has `policies`).
    Set(PolicySetDef),
    /// A single policy (has `rules`).
    Policy(PolicyDef),
}

/// The compiled root of the policy tree.
pub enum RootEvaluator {
    /// A single policy.
    Policy(Arc<PolicyEvaluator>),
    /// A policy set.
    PolicySet(Arc<PolicySetEvaluator>),
}

/// Compiles a parsed document against a function registry.
pub fn compile(
    root: &PolicyRootDef,
    registry: &FunctionRegistry,
) -> Result<RootEvaluator, LoadError> {
    let mut compiler = Compiler::new(registry);
    compiler.collect_root(root)?;
    match root {
        PolicyRootDef::Policy(def) => Ok(RootEvaluator::Policy(compiler.compile_policy(def)?)),
        PolicyRootDef::Set(def) => Ok(RootEvaluator::PolicySet(compiler.compile_set(def)?)),
    }
}

type VarScope = HashMap<String, Arc<Expression>>;

struct Compiler<'a> {
    registry: &'a FunctionRegistry,
    policy_defs: PolicyMap<PolicyDef>,
    set_defs: PolicyMap<PolicySetDef>,
    compiled_policies: HashMap<(String, PolicyVersion), Arc<PolicyEvaluator>>,
    compiled_sets: HashMap<(String, PolicyVersion), Arc<PolicySetEvaluator>>,
    in_progress: Vec<String>,
}

impl<'a> Compiler<'a> {
    fn new(registry: &'a FunctionRegistry) -> Self {
        Self {
            registry,
            policy_defs: PolicyMap::new(),
            set_defs: PolicyMap::new(),
            compiled_policies: HashMap::new(),
            compiled_sets: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Registers every inline policy and policy set so references resolve
    /// against the whole document.
    fn collect_root(&mut self, root: &PolicyRootDef) -> Result<(), LoadError> {
        match root {
            PolicyRootDef::Policy(def) => {
                self.policy_defs.insert(def.id.clone(), def.version.clone(), def.clone())?;
            }
            PolicyRootDef::Set(def) => self.collect_set(def)?,
        }
        Ok(())
    }

    fn collect_set(&mut self, def: &PolicySetDef) -> Result<(), LoadError> {
        self.set_defs.insert(def.id.clone(), def.version.clone(), def.clone())?;
        for child in def.policies.iter().chain(&def.library) {
            match child {
                PolicyElementDef::Policy(p) => {
                    self.policy_defs.insert(p.id.clone(), p.version.clone(), p.clone())?;
                }
                PolicyElementDef::PolicySet(s) => self.collect_set(s)?,
                PolicyElementDef::PolicyRef(_) | PolicyElementDef::PolicySetRef(_) => {}
            }
        }
        Ok(())
    }

    fn compile_set(&mut self, def: &PolicySetDef) -> Result<Arc<PolicySetEvaluator>, LoadError> {
        let key = (def.id.clone(), def.version.clone());
        if let Some(compiled) = self.compiled_sets.get(&key) {
            return Ok(Arc::clone(compiled));
        }
        if self.in_progress.contains(&def.id) {
            let mut path = self.in_progress.clone();
            path.push(def.id.clone());
            return Err(LoadError::ReferenceCycle { path: path.join(" -> ") });
        }
        self.in_progress.push(def.id.clone());
        let result = self.compile_set_inner(def);
        self.in_progress.pop();
        let compiled = result?;
        self.compiled_sets.insert(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    fn compile_set_inner(
        &mut self,
        def: &PolicySetDef,
    ) -> Result<Arc<PolicySetEvaluator>, LoadError> {
        let alg = CombiningAlgId::resolve(&def.combining_alg)?;
        let scope = VarScope::new();
        let target = self.compile_target(def.target.as_ref(), &def.id, &scope)?;
        let pep = self.compile_pep(&def.obligations, &def.advice, &def.id, &scope)?;

        let mut children = Vec::with_capacity(def.policies.len());
        for child in &def.policies {
            let child = match child {
                PolicyElementDef::Policy(p) => PolicyChild::Policy(self.compile_policy(p)?),
                PolicyElementDef::PolicySet(s) => PolicyChild::PolicySet(self.compile_set(s)?),
                PolicyElementDef::PolicyRef(r) => {
                    let def = self
                        .policy_defs
                        .get(&r.id, Some(&r.patterns))
                        .map(|(_, d)| d.clone())
                        .ok_or_else(|| LoadError::UnresolvedReference {
                            kind: "policy",
                            id: r.id.clone(),
                        })?;
                    PolicyChild::Policy(self.compile_policy(&def)?)
                }
                PolicyElementDef::PolicySetRef(r) => {
                    let def = self
                        .set_defs
                        .get(&r.id, Some(&r.patterns))
                        .map(|(_, d)| d.clone())
                        .ok_or_else(|| LoadError::UnresolvedReference {
                            kind: "policy set",
                            id: r.id.clone(),
                        })?;
                    PolicyChild::PolicySet(self.compile_set(&def)?)
                }
            };
            children.push(Arc::new(child));
        }

        let combiner = Combiner::new(alg, children);
        Ok(Arc::new(PolicySetEvaluator::new(
            def.id.clone(),
            def.version.clone(),
            target,
            combiner,
            pep,
        )))
    }

    fn compile_policy(&mut self, def: &PolicyDef) -> Result<Arc<PolicyEvaluator>, LoadError> {
        let key = (def.id.clone(), def.version.clone());
        if let Some(compiled) = self.compiled_policies.get(&key) {
            return Ok(Arc::clone(compiled));
        }

        let alg = CombiningAlgId::resolve(&def.combining_alg)?;
        if alg == CombiningAlgId::OnlyOneApplicable {
            return Err(LoadError::InvalidRuleCombiner(alg));
        }

        let mut scope = VarScope::new();
        for var in &def.variables {
            if scope.contains_key(&var.id) {
                return Err(LoadError::DuplicateVariable {
                    policy: def.id.clone(),
                    id: var.id.clone(),
                });
            }
            let expr = self.compile_expr(&var.expr, def, &scope)?;
            scope.insert(var.id.clone(), Arc::new(expr));
        }

        let target = self.compile_target(def.target.as_ref(), &def.id, &scope)?;
        let pep = self.compile_pep(&def.obligations, &def.advice, &def.id, &scope)?;
        let mut rules = Vec::with_capacity(def.rules.len());
        for rule in &def.rules {
            rules.push(Arc::new(self.compile_rule(rule, def, &scope)?));
        }

        let combiner = Combiner::new(alg, rules);
        let compiled = Arc::new(PolicyEvaluator::new(
            def.id.clone(),
            def.version.clone(),
            target,
            combiner,
            pep,
        ));
        self.compiled_policies.insert(key, Arc::clone(&compiled));
        tracing::debug!(policy = %def.id, version = %def.version, "compiled policy");
        Ok(compiled)
    }

    fn compile_rule(
        &self,
        def: &RuleDef,
        policy: &PolicyDef,
        scope: &VarScope,
    ) -> Result<RuleEvaluator, LoadError> {
        let target = self.compile_target(def.target.as_ref(), &policy.id, scope)?;
        let condition = def
            .condition
            .as_ref()
            .map(|c| self.compile_expr(c, policy, scope))
            .transpose()?;
        if let Some(condition) = &condition {
            let found = condition.return_type();
            if found != ValueType::Primitive(Datatype::Boolean) {
                return Err(LoadError::NonBooleanCondition { rule: def.id.clone(), found });
            }
        }
        let pep = self.compile_pep(&def.obligations, &def.advice, &policy.id, scope)?;
        Ok(RuleEvaluator::new(def.id.clone(), def.effect, target, condition, pep))
    }

    fn compile_target(
        &self,
        def: Option<&TargetDef>,
        policy_id: &str,
        scope: &VarScope,
    ) -> Result<Option<Target>, LoadError> {
        let Some(def) = def else { return Ok(None) };
        let mut any_ofs = Vec::with_capacity(def.any_of.len());
        for any_of in &def.any_of {
            let mut all_ofs = Vec::with_capacity(any_of.all_of.len());
            for all_of in &any_of.all_of {
                let mut matches = Vec::with_capacity(all_of.matches.len());
                for m in &all_of.matches {
                    matches.push(self.compile_match(m, policy_id, scope)?);
                }
                all_ofs.push(AllOf::new(matches));
            }
            any_ofs.push(AnyOf::new(all_ofs));
        }
        Ok(Some(Target::new(any_ofs)))
    }

    fn compile_match(
        &self,
        def: &MatchDef,
        _policy_id: &str,
        _scope: &VarScope,
    ) -> Result<Match, LoadError> {
        let func = self.resolve_first_order(&def.function)?;
        let literal = self.parse_value(&def.value)?;

        let source = match (&def.designator, &def.selector) {
            (Some(d), None) => Expression::AttributeDesignator(self.compile_designator(d)?),
            (None, Some(s)) => Expression::AttributeSelector(self.compile_selector(s)?),
            _ => {
                return Err(LoadError::InvalidMatch {
                    id: def.function.clone(),
                    reason: "exactly one of designator/selector is required".into(),
                })
            }
        };
        let ValueType::Bag(element_type) = source.return_type() else {
            return Err(LoadError::InvalidMatch {
                id: def.function.clone(),
                reason: "match source must produce a bag".into(),
            });
        };

        if func.return_type() != ValueType::Primitive(Datatype::Boolean) {
            return Err(LoadError::InvalidMatch {
                id: def.function.clone(),
                reason: format!("match function must return boolean, not {}", func.return_type()),
            });
        }
        func.signature().check(
            func.id(),
            &[
                ValueType::Primitive(literal.datatype()),
                ValueType::Primitive(element_type),
            ],
        )?;

        Ok(Match::new(func, literal, source))
    }

    fn compile_pep(
        &self,
        obligations: &[PepActionDef],
        advice: &[PepActionDef],
        policy_id: &str,
        scope: &VarScope,
    ) -> Result<Vec<PepActionExpression>, LoadError> {
        let mut out = Vec::with_capacity(obligations.len() + advice.len());
        for (defs, obligatory) in [(obligations, true), (advice, false)] {
            for def in defs {
                let mut assignments = Vec::with_capacity(def.assignments.len());
                for a in &def.assignments {
                    let expr = self.compile_scoped_expr(&a.expr, policy_id, scope)?;
                    assignments.push(AssignmentExpression::new(a.attribute_id.clone(), expr));
                }
                out.push(PepActionExpression::new(
                    def.id.clone(),
                    obligatory,
                    def.fulfill_on,
                    assignments,
                ));
            }
        }
        Ok(out)
    }

    fn compile_expr(
        &self,
        def: &ExprDef,
        policy: &PolicyDef,
        scope: &VarScope,
    ) -> Result<Expression, LoadError> {
        self.compile_scoped_expr(def, &policy.id, scope)
    }

    fn compile_scoped_expr(
        &self,
        def: &ExprDef,
        policy_id: &str,
        scope: &VarScope,
    ) -> Result<Expression, LoadError> {
        match def {
            ExprDef::Value(v) => {
                Ok(Expression::constant(Value::Primitive(self.parse_value(v)?)))
            }
            ExprDef::Designator(d) => {
                Ok(Expression::AttributeDesignator(self.compile_designator(d)?))
            }
            ExprDef::Selector(s) => Ok(Expression::AttributeSelector(self.compile_selector(s)?)),
            ExprDef::VarRef(id) => {
                let expr = scope.get(id).ok_or_else(|| LoadError::UnknownVariable {
                    policy: policy_id.to_owned(),
                    id: id.clone(),
                })?;
                Ok(Expression::VariableReference(VariableReference::new(
                    format!("{policy_id}/{id}"),
                    id.clone(),
                    Arc::clone(expr),
                )))
            }
            ExprDef::FunctionRef(name) => {
                Ok(Expression::FunctionReference(self.resolve_first_order(name)?))
            }
            ExprDef::Apply(apply) => {
                let function = self.resolve_function(&apply.function)?;
                let mut args = Vec::with_capacity(apply.args.len());
                for arg in &apply.args {
                    args.push(self.compile_scoped_expr(arg, policy_id, scope)?);
                }
                Ok(Expression::apply(&function, args)?)
            }
        }
    }

    fn compile_designator(&self, def: &DesignatorDef) -> Result<AttributeDesignator, LoadError> {
        let datatype = self.resolve_datatype(&def.datatype)?;
        Ok(AttributeDesignator::new(
            AttributeFqn::new(def.category.clone(), def.id.clone(), def.issuer.clone()),
            datatype,
            def.must_be_present,
        ))
    }

    fn compile_selector(&self, def: &SelectorDef) -> Result<AttributeSelector, LoadError> {
        let datatype = self.resolve_datatype(&def.datatype)?;
        Ok(AttributeSelector::new(
            def.category.clone(),
            def.path.clone(),
            datatype,
            def.must_be_present,
        ))
    }

    fn parse_value(&self, def: &ValueDef) -> Result<AttributeValue, LoadError> {
        let datatype = self.resolve_datatype(&def.datatype)?;
        Ok(AttributeValue::parse_json(datatype, &def.value)?)
    }

    fn resolve_datatype(&self, name: &str) -> Result<Datatype, LoadError> {
        Datatype::resolve(name).ok_or_else(|| LoadError::UnknownDatatype(name.to_owned()))
    }

    /// Resolves a function by exact URI or by short name under the
    /// standard namespaces.
    fn resolve_function(&self, name: &str) -> Result<eval::Function, LoadError> {
        if let Some(f) = self.registry.get(name) {
            return Ok(f.clone());
        }
        for prefix in [eval::function::FN_1_0, eval::function::FN_2_0, eval::function::FN_3_0] {
            if let Some(f) = self.registry.get(&format!("{prefix}{name}")) {
                return Ok(f.clone());
            }
        }
        Err(LoadError::UnknownFunction(name.to_owned()))
    }

    fn resolve_first_order(&self, name: &str) -> Result<Arc<eval::FirstOrderFn>, LoadError> {
        match self.resolve_function(name)? {
            eval::Function::FirstOrder(f) => Ok(f),
            eval::Function::HigherOrder(f) => Err(LoadError::UnknownFunction(format!(
                "`{}` is higher-order where a first-order function is required",
                f.id()
            ))),
        }
    }
}
