//! Target matching: a conjunction of AnyOf groups, each a disjunction of
//! AllOf groups, each a conjunction of individual matches.

use std::sync::Arc;

use aegis_core::{AttributeValue, EvalResult};
use eval::{EvaluationContext, Expression, FirstOrderFn, Value};

/// One attribute match: a match function applied between a literal and
/// each element of a designator or selector bag.
///
/// Per XACML match semantics, an element for which the function returns
/// true yields Match even when other elements errored; errors surface only
/// when no element matched.
#[derive(Debug)]
pub struct Match {
    func: Arc<FirstOrderFn>,
    literal: AttributeValue,
    source: Expression,
}

impl Match {
    /// Builds a match. The caller has already checked that `func` is a
    /// boolean function of (literal type, source element type).
    #[must_use]
    pub fn new(func: Arc<FirstOrderFn>, literal: AttributeValue, source: Expression) -> Self {
        Self { func, literal, source }
    }

    fn matches(&self, ctx: &EvaluationContext<'_>) -> EvalResult<bool> {
        let value = self.source.evaluate(ctx)?;
        let bag = value.expect_bag()?;
        let mut first_error = None;
        for element in bag.iter() {
            let args =
                [Value::Primitive(self.literal.clone()), Value::Primitive(element.clone())];
            match self.func.invoke_values(&args, ctx).and_then(|v| v.expect_boolean()) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => first_error = first_error.or(Some(e)),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(false),
        }
    }
}

/// A conjunction of matches.
#[derive(Debug, Default)]
pub struct AllOf {
    matches: Vec<Match>,
}

impl AllOf {
    /// Builds the conjunction.
    #[must_use]
    pub fn new(matches: Vec<Match>) -> Self {
        Self { matches }
    }

    fn matches(&self, ctx: &EvaluationContext<'_>) -> EvalResult<bool> {
        let mut first_error = None;
        for m in &self.matches {
            match m.matches(ctx) {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(e) => first_error = first_error.or(Some(e)),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(true),
        }
    }
}

/// A disjunction of [`AllOf`] groups.
#[derive(Debug, Default)]
pub struct AnyOf {
    all_ofs: Vec<AllOf>,
}

impl AnyOf {
    /// Builds the disjunction.
    #[must_use]
    pub fn new(all_ofs: Vec<AllOf>) -> Self {
        Self { all_ofs }
    }

    fn matches(&self, ctx: &EvaluationContext<'_>) -> EvalResult<bool> {
        let mut first_error = None;
        for group in &self.all_ofs {
            match group.matches(ctx) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => first_error = first_error.or(Some(e)),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(false),
        }
    }
}

/// A target: conjunction of [`AnyOf`] groups. The empty target matches
/// everything.
#[derive(Debug, Default)]
pub struct Target {
    any_ofs: Vec<AnyOf>,
}

impl Target {
    /// Builds the target.
    #[must_use]
    pub fn new(any_ofs: Vec<AnyOf>) -> Self {
        Self { any_ofs }
    }

    /// Evaluates the target against the request.
    pub fn matches(&self, ctx: &EvaluationContext<'_>) -> EvalResult<bool> {
        let mut first_error = None;
        for group in &self.any_ofs {
            match group.matches(ctx) {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(e) => first_error = first_error.or(Some(e)),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use aegis_core::{AttributeFqn, Bag, Datatype};
    use eval::{
        AttributeDesignator, FunctionRegistry, IndividualDecisionRequest, Limits,
    };

    use super::*;

    fn string_equal() -> Arc<FirstOrderFn> {
        let id = format!("{}string-equal", eval::function::FN_1_0);
        Arc::clone(FunctionRegistry::standard().get_first_order(&id).unwrap())
    }

    fn request_with_roles(roles: &[&str]) -> IndividualDecisionRequest {
        let values = roles.iter().map(|r| AttributeValue::String((*r).into())).collect();
        let bag = Bag::new(Datatype::String, values).unwrap();
        let mut attrs = HashMap::new();
        attrs.insert(AttributeFqn::new("subject", "role", None), bag);
        IndividualDecisionRequest::new(attrs, HashMap::new(), true)
    }

    fn role_match(literal: &str) -> Match {
        Match::new(
            string_equal(),
            AttributeValue::String(literal.into()),
            Expression::AttributeDesignator(AttributeDesignator::new(
                AttributeFqn::new("subject", "role", None),
                Datatype::String,
                false,
            )),
        )
    }

    fn target(matches: Vec<Match>) -> Target {
        Target::new(vec![AnyOf::new(vec![AllOf::new(matches)])])
    }

    #[test]
    fn empty_target_matches_everything() {
        let request = IndividualDecisionRequest::default();
        let ctx = EvaluationContext::new(&request, Limits::default());
        assert!(Target::default().matches(&ctx).unwrap());
    }

    #[test]
    fn match_scans_the_designated_bag() {
        let request = request_with_roles(&["user", "admin"]);
        let ctx = EvaluationContext::new(&request, Limits::default());
        assert!(target(vec![role_match("admin")]).matches(&ctx).unwrap());
        assert!(!target(vec![role_match("root")]).matches(&ctx).unwrap());
    }

    #[test]
    fn all_of_is_a_conjunction() {
        let request = request_with_roles(&["user", "admin"]);
        let ctx = EvaluationContext::new(&request, Limits::default());
        assert!(target(vec![role_match("admin"), role_match("user")]).matches(&ctx).unwrap());
        assert!(!target(vec![role_match("admin"), role_match("root")]).matches(&ctx).unwrap());
    }

    #[test]
    fn missing_required_attribute_makes_the_target_indeterminate() {
        let request = IndividualDecisionRequest::default();
        let ctx = EvaluationContext::new(&request, Limits::default());
        let m = Match::new(
            string_equal(),
            AttributeValue::String("admin".into()),
            Expression::AttributeDesignator(AttributeDesignator::new(
                AttributeFqn::new("subject", "role", None),
                Datatype::String,
                true,
            )),
        );
        assert!(target(vec![m]).matches(&ctx).is_err());
    }
}
