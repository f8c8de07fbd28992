//! Rule evaluation: target, condition, effect, PEP actions.

use aegis_core::{
    Effect, EvalResult, ExtendedDecision, PepAction, PolicyIdentifier,
};
use combining::Decidable;
use eval::{EvaluationContext, Expression};

use crate::pep::{self, PepActionExpression};
use crate::target::Target;

/// A compiled rule. Immutable after load.
#[derive(Debug)]
pub struct RuleEvaluator {
    id: String,
    effect: Effect,
    target: Option<Target>,
    condition: Option<Expression>,
    pep_actions: Vec<PepActionExpression>,
}

impl RuleEvaluator {
    /// Builds a rule. The loader has already checked that the condition
    /// expression returns a boolean.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        effect: Effect,
        target: Option<Target>,
        condition: Option<Expression>,
        pep_actions: Vec<PepActionExpression>,
    ) -> Self {
        Self { id: id.into(), effect, target, condition, pep_actions }
    }

    /// The rule id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The rule's effect.
    #[must_use]
    pub const fn effect(&self) -> Effect {
        self.effect
    }

    fn condition_holds(&self, ctx: &EvaluationContext<'_>) -> EvalResult<bool> {
        match &self.condition {
            None => Ok(true),
            Some(expr) => expr.evaluate(ctx)?.expect_boolean(),
        }
    }
}

impl Decidable for RuleEvaluator {
    fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        pep: &mut Vec<PepAction>,
        _applicable: Option<&mut Vec<PolicyIdentifier>>,
    ) -> ExtendedDecision {
        let kind = self.effect.indeterminate_kind();

        match self.matches_target(ctx) {
            Ok(true) => {}
            Ok(false) => return ExtendedDecision::NotApplicable,
            Err(error) => return ExtendedDecision::indeterminate(kind, error),
        }
        match self.condition_holds(ctx) {
            Ok(true) => {}
            Ok(false) => return ExtendedDecision::NotApplicable,
            Err(error) => return ExtendedDecision::indeterminate(kind, error),
        }
        match pep::evaluate_matching(&self.pep_actions, self.effect, ctx) {
            Ok(actions) => {
                pep.extend(actions);
                match self.effect {
                    Effect::Permit => ExtendedDecision::Permit,
                    Effect::Deny => ExtendedDecision::Deny,
                }
            }
            Err(error) => ExtendedDecision::indeterminate(kind, error),
        }
    }

    fn matches_target(&self, ctx: &EvaluationContext<'_>) -> EvalResult<bool> {
        match &self.target {
            None => Ok(true),
            Some(target) => target.matches(ctx),
        }
    }

    fn effect_hint(&self) -> Option<Effect> {
        Some(self.effect)
    }

    fn is_always_applicable(&self) -> bool {
        self.target.is_none() && self.condition.is_none()
    }

    fn is_empty_equivalent(&self) -> bool {
        self.is_always_applicable() && self.pep_actions.is_empty()
    }

    fn has_pep_actions(&self) -> bool {
        !self.pep_actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use aegis_core::{AttributeValue, Bag, Datatype, Decision};
    use eval::{IndividualDecisionRequest, Limits, Value};

    use super::*;

    fn eval_rule(rule: &RuleEvaluator) -> (ExtendedDecision, Vec<PepAction>) {
        let request = IndividualDecisionRequest::default();
        let ctx = EvaluationContext::new(&request, Limits::default());
        let mut pep = Vec::new();
        let decision = rule.evaluate(&ctx, &mut pep, None);
        (decision, pep)
    }

    #[test]
    fn bare_rule_always_yields_its_effect() {
        let rule = RuleEvaluator::new("r", Effect::Deny, None, None, Vec::new());
        assert!(rule.is_always_applicable());
        assert!(rule.is_empty_equivalent());
        let (decision, pep) = eval_rule(&rule);
        assert_eq!(decision.decision(), Decision::Deny);
        assert!(pep.is_empty());
    }

    #[test]
    fn false_condition_is_not_applicable() {
        let rule = RuleEvaluator::new(
            "r",
            Effect::Permit,
            None,
            Some(Expression::constant(Value::boolean(false))),
            Vec::new(),
        );
        let (decision, _) = eval_rule(&rule);
        assert_eq!(decision.decision(), Decision::NotApplicable);
    }

    #[test]
    fn failing_condition_takes_the_effect_flavor() {
        // A bag where a boolean is required fails at evaluation time.
        let failing = Expression::constant(Value::Bag(Bag::empty(Datatype::Boolean)));
        let rule = RuleEvaluator::new("r", Effect::Permit, None, Some(failing), Vec::new());
        let (decision, pep) = eval_rule(&rule);
        let ExtendedDecision::Indeterminate { kind, .. } = decision else {
            panic!("expected Indeterminate");
        };
        assert_eq!(kind, aegis_core::IndeterminateKind::Permit);
        assert!(pep.is_empty());
    }

    #[test]
    fn failing_pep_action_is_indeterminate_with_effect_flavor() {
        let failing_assignment = crate::pep::AssignmentExpression::new(
            "attr",
            Expression::constant(Value::Primitive(AttributeValue::String("x".into()))),
        );
        // An obligation whose assignment evaluates a bag-typed expression
        // is fine; break it with an expression that fails instead.
        let bad = crate::pep::AssignmentExpression::new(
            "attr",
            Expression::FunctionReference(std::sync::Arc::clone(
                eval::FunctionRegistry::standard()
                    .get_first_order(&format!("{}string-equal", eval::function::FN_1_0))
                    .unwrap(),
            )),
        );
        let rule = RuleEvaluator::new(
            "r",
            Effect::Deny,
            None,
            None,
            vec![PepActionExpression::new(
                "o",
                true,
                Effect::Deny,
                vec![failing_assignment, bad],
            )],
        );
        let (decision, pep) = eval_rule(&rule);
        let ExtendedDecision::Indeterminate { kind, .. } = decision else {
            panic!("expected Indeterminate");
        };
        assert_eq!(kind, aegis_core::IndeterminateKind::Deny);
        assert!(pep.is_empty());
    }
}
