//! Obligation and advice expressions scoped by fulfilling effect.

use aegis_core::{Effect, EvalResult, PepAction, PepAttribute};
use eval::{EvaluationContext, Expression, Value};

/// One attribute assignment inside an obligation or advice expression.
#[derive(Debug)]
pub struct AssignmentExpression {
    attribute_id: String,
    expr: Expression,
}

impl AssignmentExpression {
    /// Builds an assignment.
    #[must_use]
    pub fn new(attribute_id: impl Into<String>, expr: Expression) -> Self {
        Self { attribute_id: attribute_id.into(), expr }
    }
}

/// An obligation or advice attached to a rule, policy, or policy set,
/// emitted only when the final decision equals `fulfill_on`.
#[derive(Debug)]
pub struct PepActionExpression {
    id: String,
    obligatory: bool,
    fulfill_on: Effect,
    assignments: Vec<AssignmentExpression>,
}

impl PepActionExpression {
    /// Builds a PEP action expression.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        obligatory: bool,
        fulfill_on: Effect,
        assignments: Vec<AssignmentExpression>,
    ) -> Self {
        Self { id: id.into(), obligatory, fulfill_on, assignments }
    }

    /// The effect this action fulfills on.
    #[must_use]
    pub const fn fulfill_on(&self) -> Effect {
        self.fulfill_on
    }

    /// Evaluates the assignments. A bag-valued assignment fans out to one
    /// attribute per element.
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> EvalResult<PepAction> {
        let mut attributes = Vec::with_capacity(self.assignments.len());
        for assignment in &self.assignments {
            match assignment.expr.evaluate(ctx)? {
                Value::Primitive(value) => {
                    attributes.push(PepAttribute { id: assignment.attribute_id.clone(), value });
                }
                Value::Bag(bag) => {
                    for value in bag.iter() {
                        attributes.push(PepAttribute {
                            id: assignment.attribute_id.clone(),
                            value: value.clone(),
                        });
                    }
                }
            }
        }
        Ok(PepAction::new(self.id.clone(), self.obligatory, attributes))
    }
}

/// Evaluates the actions whose `fulfill_on` equals `effect`. The first
/// failing action aborts the whole set; the caller converts that into an
/// Indeterminate of the matching flavor.
pub fn evaluate_matching(
    actions: &[PepActionExpression],
    effect: Effect,
    ctx: &EvaluationContext<'_>,
) -> EvalResult<Vec<PepAction>> {
    actions
        .iter()
        .filter(|a| a.fulfill_on == effect)
        .map(|a| a.evaluate(ctx))
        .collect()
}
