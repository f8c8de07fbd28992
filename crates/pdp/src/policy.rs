//! Policy and policy-set evaluation: target match, child combination, and
//! own-PEP-action filtering by the final effect.

use std::sync::Arc;

use aegis_core::{
    Effect, EvalResult, ExtendedDecision, PepAction, PolicyIdentifier, PolicyVersion,
};
use combining::{Combiner, Decidable};
use eval::EvaluationContext;

use crate::pep::{self, PepActionExpression};
use crate::target::Target;

/// A compiled policy: a target over a combination of rules.
pub struct PolicyEvaluator {
    id: String,
    version: PolicyVersion,
    target: Option<Target>,
    combiner: Combiner<crate::rule::RuleEvaluator>,
    pep_actions: Vec<PepActionExpression>,
}

impl PolicyEvaluator {
    /// Builds a policy evaluator.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        version: PolicyVersion,
        target: Option<Target>,
        combiner: Combiner<crate::rule::RuleEvaluator>,
        pep_actions: Vec<PepActionExpression>,
    ) -> Self {
        Self { id: id.into(), version, target, combiner, pep_actions }
    }

    /// The policy id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The policy version.
    #[must_use]
    pub const fn version(&self) -> &PolicyVersion {
        &self.version
    }
}

/// A compiled policy set: a target over a combination of policies, policy
/// sets, and resolved references.
pub struct PolicySetEvaluator {
    id: String,
    version: PolicyVersion,
    target: Option<Target>,
    combiner: Combiner<PolicyChild>,
    pep_actions: Vec<PepActionExpression>,
}

impl PolicySetEvaluator {
    /// Builds a policy-set evaluator.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        version: PolicyVersion,
        target: Option<Target>,
        combiner: Combiner<PolicyChild>,
        pep_actions: Vec<PepActionExpression>,
    ) -> Self {
        Self { id: id.into(), version, target, combiner, pep_actions }
    }

    /// The policy-set id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The policy-set version.
    #[must_use]
    pub const fn version(&self) -> &PolicyVersion {
        &self.version
    }
}

/// A child of a policy set. References are resolved to shared evaluators
/// at load time, so evaluation never touches the policy map.
pub enum PolicyChild {
    /// An inline or referenced policy.
    Policy(Arc<PolicyEvaluator>),
    /// An inline or referenced policy set.
    PolicySet(Arc<PolicySetEvaluator>),
}

/// Shared node semantics for policies and policy sets: target match,
/// child combination, own-action filtering, applicable-id bookkeeping.
fn evaluate_node<E: Decidable>(
    id: &str,
    version: &PolicyVersion,
    target: Option<&Target>,
    combiner: &Combiner<E>,
    pep_actions: &[PepActionExpression],
    ctx: &EvaluationContext<'_>,
    pep: &mut Vec<PepAction>,
    mut applicable: Option<&mut Vec<PolicyIdentifier>>,
) -> ExtendedDecision {
    let target_result = match target {
        None => Ok(true),
        Some(t) => t.matches(ctx),
    };
    match target_result {
        Ok(true) => {}
        Ok(false) => return ExtendedDecision::NotApplicable,
        Err(error) => {
            // The Indeterminate flavor comes from what the children would
            // have decided.
            let mut scratch = Vec::new();
            return match combiner.evaluate(ctx, &mut scratch, None) {
                ExtendedDecision::Permit => ExtendedDecision::indeterminate(
                    Effect::Permit.indeterminate_kind(),
                    error,
                ),
                ExtendedDecision::Deny => {
                    ExtendedDecision::indeterminate(Effect::Deny.indeterminate_kind(), error)
                }
                ExtendedDecision::NotApplicable => ExtendedDecision::NotApplicable,
                ExtendedDecision::Indeterminate { kind, .. } => {
                    ExtendedDecision::indeterminate(kind, error)
                }
            };
        }
    }

    let mut child_pep = Vec::new();
    let decision = combiner.evaluate(ctx, &mut child_pep, applicable.as_deref_mut());
    tracing::debug!(policy = id, decision = ?decision.decision(), "combined children");
    match decision {
        ExtendedDecision::Permit | ExtendedDecision::Deny => {
            let effect = match decision {
                ExtendedDecision::Permit => Effect::Permit,
                _ => Effect::Deny,
            };
            match pep::evaluate_matching(pep_actions, effect, ctx) {
                Ok(own) => {
                    pep.append(&mut child_pep);
                    pep.extend(own);
                    if let Some(list) = applicable {
                        list.push(PolicyIdentifier::new(id, version.clone()));
                    }
                    decision
                }
                Err(error) => {
                    ExtendedDecision::indeterminate(effect.indeterminate_kind(), error)
                }
            }
        }
        ExtendedDecision::NotApplicable => ExtendedDecision::NotApplicable,
        indeterminate @ ExtendedDecision::Indeterminate { .. } => {
            if let Some(list) = applicable {
                list.push(PolicyIdentifier::new(id, version.clone()));
            }
            indeterminate
        }
    }
}

impl Decidable for PolicyEvaluator {
    fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        pep: &mut Vec<PepAction>,
        applicable: Option<&mut Vec<PolicyIdentifier>>,
    ) -> ExtendedDecision {
        evaluate_node(
            &self.id,
            &self.version,
            self.target.as_ref(),
            &self.combiner,
            &self.pep_actions,
            ctx,
            pep,
            applicable,
        )
    }

    fn matches_target(&self, ctx: &EvaluationContext<'_>) -> EvalResult<bool> {
        match &self.target {
            None => Ok(true),
            Some(target) => target.matches(ctx),
        }
    }
}

impl Decidable for PolicySetEvaluator {
    fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        pep: &mut Vec<PepAction>,
        applicable: Option<&mut Vec<PolicyIdentifier>>,
    ) -> ExtendedDecision {
        evaluate_node(
            &self.id,
            &self.version,
            self.target.as_ref(),
            &self.combiner,
            &self.pep_actions,
            ctx,
            pep,
            applicable,
        )
    }

    fn matches_target(&self, ctx: &EvaluationContext<'_>) -> EvalResult<bool> {
        match &self.target {
            None => Ok(true),
            Some(target) => target.matches(ctx),
        }
    }
}

impl Decidable for PolicyChild {
    fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        pep: &mut Vec<PepAction>,
        applicable: Option<&mut Vec<PolicyIdentifier>>,
    ) -> ExtendedDecision {
        match self {
            Self::Policy(p) => p.evaluate(ctx, pep, applicable),
            Self::PolicySet(s) => s.evaluate(ctx, pep, applicable),
        }
    }

    fn matches_target(&self, ctx: &EvaluationContext<'_>) -> EvalResult<bool> {
        match self {
            Self::Policy(p) => p.matches_target(ctx),
            Self::PolicySet(s) => s.matches_target(ctx),
        }
    }
}
