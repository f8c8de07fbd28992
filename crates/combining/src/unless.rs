//! deny-unless-permit and permit-unless-deny: the only algorithms that can
//! never return NotApplicable or Indeterminate.

use std::sync::Arc;

use aegis_core::{Effect, ExtendedDecision, PepAction, PolicyIdentifier};
use eval::EvaluationContext;

use crate::Decidable;

pub(crate) struct Unless<E> {
    overriding: Effect,
    /// Children walked for the overriding decision. When every child is a
    /// rule this holds only the rules with the overriding effect;
    /// otherwise all children (whose overridden-effect PEP actions are
    /// then collected in the same walk).
    scan: Vec<Arc<E>>,
    /// Overridden-effect rules that carry PEP actions; walked only to
    /// collect actions for the fallback decision. Overridden rules without
    /// actions can never affect the result and are discarded outright.
    pep_only: Vec<Arc<E>>,
    /// Set when an empty-equivalent overriding rule makes the result a
    /// foregone conclusion.
    constant: bool,
}

impl<E: Decidable> Unless<E> {
    pub(crate) fn new(overriding: Effect, children: Vec<Arc<E>>) -> Self {
        let all_rules = children.iter().all(|c| c.effect_hint().is_some());
        if !all_rules {
            return Self { overriding, scan: children, pep_only: Vec::new(), constant: false };
        }

        let mut scan = Vec::new();
        let mut pep_only = Vec::new();
        let mut constant = false;
        for child in children {
            if child.effect_hint() == Some(overriding) {
                if child.is_empty_equivalent() {
                    constant = true;
                }
                scan.push(child);
            } else if child.has_pep_actions() {
                pep_only.push(child);
            }
            // Overridden-effect rules without PEP actions are dropped.
        }
        if constant {
            scan.clear();
            pep_only.clear();
        }
        Self { overriding, scan, pep_only, constant }
    }

    fn overriding_extended(&self) -> ExtendedDecision {
        match self.overriding {
            Effect::Permit => ExtendedDecision::Permit,
            Effect::Deny => ExtendedDecision::Deny,
        }
    }

    fn overridden_extended(&self) -> ExtendedDecision {
        match self.overriding {
            Effect::Permit => ExtendedDecision::Deny,
            Effect::Deny => ExtendedDecision::Permit,
        }
    }

    pub(crate) fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        pep: &mut Vec<PepAction>,
        mut applicable: Option<&mut Vec<PolicyIdentifier>>,
    ) -> ExtendedDecision {
        if self.constant {
            return self.overriding_extended();
        }

        let overriding_decision = self.overriding.decision();
        let overridden_decision = self.overridden_extended().decision();
        let mut overridden_pep: Vec<PepAction> = Vec::new();

        for child in &self.scan {
            let mut child_pep = Vec::new();
            let decision = child.evaluate(ctx, &mut child_pep, applicable.as_deref_mut());
            if decision.decision() == overriding_decision {
                pep.append(&mut child_pep);
                return decision;
            }
            if decision.decision() == overridden_decision {
                overridden_pep.append(&mut child_pep);
            }
            // NotApplicable and Indeterminate are "not the overriding
            // decision" and cannot surface from this algorithm.
        }
        for child in &self.pep_only {
            let mut child_pep = Vec::new();
            let decision = child.evaluate(ctx, &mut child_pep, applicable.as_deref_mut());
            if decision.decision() == overridden_decision {
                overridden_pep.append(&mut child_pep);
            }
        }

        pep.append(&mut overridden_pep);
        self.overridden_extended()
    }
}
