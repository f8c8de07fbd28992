//! deny-overrides and permit-overrides (ordered variants share these
//! evaluators; children are always walked in declared order).

use std::sync::Arc;

use aegis_core::{
    Effect, ExtendedDecision, IndeterminateError, IndeterminateKind, PepAction, PolicyIdentifier,
};
use eval::EvaluationContext;

use crate::Decidable;

pub(crate) struct Overrides<E> {
    overriding: Effect,
    children: Vec<Arc<E>>,
}

impl<E: Decidable> Overrides<E> {
    pub(crate) fn new(overriding: Effect, children: Vec<Arc<E>>) -> Self {
        Self { overriding, children }
    }

    pub(crate) fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        pep: &mut Vec<PepAction>,
        mut applicable: Option<&mut Vec<PolicyIdentifier>>,
    ) -> ExtendedDecision {
        let overriding_decision = self.overriding.decision();
        let overriding_kind = self.overriding.indeterminate_kind();

        let mut overridden_seen = false;
        let mut overridden_pep: Vec<PepAction> = Vec::new();
        // First Indeterminate leaning toward the overriding effect (its own
        // flavor, or DP); widened by later conflicting evidence.
        let mut ind_overriding: Option<(IndeterminateKind, IndeterminateError)> = None;
        let mut ind_overridden: Option<(IndeterminateKind, IndeterminateError)> = None;

        for child in &self.children {
            let mut child_pep = Vec::new();
            let decision = child.evaluate(ctx, &mut child_pep, applicable.as_deref_mut());
            match decision {
                d if d.decision() == overriding_decision => {
                    pep.append(&mut child_pep);
                    return d;
                }
                ExtendedDecision::Permit | ExtendedDecision::Deny => {
                    overridden_seen = true;
                    overridden_pep.append(&mut child_pep);
                }
                ExtendedDecision::NotApplicable => {}
                ExtendedDecision::Indeterminate { kind, error } => {
                    let slot = if kind == overriding_kind || kind == IndeterminateKind::DenyPermit
                    {
                        &mut ind_overriding
                    } else {
                        &mut ind_overridden
                    };
                    match slot {
                        Some((stored_kind, _)) => *stored_kind = stored_kind.join(kind),
                        None => *slot = Some((kind, error)),
                    }
                }
            }
        }

        if let Some((kind, error)) = ind_overriding {
            let kind = if kind == IndeterminateKind::DenyPermit
                || overridden_seen
                || ind_overridden.is_some()
            {
                IndeterminateKind::DenyPermit
            } else {
                overriding_kind
            };
            return ExtendedDecision::indeterminate(kind, error);
        }
        if overridden_seen {
            pep.append(&mut overridden_pep);
            return match self.overriding {
                Effect::Deny => ExtendedDecision::Permit,
                Effect::Permit => ExtendedDecision::Deny,
            };
        }
        if let Some((kind, error)) = ind_overridden {
            return ExtendedDecision::indeterminate(kind, error);
        }
        ExtendedDecision::NotApplicable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::Decision;

    use crate::testing::{run, Scripted};
    use crate::{Combiner, CombiningAlgId};

    fn combiner(alg: CombiningAlgId, children: Vec<Scripted>) -> Combiner<Scripted> {
        Combiner::new(alg, children.into_iter().map(Arc::new).collect())
    }

    #[test]
    fn first_deny_wins_and_keeps_only_its_actions() {
        let c = combiner(
            CombiningAlgId::DenyOverrides,
            vec![
                Scripted::permit().with_pep("permit-action"),
                Scripted::deny().with_pep("deny-action"),
                Scripted::deny().with_pep("unreached"),
            ],
        );
        let (decision, pep) = run(&c);
        assert_eq!(decision.decision(), Decision::Deny);
        assert_eq!(pep.len(), 1);
        assert_eq!(pep[0].id, "deny-action");
    }

    #[test]
    fn permits_accumulate_actions_when_no_deny() {
        let c = combiner(
            CombiningAlgId::DenyOverrides,
            vec![
                Scripted::permit().with_pep("one"),
                Scripted::not_applicable(Effect::Deny),
                Scripted::permit().with_pep("two"),
            ],
        );
        let (decision, pep) = run(&c);
        assert_eq!(decision.decision(), Decision::Permit);
        let ids: Vec<&str> = pep.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["one", "two"]);
    }

    #[test]
    fn indeterminate_d_plus_permit_widens_to_dp() {
        let c = combiner(
            CombiningAlgId::DenyOverrides,
            vec![
                Scripted::indeterminate(IndeterminateKind::Deny),
                Scripted::permit(),
            ],
        );
        let (decision, _) = run(&c);
        let ExtendedDecision::Indeterminate { kind, .. } = decision else {
            panic!("expected Indeterminate");
        };
        assert_eq!(kind, IndeterminateKind::DenyPermit);
    }

    #[test]
    fn lone_indeterminate_d_stays_d() {
        let c = combiner(
            CombiningAlgId::DenyOverrides,
            vec![
                Scripted::indeterminate(IndeterminateKind::Deny),
                Scripted::not_applicable(Effect::Permit),
            ],
        );
        let (decision, _) = run(&c);
        let ExtendedDecision::Indeterminate { kind, .. } = decision else {
            panic!("expected Indeterminate");
        };
        assert_eq!(kind, IndeterminateKind::Deny);
    }

    #[test]
    fn permit_overrides_is_the_dual() {
        let c = combiner(
            CombiningAlgId::PermitOverrides,
            vec![
                Scripted::deny().with_pep("deny-action"),
                Scripted::permit().with_pep("permit-action"),
            ],
        );
        let (decision, pep) = run(&c);
        assert_eq!(decision.decision(), Decision::Permit);
        assert_eq!(pep.len(), 1);
        assert_eq!(pep[0].id, "permit-action");
    }

    #[test]
    fn empty_children_are_not_applicable() {
        let c = combiner(CombiningAlgId::DenyOverrides, Vec::new());
        let (decision, pep) = run(&c);
        assert_eq!(decision.decision(), Decision::NotApplicable);
        assert!(pep.is_empty());
    }

    #[test]
    fn indeterminate_p_alone_stays_p() {
        let c = combiner(
            CombiningAlgId::DenyOverrides,
            vec![Scripted::indeterminate(IndeterminateKind::Permit)],
        );
        let (decision, _) = run(&c);
        let ExtendedDecision::Indeterminate { kind, .. } = decision else {
            panic!("expected Indeterminate");
        };
        assert_eq!(kind, IndeterminateKind::Permit);
    }
}
