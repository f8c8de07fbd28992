//! first-applicable: the first child whose decision is not NotApplicable
//! decides, verbatim.

use std::sync::Arc;

use aegis_core::{ExtendedDecision, PepAction, PolicyIdentifier};
use eval::EvaluationContext;

use crate::Decidable;

pub(crate) struct FirstApplicable<E> {
    children: Vec<Arc<E>>,
}

impl<E: Decidable> FirstApplicable<E> {
    /// Children after the first always-applicable rule can never be
    /// reached, so the list is truncated there at load time.
    pub(crate) fn new(children: Vec<Arc<E>>) -> Self {
        let cutoff = children
            .iter()
            .position(|c| c.effect_hint().is_some() && c.is_always_applicable())
            .map_or(children.len(), |i| i + 1);
        let mut children = children;
        children.truncate(cutoff);
        Self { children }
    }

    pub(crate) fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        pep: &mut Vec<PepAction>,
        mut applicable: Option<&mut Vec<PolicyIdentifier>>,
    ) -> ExtendedDecision {
        for child in &self.children {
            let mut child_pep = Vec::new();
            let decision = child.evaluate(ctx, &mut child_pep, applicable.as_deref_mut());
            match decision {
                ExtendedDecision::NotApplicable => {}
                other => {
                    pep.append(&mut child_pep);
                    return other;
                }
            }
        }
        ExtendedDecision::NotApplicable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::{Decision, Effect};

    use crate::testing::{run, Scripted};
    use crate::{Combiner, CombiningAlgId};

    #[test]
    fn first_non_not_applicable_decides() {
        let children = vec![
            Arc::new(Scripted::not_applicable(Effect::Deny)),
            Arc::new(Scripted::permit().with_pep("from-winner")),
            Arc::new(Scripted::deny()),
        ];
        let c = Combiner::new(CombiningAlgId::FirstApplicable, children);
        let (decision, pep) = run(&c);
        assert_eq!(decision.decision(), Decision::Permit);
        assert_eq!(pep.len(), 1);
        assert_eq!(pep[0].id, "from-winner");
    }

    #[test]
    fn truncates_after_an_always_applicable_rule() {
        let unreachable = Arc::new(Scripted::deny());
        let children = vec![
            Arc::new(Scripted::not_applicable(Effect::Deny)),
            Arc::new(Scripted::permit()),
            Arc::clone(&unreachable),
        ];
        let c = Combiner::new(CombiningAlgId::FirstApplicable, children);
        let (decision, _) = run(&c);
        assert_eq!(decision.decision(), Decision::Permit);
        assert!(!unreachable.was_evaluated());
    }

    #[test]
    fn indeterminate_is_returned_verbatim() {
        let children = vec![
            Arc::new(Scripted::not_applicable(Effect::Permit)),
            Arc::new(Scripted::indeterminate(aegis_core::IndeterminateKind::Deny)),
            Arc::new(Scripted::permit()),
        ];
        let c = Combiner::new(CombiningAlgId::FirstApplicable, children);
        let (decision, pep) = run(&c);
        assert_eq!(decision.decision(), Decision::Indeterminate);
        assert!(pep.is_empty());
    }

    #[test]
    fn all_not_applicable_is_not_applicable() {
        let children = vec![
            Arc::new(Scripted::not_applicable(Effect::Deny)),
            Arc::new(Scripted::not_applicable(Effect::Permit)),
        ];
        let c = Combiner::new(CombiningAlgId::FirstApplicable, children);
        let (decision, _) = run(&c);
        assert_eq!(decision.decision(), Decision::NotApplicable);
    }
}
