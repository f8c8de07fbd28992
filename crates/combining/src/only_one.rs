//! only-one-applicable: applicability is decided by target alone; exactly
//! one applicable child may exist.

use std::sync::Arc;

use aegis_core::{ExtendedDecision, IndeterminateError, IndeterminateKind, PepAction, PolicyIdentifier};
use eval::EvaluationContext;

use crate::Decidable;

pub(crate) struct OnlyOneApplicable<E> {
    children: Vec<Arc<E>>,
}

impl<E: Decidable> OnlyOneApplicable<E> {
    pub(crate) fn new(children: Vec<Arc<E>>) -> Self {
        Self { children }
    }

    pub(crate) fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        pep: &mut Vec<PepAction>,
        applicable: Option<&mut Vec<PolicyIdentifier>>,
    ) -> ExtendedDecision {
        let mut selected: Option<&Arc<E>> = None;
        for child in &self.children {
            match child.matches_target(ctx) {
                Err(error) => {
                    return ExtendedDecision::indeterminate(IndeterminateKind::DenyPermit, error)
                }
                Ok(false) => {}
                Ok(true) => {
                    if selected.is_some() {
                        return ExtendedDecision::indeterminate(
                            IndeterminateKind::DenyPermit,
                            IndeterminateError::processing(
                                "more than one child is applicable under only-one-applicable",
                            ),
                        );
                    }
                    selected = Some(child);
                }
            }
        }
        match selected {
            None => ExtendedDecision::NotApplicable,
            Some(child) => child.evaluate(ctx, pep, applicable),
        }
    }
}
