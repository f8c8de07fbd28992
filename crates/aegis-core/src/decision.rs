//! Decision types: effects, extended decisions, PEP actions, and the final
//! decision result returned by the PDP.

use serde::{Deserialize, Serialize};

use crate::status::{IndeterminateError, Status};
use crate::value::AttributeValue;
use crate::version::PolicyVersion;

/// A rule's intended outcome when it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// The rule permits the request.
    Permit,
    /// The rule denies the request.
    Deny,
}

impl Effect {
    /// The decision produced when a rule with this effect applies.
    #[must_use]
    pub const fn decision(self) -> Decision {
        match self {
            Self::Permit => Decision::Permit,
            Self::Deny => Decision::Deny,
        }
    }

    /// The Indeterminate flavor for failures inside a rule of this effect.
    #[must_use]
    pub const fn indeterminate_kind(self) -> IndeterminateKind {
        match self {
            Self::Permit => IndeterminateKind::Permit,
            Self::Deny => IndeterminateKind::Deny,
        }
    }
}

/// The four authorization decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Access is granted.
    Permit,
    /// Access is refused.
    Deny,
    /// No policy applies to the request.
    NotApplicable,
    /// Evaluation failed; the flavor says which decisions were possible.
    Indeterminate,
}

/// The flavor of an Indeterminate decision: the set of decisions that could
/// have been produced had evaluation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndeterminateKind {
    /// Could only have been Permit (`Indeterminate{P}`).
    Permit,
    /// Could only have been Deny (`Indeterminate{D}`).
    Deny,
    /// Could have been either (`Indeterminate{DP}`).
    DenyPermit,
}

impl IndeterminateKind {
    /// Combines two flavors; conflicting leanings widen to `DenyPermit`.
    #[must_use]
    pub const fn join(self, other: Self) -> Self {
        match (self, other) {
            (Self::Permit, Self::Permit) => Self::Permit,
            (Self::Deny, Self::Deny) => Self::Deny,
            _ => Self::DenyPermit,
        }
    }
}

/// Intermediate decision passed between combining algorithms and child
/// evaluators. PEP actions travel out-of-band in a collector so combiners
/// can filter them by the final effect.
#[derive(Debug, Clone)]
pub enum ExtendedDecision {
    /// Permit.
    Permit,
    /// Deny.
    Deny,
    /// Nothing applied.
    NotApplicable,
    /// Evaluation failed with the given flavor and cause.
    Indeterminate {
        /// Which decisions were possible.
        kind: IndeterminateKind,
        /// The underlying evaluation error.
        error: IndeterminateError,
    },
}

impl ExtendedDecision {
    /// Builds a flavored Indeterminate from a rule or policy effect.
    #[must_use]
    pub const fn indeterminate(kind: IndeterminateKind, error: IndeterminateError) -> Self {
        Self::Indeterminate { kind, error }
    }

    /// The plain decision, with the flavor erased.
    #[must_use]
    pub const fn decision(&self) -> Decision {
        match self {
            Self::Permit => Decision::Permit,
            Self::Deny => Decision::Deny,
            Self::NotApplicable => Decision::NotApplicable,
            Self::Indeterminate { .. } => Decision::Indeterminate,
        }
    }
}

/// One attribute assignment inside a PEP action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PepAttribute {
    /// Assignment attribute id URI.
    pub id: String,
    /// Assigned value.
    pub value: AttributeValue,
}

/// An obligation or advice directed at the enforcement point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PepAction {
    /// Obligation or advice id URI.
    pub id: String,
    /// True for obligations (the PEP must fulfill them), false for advice.
    pub obligatory: bool,
    /// Evaluated attribute assignments.
    pub attributes: Vec<PepAttribute>,
}

impl PepAction {
    /// Builds a PEP action.
    #[must_use]
    pub fn new(id: impl Into<String>, obligatory: bool, attributes: Vec<PepAttribute>) -> Self {
        Self { id: id.into(), obligatory, attributes }
    }
}

/// Identifies an applicable policy or policy set in a decision result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyIdentifier {
    /// Policy(Set)Id URI.
    pub id: String,
    /// Version of the evaluated policy.
    pub version: PolicyVersion,
}

impl PolicyIdentifier {
    /// Builds a policy identifier.
    #[must_use]
    pub fn new(id: impl Into<String>, version: PolicyVersion) -> Self {
        Self { id: id.into(), version }
    }
}

/// The immutable final result of one request evaluation.
///
/// Invariant: NotApplicable and Indeterminate results carry no PEP actions;
/// the constructors enforce this.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionResult {
    decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    indeterminate_kind: Option<IndeterminateKind>,
    status: Status,
    pep_actions: Vec<PepAction>,
    applicable_policies: Vec<PolicyIdentifier>,
}

impl DecisionResult {
    /// A Permit result with its PEP actions and applicable policies.
    #[must_use]
    pub fn permit(pep_actions: Vec<PepAction>, applicable: Vec<PolicyIdentifier>) -> Self {
        Self {
            decision: Decision::Permit,
            indeterminate_kind: None,
            status: ok_status(),
            pep_actions,
            applicable_policies: applicable,
        }
    }

    /// A Deny result with its PEP actions and applicable policies.
    #[must_use]
    pub fn deny(pep_actions: Vec<PepAction>, applicable: Vec<PolicyIdentifier>) -> Self {
        Self {
            decision: Decision::Deny,
            indeterminate_kind: None,
            status: ok_status(),
            pep_actions,
            applicable_policies: applicable,
        }
    }

    /// The NotApplicable result: no actions, no applicable policies.
    #[must_use]
    pub fn not_applicable() -> Self {
        Self {
            decision: Decision::NotApplicable,
            indeterminate_kind: None,
            status: ok_status(),
            pep_actions: Vec::new(),
            applicable_policies: Vec::new(),
        }
    }

    /// An Indeterminate result annotated with its flavor and cause.
    #[must_use]
    pub fn indeterminate(
        kind: IndeterminateKind,
        error: &IndeterminateError,
        applicable: Vec<PolicyIdentifier>,
    ) -> Self {
        Self {
            decision: Decision::Indeterminate,
            indeterminate_kind: Some(kind),
            status: Status::from(error),
            pep_actions: Vec::new(),
            applicable_policies: applicable,
        }
    }

    /// Builds the final result from an extended decision plus the collected
    /// PEP actions and applicable-policy list.
    #[must_use]
    pub fn from_extended(
        extended: ExtendedDecision,
        pep_actions: Vec<PepAction>,
        applicable: Vec<PolicyIdentifier>,
    ) -> Self {
        match extended {
            ExtendedDecision::Permit => Self::permit(pep_actions, applicable),
            ExtendedDecision::Deny => Self::deny(pep_actions, applicable),
            ExtendedDecision::NotApplicable => Self::not_applicable(),
            ExtendedDecision::Indeterminate { kind, error } => {
                Self::indeterminate(kind, &error, applicable)
            }
        }
    }

    /// The decision.
    #[must_use]
    pub const fn decision(&self) -> Decision {
        self.decision
    }

    /// The Indeterminate flavor, when the decision is Indeterminate.
    #[must_use]
    pub const fn indeterminate_kind(&self) -> Option<IndeterminateKind> {
        self.indeterminate_kind
    }

    /// The status block.
    #[must_use]
    pub const fn status(&self) -> &Status {
        &self.status
    }

    /// Obligations and advice the enforcement point must consider.
    #[must_use]
    pub fn pep_actions(&self) -> &[PepAction] {
        &self.pep_actions
    }

    /// Identifiers of the policies that applied to the request.
    #[must_use]
    pub fn applicable_policies(&self) -> &[PolicyIdentifier] {
        &self.applicable_policies
    }
}

fn ok_status() -> Status {
    Status { code: crate::status::StatusCode::Ok, message: String::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flavor_join_widens_on_conflict() {
        use IndeterminateKind as K;
        assert_eq!(K::Permit.join(K::Permit), K::Permit);
        assert_eq!(K::Deny.join(K::Deny), K::Deny);
        assert_eq!(K::Permit.join(K::Deny), K::DenyPermit);
        assert_eq!(K::DenyPermit.join(K::Permit), K::DenyPermit);
    }

    #[test]
    fn not_applicable_has_no_actions() {
        let r = DecisionResult::not_applicable();
        assert!(r.pep_actions().is_empty());
        assert!(r.applicable_policies().is_empty());
    }

    #[test]
    fn indeterminate_has_no_actions() {
        let err = IndeterminateError::processing("boom");
        let r = DecisionResult::indeterminate(IndeterminateKind::DenyPermit, &err, Vec::new());
        assert_eq!(r.decision(), Decision::Indeterminate);
        assert!(r.pep_actions().is_empty());
        assert_eq!(r.indeterminate_kind(), Some(IndeterminateKind::DenyPermit));
    }

    #[test]
    fn effect_maps_to_decision_and_flavor() {
        assert_eq!(Effect::Permit.decision(), Decision::Permit);
        assert_eq!(Effect::Deny.indeterminate_kind(), IndeterminateKind::Deny);
    }
}
