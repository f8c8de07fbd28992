//! Decision-combining algorithms.
//!
//! A [`Combiner`] is built once at policy load from a
//! [`CombiningAlgId`] and an ordered child list, applying the static
//! optimizations the algorithm admits, and is immutable afterwards.
//! Children are anything [`Decidable`]: rules inside a policy, policies
//! and policy sets inside a policy set.

#![deny(unsafe_code)]

use std::sync::Arc;

use thiserror::Error;

use aegis_core::{
    Effect, EvalResult, ExtendedDecision, PepAction, PolicyIdentifier,
};
use eval::EvaluationContext;

mod first;
mod only_one;
mod overrides;
mod unless;

/// An unrecognized combining-algorithm identifier; fatal at load time.
#[derive(Debug, Clone, Error)]
#[error("unknown combining algorithm `{id}`")]
pub struct UnknownCombiningAlg {
    /// The identifier as written in the policy.
    pub id: String,
}

const ALG_PREFIXES: [&str; 6] = [
    "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:",
    "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:",
    "urn:oasis:names:tc:xacml:1.1:rule-combining-algorithm:",
    "urn:oasis:names:tc:xacml:1.1:policy-combining-algorithm:",
    "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:",
    "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:",
];

/// The combining algorithms recognized by the engine.
///
/// The 1.0/1.1 (legacy) deny- and permit-overrides identifiers resolve to
/// the 3.0 semantics; the ordered variants share their unordered
/// evaluator, whose child walk already follows declared order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombiningAlgId {
    /// First Deny wins.
    DenyOverrides,
    /// First Permit wins.
    PermitOverrides,
    /// Deny-overrides with mandated declaration order.
    OrderedDenyOverrides,
    /// Permit-overrides with mandated declaration order.
    OrderedPermitOverrides,
    /// First non-NotApplicable child decides.
    FirstApplicable,
    /// Exactly one child may be applicable by target.
    OnlyOneApplicable,
    /// Permit if any child permits, else Deny.
    DenyUnlessPermit,
    /// Deny if any child denies, else Permit.
    PermitUnlessDeny,
}

impl CombiningAlgId {
    fn from_short_name(name: &str) -> Option<Self> {
        match name {
            "deny-overrides" => Some(Self::DenyOverrides),
            "permit-overrides" => Some(Self::PermitOverrides),
            "ordered-deny-overrides" => Some(Self::OrderedDenyOverrides),
            "ordered-permit-overrides" => Some(Self::OrderedPermitOverrides),
            "first-applicable" => Some(Self::FirstApplicable),
            "only-one-applicable" => Some(Self::OnlyOneApplicable),
            "deny-unless-permit" => Some(Self::DenyUnlessPermit),
            "permit-unless-deny" => Some(Self::PermitUnlessDeny),
            _ => None,
        }
    }

    /// Resolves a full URI or a bare short name.
    pub fn resolve(id: &str) -> Result<Self, UnknownCombiningAlg> {
        let short = ALG_PREFIXES
            .iter()
            .find_map(|p| id.strip_prefix(p))
            .unwrap_or(id);
        Self::from_short_name(short).ok_or_else(|| UnknownCombiningAlg { id: id.to_owned() })
    }

    /// The canonical 3.0 identifier URI (rule-combining namespace).
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::DenyOverrides => {
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:deny-overrides"
            }
            Self::PermitOverrides => {
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:permit-overrides"
            }
            Self::OrderedDenyOverrides => {
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:ordered-deny-overrides"
            }
            Self::OrderedPermitOverrides => {
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:ordered-permit-overrides"
            }
            Self::FirstApplicable => {
                "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:first-applicable"
            }
            Self::OnlyOneApplicable => {
                "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:only-one-applicable"
            }
            Self::DenyUnlessPermit => {
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:deny-unless-permit"
            }
            Self::PermitUnlessDeny => {
                "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:permit-unless-deny"
            }
        }
    }
}

/// A combinable child: a rule, policy, or policy set evaluator.
///
/// `evaluate` appends the child's PEP actions to `pep` and, for policies,
/// its identifier to `applicable` when its decision is not NotApplicable.
/// The hint methods drive the rule-specialized optimizations; the policy
/// implementations keep the neutral defaults.
pub trait Decidable: Send + Sync {
    /// Evaluates the child under the request context.
    fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        pep: &mut Vec<PepAction>,
        applicable: Option<&mut Vec<PolicyIdentifier>>,
    ) -> ExtendedDecision;

    /// Target-only applicability, consulted by only-one-applicable.
    fn matches_target(&self, ctx: &EvaluationContext<'_>) -> EvalResult<bool>;

    /// The child's fixed effect, when it is a rule.
    fn effect_hint(&self) -> Option<Effect> {
        None
    }

    /// True when the child has neither target nor condition.
    fn is_always_applicable(&self) -> bool {
        false
    }

    /// True when the child always yields its effect with no PEP actions.
    fn is_empty_equivalent(&self) -> bool {
        false
    }

    /// True when the child can emit PEP actions.
    fn has_pep_actions(&self) -> bool {
        true
    }
}

enum Kind<E> {
    Overrides(overrides::Overrides<E>),
    FirstApplicable(first::FirstApplicable<E>),
    OnlyOneApplicable(only_one::OnlyOneApplicable<E>),
    Unless(unless::Unless<E>),
}

/// An immutable combining evaluator over an ordered child list.
pub struct Combiner<E> {
    kind: Kind<E>,
}

impl<E: Decidable> Combiner<E> {
    /// Builds the evaluator, applying the algorithm's static
    /// optimizations to the child list.
    #[must_use]
    pub fn new(alg: CombiningAlgId, children: Vec<Arc<E>>) -> Self {
        let kind = match alg {
            CombiningAlgId::DenyOverrides | CombiningAlgId::OrderedDenyOverrides => {
                Kind::Overrides(overrides::Overrides::new(Effect::Deny, children))
            }
            CombiningAlgId::PermitOverrides | CombiningAlgId::OrderedPermitOverrides => {
                Kind::Overrides(overrides::Overrides::new(Effect::Permit, children))
            }
            CombiningAlgId::FirstApplicable => {
                Kind::FirstApplicable(first::FirstApplicable::new(children))
            }
            CombiningAlgId::OnlyOneApplicable => {
                Kind::OnlyOneApplicable(only_one::OnlyOneApplicable::new(children))
            }
            CombiningAlgId::DenyUnlessPermit => {
                Kind::Unless(unless::Unless::new(Effect::Permit, children))
            }
            CombiningAlgId::PermitUnlessDeny => {
                Kind::Unless(unless::Unless::new(Effect::Deny, children))
            }
        };
        Self { kind }
    }

    /// Reduces the children to one extended decision, appending the PEP
    /// actions that survive effect filtering to `pep`.
    pub fn evaluate(
        &self,
        ctx: &EvaluationContext<'_>,
        pep: &mut Vec<PepAction>,
        applicable: Option<&mut Vec<PolicyIdentifier>>,
    ) -> ExtendedDecision {
        match &self.kind {
            Kind::Overrides(alg) => alg.evaluate(ctx, pep, applicable),
            Kind::FirstApplicable(alg) => alg.evaluate(ctx, pep, applicable),
            Kind::OnlyOneApplicable(alg) => alg.evaluate(ctx, pep, applicable),
            Kind::Unless(alg) => alg.evaluate(ctx, pep, applicable),
        }
    }
}
