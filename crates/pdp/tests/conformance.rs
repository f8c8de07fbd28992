//! Algorithm behavior observed through full policy documents.

use aegis_core::{Decision, IndeterminateKind, StatusCode};
use pdp::{Pdp, PdpConfig, RequestDef};

fn pdp(policy: &str) -> Pdp {
    Pdp::from_yaml_str(policy, PdpConfig::default()).expect("policy compiles")
}

fn role_request(role: &str) -> RequestDef {
    serde_yaml::from_str(&format!(
        r"
return-policy-id-list: true
attributes:
  - category: subject
    attributes:
      - id: role
        type: string
        values: [{role}]
"
    ))
    .expect("request parses")
}

#[test]
fn first_applicable_stops_at_the_first_applicable_rule() {
    let pdp = pdp(r"
id: ordered
combining-alg: first-applicable
rules:
  - id: deny-auditors
    effect: deny
    target:
      any-of:
        - all-of:
            - match:
                - function: string-equal
                  value: { type: string, value: auditor }
                  designator: { category: subject, id: role, type: string }
  - id: allow-everyone
    effect: permit
  - id: deny-everyone
    effect: deny
");
    // The always-applicable permit shadows the trailing deny.
    let result = pdp.evaluate_request(&role_request("admin"));
    assert_eq!(result.decision(), Decision::Permit);
    // The first rule still applies to auditors.
    let result = pdp.evaluate_request(&role_request("auditor"));
    assert_eq!(result.decision(), Decision::Deny);
}

#[test]
fn policy_target_failure_inherits_the_combined_flavor() {
    let pdp = pdp(r"
id: gated
combining-alg: first-applicable
policies:
  - policy:
      id: inner
      combining-alg: first-applicable
      target:
        any-of:
          - all-of:
              - match:
                  - function: string-equal
                    value: { type: string, value: admin }
                    designator:
                      category: subject
                      id: clearance
                      type: string
                      must-be-present: true
      rules:
        - id: allow
          effect: permit
");
    // The target designator is required but absent, and the rules would
    // have permitted, so the policy is Indeterminate{P}.
    let result = pdp.evaluate_request(&role_request("admin"));
    assert_eq!(result.decision(), Decision::Indeterminate);
    assert_eq!(result.indeterminate_kind(), Some(IndeterminateKind::Permit));
    assert_eq!(result.status().code, StatusCode::MissingAttribute);
}

#[test]
fn only_one_applicable_selects_by_target() {
    let policy = r"
id: router
combining-alg: only-one-applicable
policies:
  - policy:
      id: for-admins
      combining-alg: first-applicable
      target:
        any-of:
          - all-of:
              - match:
                  - function: string-equal
                    value: { type: string, value: admin }
                    designator: { category: subject, id: role, type: string }
      rules:
        - id: allow
          effect: permit
  - policy:
      id: for-auditors
      combining-alg: first-applicable
      target:
        any-of:
          - all-of:
              - match:
                  - function: string-equal
                    value: { type: string, value: auditor }
                    designator: { category: subject, id: role, type: string }
      rules:
        - id: refuse
          effect: deny
";
    let pdp = pdp(policy);
    assert_eq!(pdp.evaluate_request(&role_request("admin")).decision(), Decision::Permit);
    assert_eq!(pdp.evaluate_request(&role_request("auditor")).decision(), Decision::Deny);
    assert_eq!(
        pdp.evaluate_request(&role_request("guest")).decision(),
        Decision::NotApplicable
    );
}

#[test]
fn only_one_applicable_rejects_overlap() {
    let pdp = pdp(r"
id: overlapping
combining-alg: only-one-applicable
policies:
  - policy:
      id: A
      combining-alg: first-applicable
      rules: [{ id: a, effect: permit }]
  - policy:
      id: B
      combining-alg: first-applicable
      rules: [{ id: b, effect: deny }]
");
    let result = pdp.evaluate_request(&role_request("anyone"));
    assert_eq!(result.decision(), Decision::Indeterminate);
    assert_eq!(result.indeterminate_kind(), Some(IndeterminateKind::DenyPermit));
}

#[test]
fn only_one_applicable_over_rules_is_a_load_error() {
    let result = Pdp::from_yaml_str(
        r"
id: invalid
combining-alg: only-one-applicable
rules: [{ id: r, effect: permit }]
",
        PdpConfig::default(),
    );
    assert!(result.is_err());
}

#[test]
fn ordered_deny_overrides_resolves_like_deny_overrides() {
    let pdp = pdp(r"
id: ordered-strict
combining-alg: ordered-deny-overrides
rules:
  - id: allow
    effect: permit
  - id: forbid
    effect: deny
");
    assert_eq!(pdp.evaluate_request(&role_request("x")).decision(), Decision::Deny);
}

#[test]
fn legacy_identifiers_resolve() {
    let pdp = pdp(r"
id: legacy
combining-alg: 'urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:deny-overrides'
rules:
  - id: allow
    effect: permit
");
    assert_eq!(pdp.evaluate_request(&role_request("x")).decision(), Decision::Permit);
}

#[test]
fn indeterminate_d_with_a_permit_widens_to_dp() {
    let pdp = pdp(r"
id: widening
combining-alg: deny-overrides
rules:
  - id: brittle-deny
    effect: deny
    condition:
      apply:
        function: string-equal
        args:
          - apply:
              function: string-one-and-only
              args:
                - designator: { category: subject, id: missing, type: string }
          - value: { type: string, value: x }
  - id: allow
    effect: permit
");
    let result = pdp.evaluate_request(&role_request("admin"));
    assert_eq!(result.decision(), Decision::Indeterminate);
    assert_eq!(result.indeterminate_kind(), Some(IndeterminateKind::DenyPermit));
}
