//! End-to-end decisions over YAML policy and request documents.

use aegis_core::{Decision, StatusCode};
use pdp::{Pdp, PdpConfig, RequestDef};

fn pdp(policy: &str) -> Pdp {
    Pdp::from_yaml_str(policy, PdpConfig::default()).expect("policy compiles")
}

fn request(yaml: &str) -> RequestDef {
    serde_yaml::from_str(yaml).expect("request parses")
}

fn role_request(role: &str) -> RequestDef {
    request(&format!(
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
}

const MAIN_POLICY: &str = r"
id: access-control
combining-alg: deny-unless-permit
policies:
  - policy:
      id: P-main
      version: '1.3'
      combining-alg: deny-unless-permit
      rules:
        - id: auditors-allowed
          effect: permit
          target:
            any-of:
              - all-of:
                  - match:
                      - function: string-equal
                        value: { type: string, value: auditor }
                        designator: { category: subject, id: role, type: string }
        - id: admins-allowed
          effect: permit
          target:
            any-of:
              - all-of:
                  - match:
                      - function: string-equal
                        value: { type: string, value: admin }
                        designator: { category: subject, id: role, type: string }
          obligations:
            - id: urn:example:obligation:audit
              fulfill-on: permit
              assignments:
                - attribute-id: urn:example:role
                  expr:
                    designator: { category: subject, id: role, type: string }
";

#[test]
fn matching_rule_permits_with_obligations() {
    let pdp = pdp(MAIN_POLICY);
    let result = pdp.evaluate_request(&role_request("admin"));
    assert_eq!(result.decision(), Decision::Permit);

    let actions = result.pep_actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].id, "urn:example:obligation:audit");
    assert!(actions[0].obligatory);
    assert_eq!(actions[0].attributes.len(), 1);
    assert_eq!(actions[0].attributes[0].value.canonical(), "admin");

    let ids: Vec<&str> = result.applicable_policies().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["P-main", "access-control"]);
    assert_eq!(result.applicable_policies()[0].version.to_string(), "1.3");
}

#[test]
fn unmatched_request_falls_back_to_deny_without_actions() {
    let pdp = pdp(MAIN_POLICY);
    let result = pdp.evaluate_request(&role_request("guest"));
    assert_eq!(result.decision(), Decision::Deny);
    assert!(result.pep_actions().is_empty());
}

#[test]
fn permit_unless_deny_over_zero_rules_permits() {
    let pdp = pdp(r"
id: empty
combining-alg: permit-unless-deny
rules: []
");
    let result = pdp.evaluate_request(&role_request("anyone"));
    assert_eq!(result.decision(), Decision::Permit);
    assert!(result.pep_actions().is_empty());
}

#[test]
fn not_applicable_carries_nothing() {
    let pdp = pdp(r"
id: narrow
combining-alg: first-applicable
rules:
  - id: auditors-only
    effect: permit
    target:
      any-of:
        - all-of:
            - match:
                - function: string-equal
                  value: { type: string, value: auditor }
                  designator: { category: subject, id: role, type: string }
");
    let result = pdp.evaluate_request(&role_request("guest"));
    assert_eq!(result.decision(), Decision::NotApplicable);
    assert!(result.pep_actions().is_empty());
    assert!(result.applicable_policies().is_empty());
}

#[test]
fn failing_condition_surfaces_the_effect_flavor() {
    let pdp = pdp(r"
id: brittle
combining-alg: first-applicable
rules:
  - id: requires-single-role
    effect: permit
    condition:
      apply:
        function: string-equal
        args:
          - apply:
              function: string-one-and-only
              args:
                - designator: { category: subject, id: missing, type: string }
          - value: { type: string, value: admin }
");
    let result = pdp.evaluate_request(&role_request("admin"));
    assert_eq!(result.decision(), Decision::Indeterminate);
    assert_eq!(
        result.indeterminate_kind(),
        Some(aegis_core::IndeterminateKind::Permit)
    );
    assert_eq!(result.status().code, StatusCode::ProcessingError);
    assert!(result.pep_actions().is_empty());
}

#[test]
fn variables_are_resolved_and_memoized() {
    let pdp = pdp(r"
id: with-vars
combining-alg: first-applicable
variables:
  - id: is-admin
    expr:
      apply:
        function: any-of
        args:
          - function-ref: string-equal
          - value: { type: string, value: admin }
          - designator: { category: subject, id: role, type: string }
rules:
  - id: admin-permit
    effect: permit
    condition:
      var-ref: is-admin
  - id: everyone-else
    effect: deny
");
    assert_eq!(pdp.evaluate_request(&role_request("admin")).decision(), Decision::Permit);
    assert_eq!(pdp.evaluate_request(&role_request("guest")).decision(), Decision::Deny);
}

#[test]
fn deny_overrides_drops_permit_side_actions() {
    let pdp = pdp(r"
id: strict
combining-alg: deny-overrides
rules:
  - id: allow-with-advice
    effect: permit
    advice:
      - id: urn:example:advice:welcome
        fulfill-on: permit
  - id: always-deny
    effect: deny
    obligations:
      - id: urn:example:obligation:alert
        fulfill-on: deny
");
    let result = pdp.evaluate_request(&role_request("admin"));
    assert_eq!(result.decision(), Decision::Deny);
    let actions = result.pep_actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].id, "urn:example:obligation:alert");
}

#[test]
fn malformed_request_is_indeterminate_not_a_panic() {
    let pdp = pdp(MAIN_POLICY);
    let bad = request(
        r"
attributes:
  - category: subject
  - category: subject
",
    );
    let result = pdp.evaluate_request(&bad);
    assert_eq!(result.decision(), Decision::Indeterminate);
    assert_eq!(result.status().code, StatusCode::SyntaxError);
}

#[test]
fn invalid_policies_fail_at_load_time() {
    // Unknown function.
    assert!(Pdp::from_yaml_str(
        &MAIN_POLICY.replace("string-equal", "string-eq"),
        PdpConfig::default()
    )
    .is_err());
    // Argument type mismatch: integer literal against a string designator.
    assert!(Pdp::from_yaml_str(
        &MAIN_POLICY.replace("{ type: string, value: admin }", "{ type: integer, value: 7 }"),
        PdpConfig::default()
    )
    .is_err());
    // Non-boolean condition.
    assert!(Pdp::from_yaml_str(
        r"
id: bad
combining-alg: first-applicable
rules:
  - id: r
    effect: permit
    condition:
      value: { type: string, value: nope }
",
        PdpConfig::default()
    )
    .is_err());
}
