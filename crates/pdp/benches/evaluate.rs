use criterion::{criterion_group, criterion_main, Criterion};
use pdp::{preprocess, IssuerMode, Pdp, PdpConfig, RequestDef};

const POLICY: &str = r"
id: bench-root
combining-alg: deny-unless-permit
policies:
  - policy:
      id: bench-policy
      combining-alg: first-applicable
      rules:
        - id: deny-guests
          effect: deny
          target:
            any-of:
              - all-of:
                  - match:
                      - function: string-equal
                        value: { type: string, value: guest }
                        designator: { category: subject, id: role, type: string }
        - id: allow-known-roles
          effect: permit
          condition:
            apply:
              function: any-of
              args:
                - function-ref: string-equal
                - apply:
                    function: string-one-and-only
                    args:
                      - designator: { category: subject, id: role, type: string }
                - apply:
                    function: string-bag
                    args:
                      - value: { type: string, value: admin }
                      - value: { type: string, value: operator }
                      - value: { type: string, value: auditor }
";

const REQUEST: &str = r"
return-policy-id-list: true
attributes:
  - category: subject
    attributes:
      - id: role
        type: string
        values: [operator]
";

fn bench_evaluate(c: &mut Criterion) {
    let pdp = Pdp::from_yaml_str(POLICY, PdpConfig::default()).expect("policy compiles");
    let def: RequestDef = serde_yaml::from_str(REQUEST).expect("request parses");
    let request = preprocess(&def, IssuerMode::Lax, PdpConfig::default().limits)
        .expect("request preprocesses");

    c.bench_function("evaluate_preprocessed", |b| {
        b.iter(|| pdp.evaluate(&request))
    });

    c.bench_function("preprocess_and_evaluate", |b| {
        b.iter(|| pdp.evaluate_request(&def))
    });
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
