//! Command-line PDP: evaluate request documents against a policy document.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::json;

use pdp::{Pdp, PdpConfig, PolicyRootDef, RequestDef};
use telemetry::DecisionMetrics;

#[derive(Parser, Debug)]
#[command(name = "aegis-pdp", about = "Evaluate XACML requests against a policy document")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one or more request documents and print decisions as JSON
    Eval {
        #[arg(short, long)]
        policy: PathBuf,
        /// Request documents (YAML or JSON), evaluated in order
        #[arg(required = true)]
        requests: Vec<PathBuf>,
        /// Optional PDP configuration document
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Pretty-print the decision JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,
        /// Print a decision-count summary after the last request
        #[arg(long, default_value_t = false)]
        stats: bool,
    },
    /// Compile a policy document and report load errors without evaluating
    Check {
        #[arg(short, long)]
        policy: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List the policies and versions defined in a document
    Inspect {
        #[arg(short, long)]
        policy: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_plain_logging();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Eval { policy, requests, config, pretty, stats } => {
            cmd_eval(&policy, &requests, config.as_deref(), pretty, stats)?;
        }
        Command::Check { policy, config } => cmd_check(&policy, config.as_deref())?,
        Command::Inspect { policy } => cmd_inspect(&policy)?,
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PdpConfig, Box<dyn std::error::Error>> {
    match path {
        None => Ok(PdpConfig::default()),
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_yaml::from_str(&text)?)
        }
    }
}

fn load_request(path: &Path) -> Result<RequestDef, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&text)?)
}

fn cmd_eval(
    policy: &Path,
    requests: &[PathBuf],
    config: Option<&Path>,
    pretty: bool,
    stats: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let pdp = Pdp::from_yaml_path(policy, config)?;
    let metrics = DecisionMetrics::new();

    for path in requests {
        let request = load_request(path)?;
        let result = pdp.evaluate_request(&request);
        metrics.record(result.decision());
        let line = if pretty {
            serde_json::to_string_pretty(&result)?
        } else {
            serde_json::to_string(&result)?
        };
        println!("{line}");
    }

    if stats {
        let (permit, deny, not_applicable, indeterminate) = metrics.snapshot();
        let summary = json!({
            "permit": permit,
            "deny": deny,
            "not_applicable": not_applicable,
            "indeterminate": indeterminate,
        });
        println!("{summary}");
    }
    Ok(())
}

fn cmd_check(policy: &Path, config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let pdp = Pdp::from_yaml_path(policy, config)?;
    println!("ok: root {}", pdp.root_id());
    Ok(())
}

fn cmd_inspect(policy: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(policy)?;
    let root: PolicyRootDef = serde_yaml::from_str(&text)?;
    let mut entries = Vec::new();
    collect(&root, &mut entries);
    let out = json!({
        "policies": entries
            .iter()
            .map(|(kind, id, version)| json!({ "kind": kind, "id": id, "version": version }))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn collect(root: &PolicyRootDef, out: &mut Vec<(&'static str, String, String)>) {
    match root {
        PolicyRootDef::Policy(p) => out.push(("policy", p.id.clone(), p.version.to_string())),
        PolicyRootDef::Set(s) => collect_set(s, out),
    }
}

fn collect_set(
    set: &pdp::loader::PolicySetDef,
    out: &mut Vec<(&'static str, String, String)>,
) {
    out.push(("policy-set", set.id.clone(), set.version.to_string()));
    for child in &set.policies {
        match child {
            pdp::loader::PolicyElementDef::Policy(p) => {
                out.push(("policy", p.id.clone(), p.version.to_string()));
            }
            pdp::loader::PolicyElementDef::PolicySet(s) => collect_set(s, out),
            pdp::loader::PolicyElementDef::PolicyRef(_)
            | pdp::loader::PolicyElementDef::PolicySetRef(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const POLICY: &str = r"
id: root
combining-alg: deny-unless-permit
policies:
  - policy:
      id: P1
      combining-alg: first-applicable
      rules:
        - id: allow-admins
          effect: permit
          condition:
            apply:
              function: any-of
              args:
                - function-ref: string-equal
                - value: { type: string, value: admin }
                - designator: { category: subject, id: role, type: string }
";

    const REQUEST: &str = r"
return-policy-id-list: true
attributes:
  - category: subject
    attributes:
      - id: role
        type: string
        values: [admin, user]
";

    #[test]
    fn eval_prints_a_decision() {
        let dir = tempfile::tempdir().unwrap();
        let policy = dir.path().join("policy.yaml");
        let request = dir.path().join("request.yaml");
        fs::write(&policy, POLICY).unwrap();
        fs::write(&request, REQUEST).unwrap();
        cmd_eval(&policy, &[request], None, false, true).unwrap();
    }

    #[test]
    fn check_accepts_a_valid_policy() {
        let dir = tempfile::tempdir().unwrap();
        let policy = dir.path().join("policy.yaml");
        fs::write(&policy, POLICY).unwrap();
        cmd_check(&policy, None).unwrap();
    }

    #[test]
    fn check_rejects_an_unknown_function() {
        let dir = tempfile::tempdir().unwrap();
        let policy = dir.path().join("policy.yaml");
        fs::write(&policy, POLICY.replace("string-equal", "no-such-function")).unwrap();
        assert!(cmd_check(&policy, None).is_err());
    }

    #[test]
    fn inspect_lists_policies() {
        let dir = tempfile::tempdir().unwrap();
        let policy = dir.path().join("policy.yaml");
        fs::write(&policy, POLICY).unwrap();
        cmd_inspect(&policy).unwrap();
    }
}
