//! Policy Decision Point: compiles policy documents into immutable
//! evaluator trees and evaluates preprocessed requests against them.

#![deny(unsafe_code)]

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info_span};

use aegis_core::{DecisionResult, IndeterminateKind};
use combining::Decidable;
use eval::{EvaluationContext, FunctionRegistry, IndividualDecisionRequest, Limits, XPathEvaluator};

pub mod index;
pub mod loader;
pub mod pep;
pub mod policy;
pub mod request;
pub mod rule;
pub mod target;

pub use index::PolicyMap;
pub use loader::{LoadError, PolicyRootDef, RootEvaluator};
pub use request::{preprocess, IssuerMode, RequestDef};

/// PDP construction options.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PdpConfig {
    /// Issuer matching mode for the request preprocessor.
    pub issuer_mode: IssuerMode,
    /// Evaluation resource limits.
    pub limits: Limits,
}

/// An immutable policy decision point. Cheap to share across threads;
/// each evaluation builds its own single-threaded context.
pub struct Pdp {
    root: RootEvaluator,
    config: PdpConfig,
    xpath: Option<Arc<dyn XPathEvaluator>>,
}

impl std::fmt::Debug for Pdp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pdp")
            .field("root", &"<RootEvaluator>")
            .field("config", &self.config)
            .field("xpath", &self.xpath.as_ref().map(|_| "<dyn XPathEvaluator>"))
            .finish()
    }
}

impl Pdp {
    /// Compiles a parsed policy document with the standard function
    /// library.
    pub fn new(root: &PolicyRootDef, config: PdpConfig) -> Result<Self, LoadError> {
        Self::with_registry(root, FunctionRegistry::standard(), config)
    }

    /// Compiles a parsed policy document against a custom registry.
    pub fn with_registry(
        root: &PolicyRootDef,
        registry: &FunctionRegistry,
        config: PdpConfig,
    ) -> Result<Self, LoadError> {
        let root = loader::compile(root, registry)?;
        Ok(Self { root, config, xpath: None })
    }

    /// Parses and compiles a YAML (or JSON) policy document.
    pub fn from_yaml_str(document: &str, config: PdpConfig) -> Result<Self, LoadError> {
        let root: PolicyRootDef = serde_yaml::from_str(document)?;
        Self::new(&root, config)
    }

    /// Loads a policy document from a file.
    pub fn from_yaml_path(path: impl AsRef<Path>, config: PdpConfig) -> Result<Self, LoadError> {
        let document = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&document, config)
    }

    /// Installs an XPath evaluator for `AttributeSelector` support.
    #[must_use]
    pub fn with_xpath(mut self, xpath: Arc<dyn XPathEvaluator>) -> Self {
        self.xpath = Some(xpath);
        self
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &PdpConfig {
        &self.config
    }

    /// Evaluates a preprocessed request.
    #[must_use]
    pub fn evaluate(&self, request: &IndividualDecisionRequest) -> DecisionResult {
        let span = info_span!("pdp.evaluate");
        let _guard = span.enter();

        let mut ctx = EvaluationContext::new(request, self.config.limits);
        if let Some(xpath) = &self.xpath {
            ctx = ctx.with_xpath(xpath.as_ref());
        }

        let mut pep = Vec::new();
        let mut applicable = request.return_policy_id_list().then(Vec::new);
        let decision = match &self.root {
            RootEvaluator::Policy(p) => p.evaluate(&ctx, &mut pep, applicable.as_mut()),
            RootEvaluator::PolicySet(s) => s.evaluate(&ctx, &mut pep, applicable.as_mut()),
        };
        debug!(decision = ?decision.decision(), pep_actions = pep.len(), "request evaluated");
        DecisionResult::from_extended(decision, pep, applicable.unwrap_or_default())
    }

    /// Preprocesses and evaluates a request document. Preprocessing
    /// failures surface as an Indeterminate{DP} result.
    #[must_use]
    pub fn evaluate_request(&self, request: &RequestDef) -> DecisionResult {
        match request::preprocess(request, self.config.issuer_mode, self.config.limits) {
            Ok(preprocessed) => self.evaluate(&preprocessed),
            Err(error) => {
                DecisionResult::indeterminate(IndeterminateKind::DenyPermit, &error, Vec::new())
            }
        }
    }

    /// The policy or policy-set id at the root of the tree.
    #[must_use]
    pub fn root_id(&self) -> &str {
        match &self.root {
            RootEvaluator::Policy(p) => p.id(),
            RootEvaluator::PolicySet(s) => s.id(),
        }
    }
}
