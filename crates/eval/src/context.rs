//! Per-request evaluation context and the preprocessed request it reads.

use std::cell::RefCell;
use std::collections::HashMap;

use serde::Deserialize;

use aegis_core::{AttributeFqn, Bag, Datatype};

use crate::expr::Value;

/// Resource limits enforced during evaluation.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Limits {
    /// Largest admissible attribute bag; exceeding it is a processing
    /// error. `None` leaves bags unbounded.
    pub max_bag_size: Option<usize>,
    /// Largest Cartesian product a higher-order bag function may
    /// enumerate.
    pub max_product_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_bag_size: None, max_product_size: 100_000 }
    }
}

/// Pluggable XPath evaluation over a category's XML content.
///
/// The engine ships no XPath implementation; installing one makes
/// `AttributeSelector` expressions usable. Each selected node is returned
/// as its string value and converted to the selector's datatype.
pub trait XPathEvaluator: Send + Sync {
    /// Evaluates `path` against `content`, returning the string value of
    /// every selected node.
    fn select(&self, content: &str, path: &str) -> Result<Vec<String>, String>;
}

/// A preprocessed request: immutable attribute bags keyed by
/// fully-qualified name, plus per-category extra content.
///
/// Built by the request preprocessor, which enforces the structural
/// constraints (category uniqueness, duplicate-attribute handling, bag
/// size limits) before evaluation begins.
#[derive(Debug, Default)]
pub struct IndividualDecisionRequest {
    attributes: HashMap<AttributeFqn, Bag>,
    content: HashMap<String, String>,
    return_policy_id_list: bool,
}

impl IndividualDecisionRequest {
    /// Assembles a request from frozen parts.
    #[must_use]
    pub fn new(
        attributes: HashMap<AttributeFqn, Bag>,
        content: HashMap<String, String>,
        return_policy_id_list: bool,
    ) -> Self {
        Self { attributes, content, return_policy_id_list }
    }

    /// The bag registered under the exact name, if any.
    #[must_use]
    pub fn attribute_bag(&self, fqn: &AttributeFqn) -> Option<&Bag> {
        self.attributes.get(fqn)
    }

    /// The XML content attached to a category, if any.
    #[must_use]
    pub fn content(&self, category: &str) -> Option<&str> {
        self.content.get(category).map(String::as_str)
    }

    /// Whether the caller asked for the applicable-policy list.
    #[must_use]
    pub const fn return_policy_id_list(&self) -> bool {
        self.return_policy_id_list
    }
}

/// Mutable per-request state: the request itself plus memoization for
/// variable bindings. Created per request, never shared across threads, so
/// plain `RefCell` cells suffice.
pub struct EvaluationContext<'r> {
    request: Option<&'r IndividualDecisionRequest>,
    variables: RefCell<HashMap<String, Value>>,
    selector_results: RefCell<HashMap<(String, String, Datatype), Bag>>,
    xpath: Option<&'r dyn XPathEvaluator>,
    limits: Limits,
}

impl<'r> EvaluationContext<'r> {
    /// A context for one request evaluation.
    #[must_use]
    pub fn new(request: &'r IndividualDecisionRequest, limits: Limits) -> Self {
        Self {
            request: Some(request),
            variables: RefCell::new(HashMap::new()),
            selector_results: RefCell::new(HashMap::new()),
            xpath: None,
            limits,
        }
    }

    /// Attaches an XPath evaluator for `AttributeSelector` expressions.
    #[must_use]
    pub fn with_xpath(mut self, xpath: &'r dyn XPathEvaluator) -> Self {
        self.xpath = Some(xpath);
        self
    }

    /// A request-less context used for constant folding at load time.
    /// Request-dependent expressions fail under it, leaving them unfolded.
    #[must_use]
    pub fn constant_folding() -> EvaluationContext<'static> {
        EvaluationContext {
            request: None,
            variables: RefCell::new(HashMap::new()),
            selector_results: RefCell::new(HashMap::new()),
            xpath: None,
            limits: Limits::default(),
        }
    }

    /// The request being evaluated; `None` inside constant folding.
    #[must_use]
    pub const fn request(&self) -> Option<&'r IndividualDecisionRequest> {
        self.request
    }

    /// The installed XPath evaluator, if any.
    #[must_use]
    pub const fn xpath(&self) -> Option<&'r dyn XPathEvaluator> {
        self.xpath
    }

    /// The active resource limits.
    #[must_use]
    pub const fn limits(&self) -> Limits {
        self.limits
    }

    /// The memoized value of a variable, if already evaluated.
    #[must_use]
    pub fn variable(&self, key: &str) -> Option<Value> {
        self.variables.borrow().get(key).cloned()
    }

    /// Memoizes a variable value for the remainder of the request.
    pub fn set_variable(&self, key: impl Into<String>, value: Value) {
        self.variables.borrow_mut().insert(key.into(), value);
    }

    /// The memoized bag for a selector, if it already ran this request.
    #[must_use]
    pub fn selector_result(&self, category: &str, path: &str, datatype: Datatype) -> Option<Bag> {
        self.selector_results
            .borrow()
            .get(&(category.to_owned(), path.to_owned(), datatype))
            .cloned()
    }

    /// Memoizes a selector's frozen bag for the remainder of the request.
    pub fn cache_selector_result(&self, category: &str, path: &str, bag: Bag) {
        self.selector_results
            .borrow_mut()
            .insert((category.to_owned(), path.to_owned(), bag.datatype()), bag);
    }
}
