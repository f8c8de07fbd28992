//! Request documents and the preprocessor that freezes them into
//! immutable attribute bags.

use std::collections::HashMap;

use serde::Deserialize;

use aegis_core::{
    AttributeFqn, AttributeValue, Bag, Datatype, EvalResult, IndeterminateError,
};
use eval::{IndividualDecisionRequest, Limits};

/// How attribute issuers participate in designator matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssuerMode {
    /// A designator without issuer matches request attributes with any
    /// issuer (their bags are unioned).
    #[default]
    Lax,
    /// Issuer must match exactly; missing matches only missing. Duplicate
    /// attribute elements are rejected instead of merged.
    Strict,
}

/// A parsed (but not yet validated) request document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RequestDef {
    /// Whether the response should list the applicable policies.
    #[serde(default)]
    pub return_policy_id_list: bool,
    /// One group per attribute category.
    #[serde(default)]
    pub attributes: Vec<AttributesDef>,
}

/// The attributes of one category.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AttributesDef {
    /// Category URI.
    pub category: String,
    /// Optional XML content for selector evaluation.
    #[serde(default)]
    pub content: Option<String>,
    /// Attribute elements.
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
}

/// One attribute element: id, optional issuer, datatype, and values.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AttributeDef {
    /// Attribute id URI.
    pub id: String,
    /// Optional issuer.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Datatype of every value, as URI or short name.
    #[serde(rename = "type")]
    pub datatype: String,
    /// The attribute values.
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
}

/// Validates a request document and freezes it into an
/// [`IndividualDecisionRequest`].
///
/// Structural violations (duplicate categories, duplicate attributes in
/// strict mode, unparseable values) are syntax errors; exceeding the bag
/// size limit is a processing error. Either aborts the whole request.
pub fn preprocess(
    def: &RequestDef,
    mode: IssuerMode,
    limits: Limits,
) -> EvalResult<IndividualDecisionRequest> {
    let mut content: HashMap<String, String> = HashMap::new();
    let mut staged: HashMap<AttributeFqn, (Datatype, Vec<AttributeValue>)> = HashMap::new();
    // Document order of first appearance, so frozen bags are reproducible.
    let mut order: Vec<AttributeFqn> = Vec::new();

    for group in &def.attributes {
        let previous = content.insert(
            group.category.clone(),
            group.content.clone().unwrap_or_default(),
        );
        if previous.is_some() {
            return Err(IndeterminateError::syntax(format!(
                "category `{}` appears more than once in the request",
                group.category
            )));
        }

        for attribute in &group.attributes {
            let datatype = Datatype::resolve(&attribute.datatype).ok_or_else(|| {
                IndeterminateError::syntax(format!(
                    "unknown datatype `{}` for attribute `{}`",
                    attribute.datatype, attribute.id
                ))
            })?;
            let fqn = AttributeFqn::new(
                group.category.clone(),
                attribute.id.clone(),
                attribute.issuer.clone(),
            );
            let mut values = Vec::with_capacity(attribute.values.len());
            for raw in &attribute.values {
                let value = AttributeValue::parse_json(datatype, raw)
                    .map_err(|e| IndeterminateError::syntax(e.to_string()))?;
                values.push(value);
            }

            match staged.get_mut(&fqn) {
                None => {
                    order.push(fqn.clone());
                    staged.insert(fqn, (datatype, values));
                }
                Some((existing, _)) if *existing != datatype => {
                    return Err(IndeterminateError::syntax(format!(
                        "attribute `{fqn}` declared with conflicting datatypes"
                    )));
                }
                Some(_) if mode == IssuerMode::Strict => {
                    return Err(IndeterminateError::syntax(format!(
                        "duplicate attribute `{fqn}` in strict mode"
                    )));
                }
                Some((_, merged)) => merged.append(&mut values),
            }
        }
    }

    // Lax mode: index the union across issuers under the issuer-less name,
    // so a designator without issuer sees every matching attribute.
    if mode == IssuerMode::Lax {
        let issued: Vec<AttributeFqn> =
            order.iter().filter(|f| f.issuer().is_some()).cloned().collect();
        for fqn in issued {
            let bare = fqn.without_issuer();
            let Some((datatype, values)) = staged.get(&fqn).map(|(d, v)| (*d, v.clone())) else {
                continue;
            };
            match staged.get_mut(&bare) {
                Some((existing, merged)) if *existing == datatype => merged.extend(values),
                // A bare entry of another datatype wins; the issued values
                // stay reachable under their issuer-qualified name.
                Some(_) => {}
                None => {
                    order.push(bare.clone());
                    staged.insert(bare, (datatype, values));
                }
            }
        }
    }

    let mut attributes = HashMap::with_capacity(staged.len());
    for fqn in order {
        let Some((datatype, values)) = staged.remove(&fqn) else { continue };
        if let Some(max) = limits.max_bag_size {
            if values.len() > max {
                return Err(IndeterminateError::processing(format!(
                    "attribute `{fqn}` carries {} values, exceeding the limit of {max}",
                    values.len()
                )));
            }
        }
        let bag = Bag::new(datatype, values)
            .map_err(|e| IndeterminateError::processing(e.to_string()))?;
        attributes.insert(fqn, bag);
    }

    Ok(IndividualDecisionRequest::new(attributes, content, def.return_policy_id_list))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_core::StatusCode;

    fn parse(yaml: &str) -> RequestDef {
        serde_yaml::from_str(yaml).expect("request yaml")
    }

    fn run(yaml: &str, mode: IssuerMode) -> EvalResult<IndividualDecisionRequest> {
        preprocess(&parse(yaml), mode, Limits::default())
    }

    const DUP_ISSUERS: &str = r"
attributes:
  - category: subject
    attributes:
      - id: role
        type: string
        issuer: hr
        values: [manager]
      - id: role
        type: string
        issuer: it
        values: [operator]
";

    #[test]
    fn duplicate_category_is_a_syntax_error() {
        let yaml = r"
attributes:
  - category: subject
  - category: subject
";
        let err = run(yaml, IssuerMode::Lax).unwrap_err();
        assert_eq!(err.code(), StatusCode::SyntaxError);
    }

    #[test]
    fn lax_mode_unions_across_issuers() {
        let request = run(DUP_ISSUERS, IssuerMode::Lax).unwrap();
        let bare = request
            .attribute_bag(&AttributeFqn::new("subject", "role", None))
            .expect("union bag");
        assert_eq!(bare.len(), 2);
        let issued = request
            .attribute_bag(&AttributeFqn::new("subject", "role", Some("hr".into())))
            .expect("issuer bag");
        assert_eq!(issued.len(), 1);
    }

    #[test]
    fn strict_mode_keeps_issuers_apart() {
        let request = run(DUP_ISSUERS, IssuerMode::Strict).unwrap();
        assert!(request.attribute_bag(&AttributeFqn::new("subject", "role", None)).is_none());
        assert!(request
            .attribute_bag(&AttributeFqn::new("subject", "role", Some("it".into())))
            .is_some());
    }

    #[test]
    fn strict_mode_rejects_duplicate_attributes() {
        let yaml = r"
attributes:
  - category: subject
    attributes:
      - id: role
        type: string
        values: [a]
      - id: role
        type: string
        values: [b]
";
        assert!(run(yaml, IssuerMode::Strict).is_err());
        let merged = run(yaml, IssuerMode::Lax).unwrap();
        let bag = merged.attribute_bag(&AttributeFqn::new("subject", "role", None)).unwrap();
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn bag_size_limit_is_a_processing_error() {
        let yaml = r"
attributes:
  - category: subject
    attributes:
      - id: role
        type: string
        values: [a, b, c]
";
        let limits = Limits { max_bag_size: Some(2), ..Limits::default() };
        let err = preprocess(&parse(yaml), IssuerMode::Lax, limits).unwrap_err();
        assert_eq!(err.code(), StatusCode::ProcessingError);
    }

    #[test]
    fn unknown_datatype_is_a_syntax_error() {
        let yaml = r"
attributes:
  - category: subject
    attributes:
      - id: role
        type: no-such-type
        values: [a]
";
        let err = run(yaml, IssuerMode::Lax).unwrap_err();
        assert_eq!(err.code(), StatusCode::SyntaxError);
    }
}
