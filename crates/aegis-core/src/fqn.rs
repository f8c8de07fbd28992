//! Fully-qualified attribute names.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies an attribute inside a request: category URI, attribute id
/// URI, and optional issuer.
///
/// Issuer matching semantics (strict vs lax) live in the request
/// preprocessor; the FQN itself compares all three fields exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeFqn {
    category: String,
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    issuer: Option<String>,
}

impl AttributeFqn {
    /// Builds a fully-qualified name.
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        id: impl Into<String>,
        issuer: Option<String>,
    ) -> Self {
        Self { category: category.into(), id: id.into(), issuer }
    }

    /// The attribute category URI.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// The attribute id URI.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The optional issuer.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// The same name with the issuer erased; used as the lax-mode union key.
    #[must_use]
    pub fn without_issuer(&self) -> Self {
        Self { category: self.category.clone(), id: self.id.clone(), issuer: None }
    }
}

impl fmt::Display for AttributeFqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.category, self.id)?;
        if let Some(issuer) = &self.issuer {
            write!(f, "@{issuer}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issuer_distinguishes_names() {
        let a = AttributeFqn::new("cat", "id", None);
        let b = AttributeFqn::new("cat", "id", Some("issuer".into()));
        assert_ne!(a, b);
        assert_eq!(b.without_issuer(), a);
        assert_eq!(b.to_string(), "cat#id@issuer");
    }
}
