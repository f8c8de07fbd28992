//! Status codes and the evaluation error carried by Indeterminate results.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::fqn::AttributeFqn;

/// The standard XACML status codes surfaced in decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// `urn:oasis:names:tc:xacml:1.0:status:ok`
    Ok,
    /// `urn:oasis:names:tc:xacml:1.0:status:missing-attribute`
    MissingAttribute,
    /// `urn:oasis:names:tc:xacml:1.0:status:syntax-error`
    SyntaxError,
    /// `urn:oasis:names:tc:xacml:1.0:status:processing-error`
    ProcessingError,
}

impl StatusCode {
    /// The standard identifier URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::Ok => "urn:oasis:names:tc:xacml:1.0:status:ok",
            Self::MissingAttribute => "urn:oasis:names:tc:xacml:1.0:status:missing-attribute",
            Self::SyntaxError => "urn:oasis:names:tc:xacml:1.0:status:syntax-error",
            Self::ProcessingError => "urn:oasis:names:tc:xacml:1.0:status:processing-error",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

impl Serialize for StatusCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.uri())
    }
}

/// The error raised by expression evaluation; every occurrence surfaces as
/// an Indeterminate decision annotated with the status code.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct IndeterminateError {
    code: StatusCode,
    message: String,
    missing: Option<AttributeFqn>,
}

impl IndeterminateError {
    /// A syntax error: malformed literal, failed conversion, structural
    /// violation.
    #[must_use]
    pub fn syntax(message: impl Into<String>) -> Self {
        Self { code: StatusCode::SyntaxError, message: message.into(), missing: None }
    }

    /// A processing error: runtime failure such as division by zero or an
    /// out-of-range substring.
    #[must_use]
    pub fn processing(message: impl Into<String>) -> Self {
        Self { code: StatusCode::ProcessingError, message: message.into(), missing: None }
    }

    /// A required value was absent from the request and no attribute name
    /// identifies it (selector content, for instance).
    #[must_use]
    pub fn missing(message: impl Into<String>) -> Self {
        Self { code: StatusCode::MissingAttribute, message: message.into(), missing: None }
    }

    /// A required attribute was absent from the request.
    #[must_use]
    pub fn missing_attribute(fqn: AttributeFqn) -> Self {
        Self {
            code: StatusCode::MissingAttribute,
            message: format!("missing attribute {fqn}"),
            missing: Some(fqn),
        }
    }

    /// The status code classifying this error.
    #[must_use]
    pub const fn code(&self) -> StatusCode {
        self.code
    }

    /// Human-readable diagnostic.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The missing attribute name, for missing-attribute errors.
    #[must_use]
    pub const fn missing_fqn(&self) -> Option<&AttributeFqn> {
        self.missing.as_ref()
    }
}

/// Result alias used by every value-returning evaluation path.
pub type EvalResult<T> = Result<T, IndeterminateError>;

/// The status block attached to a final decision.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    /// Status code URI.
    pub code: StatusCode,
    /// Diagnostic message.
    pub message: String,
}

impl From<&IndeterminateError> for Status {
    fn from(err: &IndeterminateError) -> Self {
        Self { code: err.code(), message: err.message().to_owned() }
    }
}
