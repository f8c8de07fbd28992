//! Standard attribute datatypes and value-type descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
const XACML_1_0_DT: &str = "urn:oasis:names:tc:xacml:1.0:data-type:";
const XACML_2_0_DT: &str = "urn:oasis:names:tc:xacml:2.0:data-type:";

/// The sixteen standard primitive attribute datatypes.
///
/// Each primitive datatype has a unique bag-of-T companion described by
/// [`ValueType::Bag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Datatype {
    /// `xs:string`
    String,
    /// `xs:boolean`
    Boolean,
    /// `xs:integer`
    Integer,
    /// `xs:double`
    Double,
    /// `xs:time`
    Time,
    /// `xs:date`
    Date,
    /// `xs:dateTime`
    DateTime,
    /// `xs:dayTimeDuration`
    DayTimeDuration,
    /// `xs:yearMonthDuration`
    YearMonthDuration,
    /// `xs:anyURI`
    AnyUri,
    /// `xs:hexBinary`
    HexBinary,
    /// `xs:base64Binary`
    Base64Binary,
    /// `urn:oasis:names:tc:xacml:1.0:data-type:x500Name`
    X500Name,
    /// `urn:oasis:names:tc:xacml:1.0:data-type:rfc822Name`
    Rfc822Name,
    /// `urn:oasis:names:tc:xacml:2.0:data-type:ipAddress`
    IpAddress,
    /// `urn:oasis:names:tc:xacml:2.0:data-type:dnsName`
    DnsName,
}

impl Datatype {
    /// Every standard datatype, in declaration order.
    pub const ALL: [Self; 16] = [
        Self::String,
        Self::Boolean,
        Self::Integer,
        Self::Double,
        Self::Time,
        Self::Date,
        Self::DateTime,
        Self::DayTimeDuration,
        Self::YearMonthDuration,
        Self::AnyUri,
        Self::HexBinary,
        Self::Base64Binary,
        Self::X500Name,
        Self::Rfc822Name,
        Self::IpAddress,
        Self::DnsName,
    ];

    /// Returns the standard identifier URI for this datatype.
    #[must_use]
    pub fn uri(self) -> &'static str {
        match self {
            Self::String => "http://www.w3.org/2001/XMLSchema#string",
            Self::Boolean => "http://www.w3.org/2001/XMLSchema#boolean",
            Self::Integer => "http://www.w3.org/2001/XMLSchema#integer",
            Self::Double => "http://www.w3.org/2001/XMLSchema#double",
            Self::Time => "http://www.w3.org/2001/XMLSchema#time",
            Self::Date => "http://www.w3.org/2001/XMLSchema#date",
            Self::DateTime => "http://www.w3.org/2001/XMLSchema#dateTime",
            Self::DayTimeDuration => "http://www.w3.org/2001/XMLSchema#dayTimeDuration",
            Self::YearMonthDuration => "http://www.w3.org/2001/XMLSchema#yearMonthDuration",
            Self::AnyUri => "http://www.w3.org/2001/XMLSchema#anyURI",
            Self::HexBinary => "http://www.w3.org/2001/XMLSchema#hexBinary",
            Self::Base64Binary => "http://www.w3.org/2001/XMLSchema#base64Binary",
            Self::X500Name => "urn:oasis:names:tc:xacml:1.0:data-type:x500Name",
            Self::Rfc822Name => "urn:oasis:names:tc:xacml:1.0:data-type:rfc822Name",
            Self::IpAddress => "urn:oasis:names:tc:xacml:2.0:data-type:ipAddress",
            Self::DnsName => "urn:oasis:names:tc:xacml:2.0:data-type:dnsName",
        }
    }

    /// The short name used inside standard function identifiers
    /// (`string-equal`, `dateTime-add-dayTimeDuration`, ...).
    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Time => "time",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::DayTimeDuration => "dayTimeDuration",
            Self::YearMonthDuration => "yearMonthDuration",
            Self::AnyUri => "anyURI",
            Self::HexBinary => "hexBinary",
            Self::Base64Binary => "base64Binary",
            Self::X500Name => "x500Name",
            Self::Rfc822Name => "rfc822Name",
            Self::IpAddress => "ipAddress",
            Self::DnsName => "dnsName",
        }
    }

    /// Resolves a standard datatype URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        let short = uri
            .strip_prefix(XSD)
            .or_else(|| uri.strip_prefix(XACML_1_0_DT))
            .or_else(|| uri.strip_prefix(XACML_2_0_DT))?;
        Self::from_short_name(short)
    }

    /// Resolves a short name (`"string"`, `"dateTime"`, ...).
    #[must_use]
    pub fn from_short_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|dt| dt.short_name() == name)
    }

    /// Resolves either a full URI or a short name. Policy documents may use
    /// whichever form is more readable.
    #[must_use]
    pub fn resolve(name: &str) -> Option<Self> {
        Self::from_uri(name).or_else(|| Self::from_short_name(name))
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Static type of an expression: a primitive value, a bag of primitives of
/// one datatype, or a function reference (only valid as the first argument
/// of a higher-order apply).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// A single primitive value of the given datatype.
    Primitive(Datatype),
    /// A bag whose elements all have the given datatype.
    Bag(Datatype),
    /// A reference to a first-order function.
    Function,
}

impl ValueType {
    /// True when this type is a bag type.
    #[must_use]
    pub const fn is_bag(self) -> bool {
        matches!(self, Self::Bag(_))
    }

    /// The element or primitive datatype, if any.
    #[must_use]
    pub const fn datatype(self) -> Option<Datatype> {
        match self {
            Self::Primitive(dt) | Self::Bag(dt) => Some(dt),
            Self::Function => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(dt) => write!(f, "{dt}"),
            Self::Bag(dt) => write!(f, "bag[{dt}]"),
            Self::Function => f.write_str("function"),
        }
    }
}
