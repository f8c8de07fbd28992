//! Typed attribute values with per-datatype lexical parsing and canonical
//! printing.

use base64::Engine as _;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::datatype::Datatype;
use crate::names::{DnsNameValue, IpAddressValue, Rfc822Name, X500Name};
use crate::temporal::{self, DayTimeDuration, YearMonthDuration};

/// A lexical value could not be parsed under its declared datatype.
#[derive(Debug, Clone, Error)]
#[error("cannot parse `{input}` as {datatype}: {reason}")]
pub struct ValueParseError {
    /// Declared datatype of the offending literal.
    pub datatype: Datatype,
    /// The literal as received.
    pub input: String,
    /// Parser diagnostic.
    pub reason: String,
}

/// A single primitive attribute value.
///
/// Equality is total per datatype: strings compare byte-wise, temporal
/// values on the timeline, structured names under their own normalization
/// rules. Values of different datatypes never compare equal.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// `xs:string`
    String(String),
    /// `xs:boolean`
    Boolean(bool),
    /// `xs:integer`
    Integer(i64),
    /// `xs:double`
    Double(f64),
    /// `xs:time`
    Time(NaiveTime),
    /// `xs:date`
    Date(NaiveDate),
    /// `xs:dateTime`
    DateTime(DateTime<FixedOffset>),
    /// `xs:dayTimeDuration`
    DayTimeDuration(DayTimeDuration),
    /// `xs:yearMonthDuration`
    YearMonthDuration(YearMonthDuration),
    /// `xs:anyURI`
    AnyUri(String),
    /// `xs:hexBinary`
    HexBinary(Vec<u8>),
    /// `xs:base64Binary`
    Base64Binary(Vec<u8>),
    /// X.500 directory name
    X500Name(X500Name),
    /// RFC 822 mailbox
    Rfc822Name(Rfc822Name),
    /// IP address with optional mask and port range
    IpAddress(IpAddressValue),
    /// DNS name with optional wildcard and port range
    DnsName(DnsNameValue),
}

impl AttributeValue {
    /// The datatype of this value.
    #[must_use]
    pub const fn datatype(&self) -> Datatype {
        match self {
            Self::String(_) => Datatype::String,
            Self::Boolean(_) => Datatype::Boolean,
            Self::Integer(_) => Datatype::Integer,
            Self::Double(_) => Datatype::Double,
            Self::Time(_) => Datatype::Time,
            Self::Date(_) => Datatype::Date,
            Self::DateTime(_) => Datatype::DateTime,
            Self::DayTimeDuration(_) => Datatype::DayTimeDuration,
            Self::YearMonthDuration(_) => Datatype::YearMonthDuration,
            Self::AnyUri(_) => Datatype::AnyUri,
            Self::HexBinary(_) => Datatype::HexBinary,
            Self::Base64Binary(_) => Datatype::Base64Binary,
            Self::X500Name(_) => Datatype::X500Name,
            Self::Rfc822Name(_) => Datatype::Rfc822Name,
            Self::IpAddress(_) => Datatype::IpAddress,
            Self::DnsName(_) => Datatype::DnsName,
        }
    }

    /// Parses a lexical literal under the given datatype.
    ///
    /// Boolean accepts exactly `true` and `false`; everything else is a
    /// syntax error, as required for `boolean-from-string`.
    pub fn parse_lexical(datatype: Datatype, input: &str) -> Result<Self, ValueParseError> {
        let err = |reason: String| ValueParseError {
            datatype,
            input: input.to_owned(),
            reason,
        };
        match datatype {
            Datatype::String => Ok(Self::String(input.to_owned())),
            Datatype::Boolean => match input {
                "true" => Ok(Self::Boolean(true)),
                "false" => Ok(Self::Boolean(false)),
                _ => Err(err("expected exactly `true` or `false`".into())),
            },
            Datatype::Integer => input
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|e| err(e.to_string())),
            Datatype::Double => input
                .parse::<f64>()
                .map(Self::Double)
                .map_err(|e| err(e.to_string())),
            Datatype::Time => temporal::parse_time(input).map(Self::Time).map_err(err),
            Datatype::Date => temporal::parse_date(input).map(Self::Date).map_err(err),
            Datatype::DateTime => temporal::parse_date_time(input).map(Self::DateTime).map_err(err),
            Datatype::DayTimeDuration => {
                DayTimeDuration::parse(input).map(Self::DayTimeDuration).map_err(err)
            }
            Datatype::YearMonthDuration => {
                YearMonthDuration::parse(input).map(Self::YearMonthDuration).map_err(err)
            }
            Datatype::AnyUri => Ok(Self::AnyUri(input.to_owned())),
            Datatype::HexBinary => hex::decode(input)
                .map(Self::HexBinary)
                .map_err(|e| err(e.to_string())),
            Datatype::Base64Binary => base64::engine::general_purpose::STANDARD
                .decode(input)
                .map(Self::Base64Binary)
                .map_err(|e| err(e.to_string())),
            Datatype::X500Name => X500Name::parse(input).map(Self::X500Name).map_err(err),
            Datatype::Rfc822Name => Rfc822Name::parse(input).map(Self::Rfc822Name).map_err(err),
            Datatype::IpAddress => IpAddressValue::parse(input).map(Self::IpAddress).map_err(err),
            Datatype::DnsName => DnsNameValue::parse(input).map(Self::DnsName).map_err(err),
        }
    }

    /// Parses a JSON scalar under the given datatype. Strings go through
    /// [`Self::parse_lexical`]; JSON numbers and booleans are accepted for
    /// the numeric and boolean datatypes.
    pub fn parse_json(
        datatype: Datatype,
        value: &serde_json::Value,
    ) -> Result<Self, ValueParseError> {
        use serde_json::Value as Json;
        let err = |reason: &str| ValueParseError {
            datatype,
            input: value.to_string(),
            reason: reason.to_owned(),
        };
        match (datatype, value) {
            (Datatype::Boolean, Json::Bool(b)) => Ok(Self::Boolean(*b)),
            (Datatype::Integer, Json::Number(n)) => {
                n.as_i64().map(Self::Integer).ok_or_else(|| err("not an integer"))
            }
            (Datatype::Double, Json::Number(n)) => {
                n.as_f64().map(Self::Double).ok_or_else(|| err("not a double"))
            }
            (_, Json::String(s)) => Self::parse_lexical(datatype, s),
            _ => Err(err("expected a string literal")),
        }
    }

    /// The canonical lexical form of this value, the output of the
    /// `string-from-<T>` conversion family.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::String(s) | Self::AnyUri(s) => s.clone(),
            Self::Boolean(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Double(d) => {
                if d.fract() == 0.0 && d.is_finite() && d.abs() < 1e15 {
                    format!("{d:.1}")
                } else {
                    d.to_string()
                }
            }
            Self::Time(t) => t.format("%H:%M:%S%.f").to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            Self::DayTimeDuration(d) => d.to_string(),
            Self::YearMonthDuration(d) => d.to_string(),
            Self::HexBinary(b) => hex::encode(b),
            Self::Base64Binary(b) => base64::engine::general_purpose::STANDARD.encode(b),
            Self::X500Name(n) => n.to_string(),
            Self::Rfc822Name(n) => n.to_string(),
            Self::IpAddress(a) => a.to_string(),
            Self::DnsName(n) => n.to_string(),
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("AttributeValue", 2)?;
        s.serialize_field("type", self.datatype().short_name())?;
        s.serialize_field("value", &self.canonical())?;
        s.end()
    }
}
