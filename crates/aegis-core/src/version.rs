//! Policy versions and version-matching patterns.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A malformed version or version pattern.
#[derive(Debug, Clone, Error)]
#[error("invalid version {kind} `{input}`")]
pub struct VersionError {
    /// `"literal"` or `"pattern"`.
    pub kind: &'static str,
    /// The offending text.
    pub input: String,
}

/// A dotted numeric policy version, ordered component-by-component with
/// numeric comparison (`1.10 > 1.9`). Missing components sort lowest
/// (`1.2 < 1.2.0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyVersion {
    components: Vec<u64>,
}

impl Default for PolicyVersion {
    /// Version `1.0`, the default for policies that declare none.
    fn default() -> Self {
        Self { components: vec![1, 0] }
    }
}

impl PolicyVersion {
    /// The components of the version.
    #[must_use]
    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

impl FromStr for PolicyVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionError { kind: "literal", input: s.to_owned() };
        if s.is_empty() {
            return Err(err());
        }
        let components = s
            .split('.')
            .map(|c| c.parse::<u64>().map_err(|_| err()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }
}

impl Ord for PolicyVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for PolicyVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PolicyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl Serialize for PolicyVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PolicyVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Literal(u64),
    /// `*`: exactly one component of any value.
    Wildcard,
    /// `+`: one or more components of any value.
    Plus,
}

/// A wildcarded dotted version pattern: `*` matches one component, `+`
/// matches one or more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPattern {
    segments: Vec<Segment>,
}

impl VersionPattern {
    /// True when the pattern matches the version exactly.
    #[must_use]
    pub fn matches(&self, version: &PolicyVersion) -> bool {
        matches_from(&self.segments, version.components())
    }

    /// True when some version matching this pattern is `<= version`; used
    /// for the inclusive `earliest` lower bound.
    #[must_use]
    pub fn le_version(&self, version: &PolicyVersion) -> bool {
        bound(&self.segments, u64::MIN) <= *version
    }

    /// True when some version matching this pattern is `>= version`; used
    /// for the inclusive `latest` upper bound.
    #[must_use]
    pub fn ge_version(&self, version: &PolicyVersion) -> bool {
        bound(&self.segments, u64::MAX) >= *version
    }
}

fn matches_from(segments: &[Segment], components: &[u64]) -> bool {
    match segments.split_first() {
        None => components.is_empty(),
        Some((Segment::Literal(n), rest)) => {
            components.split_first().is_some_and(|(c, tail)| c == n && matches_from(rest, tail))
        }
        Some((Segment::Wildcard, rest)) => {
            components.split_first().is_some_and(|(_, tail)| matches_from(rest, tail))
        }
        Some((Segment::Plus, rest)) => {
            // `+` consumes one or more components.
            (1..=components.len()).any(|n| matches_from(rest, &components[n..]))
        }
    }
}

/// The extreme version matching the pattern, with wildcards pinned to
/// `fill` (0 for the smallest match, `u64::MAX` for the largest). A `+`
/// pinned high keeps the comparison permissive through the shared prefix.
fn bound(segments: &[Segment], fill: u64) -> PolicyVersion {
    let components = segments
        .iter()
        .map(|s| match s {
            Segment::Literal(n) => *n,
            Segment::Wildcard | Segment::Plus => fill,
        })
        .collect();
    PolicyVersion { components }
}

impl FromStr for VersionPattern {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionError { kind: "pattern", input: s.to_owned() };
        if s.is_empty() {
            return Err(err());
        }
        let segments = s
            .split('.')
            .map(|c| match c {
                "*" => Ok(Segment::Wildcard),
                "+" => Ok(Segment::Plus),
                n => n.parse::<u64>().map(Segment::Literal).map_err(|_| err()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }
}

impl fmt::Display for VersionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match s {
                Segment::Literal(n) => write!(f, "{n}")?,
                Segment::Wildcard => f.write_str("*")?,
                Segment::Plus => f.write_str("+")?,
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for VersionPattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The three optional constraints of a policy reference: an exact-match
/// pattern plus inclusive earliest/latest bounds.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyVersionPatterns {
    /// Exact-match pattern.
    #[serde(default)]
    pub version: Option<VersionPattern>,
    /// Inclusive lower bound.
    #[serde(default)]
    pub earliest: Option<VersionPattern>,
    /// Inclusive upper bound.
    #[serde(default)]
    pub latest: Option<VersionPattern>,
}

impl PolicyVersionPatterns {
    /// True when no constraint is present.
    #[must_use]
    pub const fn is_unconstrained(&self) -> bool {
        self.version.is_none() && self.earliest.is_none() && self.latest.is_none()
    }

    /// True when the version satisfies all present constraints.
    #[must_use]
    pub fn matches(&self, version: &PolicyVersion) -> bool {
        self.version.as_ref().map_or(true, |p| p.matches(version))
            && self.earliest.as_ref().map_or(true, |p| p.le_version(version))
            && self.latest.as_ref().map_or(true, |p| p.ge_version(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(s: &str) -> PolicyVersion {
        s.parse().expect(s)
    }

    fn p(s: &str) -> VersionPattern {
        s.parse().expect(s)
    }

    #[test]
    fn numeric_component_ordering() {
        assert!(v("1.10") > v("1.9"));
        assert!(v("1.2") < v("1.2.0"));
        assert!(v("2") > v("1.999.999"));
        assert_eq!(v("1.02"), v("1.2"));
    }

    #[test]
    fn rejects_bad_literals() {
        for bad in ["", "1..2", "a.b", "1.-2", "1.2."] {
            assert!(bad.parse::<PolicyVersion>().is_err(), "{bad}");
        }
    }

    #[test]
    fn wildcard_matches_one_component() {
        let pat = p("1.*");
        assert!(pat.matches(&v("1.0")));
        assert!(pat.matches(&v("1.9")));
        assert!(!pat.matches(&v("1")));
        assert!(!pat.matches(&v("1.2.3")));
        assert!(!pat.matches(&v("2.0")));
    }

    #[test]
    fn plus_matches_one_or_more() {
        let pat = p("1.+");
        assert!(pat.matches(&v("1.0")));
        assert!(pat.matches(&v("1.2.3.4")));
        assert!(!pat.matches(&v("1")));
        assert!(p("+.5").matches(&v("1.2.5")));
        assert!(!p("+.5").matches(&v("5")));
    }

    #[test]
    fn bounds_are_inclusive() {
        let patterns = PolicyVersionPatterns {
            version: Some(p("1.*")),
            earliest: Some(p("1.2")),
            latest: None,
        };
        assert!(patterns.matches(&v("1.2")));
        assert!(patterns.matches(&v("1.7")));
        assert!(!patterns.matches(&v("1.1")));
        assert!(!patterns.matches(&v("2.0")));
    }

    proptest! {
        #[test]
        fn ordering_matches_component_lists(a in proptest::collection::vec(0u64..50, 1..5),
                                            b in proptest::collection::vec(0u64..50, 1..5)) {
            let va = PolicyVersion { components: a.clone() };
            let vb = PolicyVersion { components: b.clone() };
            prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
        }

        #[test]
        fn display_round_trips(a in proptest::collection::vec(0u64..1000, 1..5)) {
            let va = PolicyVersion { components: a };
            let back: PolicyVersion = va.to_string().parse().unwrap();
            prop_assert_eq!(va, back);
        }

        #[test]
        fn exact_literal_pattern_matches_only_itself(a in proptest::collection::vec(0u64..20, 1..4)) {
            let va = PolicyVersion { components: a };
            let pat: VersionPattern = va.to_string().parse().unwrap();
            prop_assert!(pat.matches(&va));
        }
    }
}
