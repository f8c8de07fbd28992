//! Version-aware policy lookup.

use std::collections::HashMap;

use thiserror::Error;

use aegis_core::{PolicyVersion, PolicyVersionPatterns};

/// The same policy id and version was registered twice.
#[derive(Debug, Clone, Error)]
#[error("policy `{id}` version {version} is registered twice")]
pub struct DuplicatePolicy {
    /// Policy id.
    pub id: String,
    /// Duplicated version.
    pub version: PolicyVersion,
}

/// Maps a policy id to its versions, sorted latest-first, and resolves
/// references by optional version patterns.
pub struct PolicyMap<P> {
    entries: HashMap<String, Vec<(PolicyVersion, P)>>,
}

impl<P> Default for PolicyMap<P> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<P> PolicyMap<P> {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a policy under `(id, version)`, keeping versions sorted
    /// latest-first.
    pub fn insert(
        &mut self,
        id: impl Into<String>,
        version: PolicyVersion,
        policy: P,
    ) -> Result<(), DuplicatePolicy> {
        let id = id.into();
        let versions = self.entries.entry(id.clone()).or_default();
        let position = match versions.binary_search_by(|(v, _)| version.cmp(v)) {
            Ok(_) => return Err(DuplicatePolicy { id, version }),
            Err(pos) => pos,
        };
        versions.insert(position, (version, policy));
        Ok(())
    }

    /// The latest version of `id` matching the patterns, or the latest
    /// overall when no patterns are given.
    #[must_use]
    pub fn get(
        &self,
        id: &str,
        patterns: Option<&PolicyVersionPatterns>,
    ) -> Option<(&PolicyVersion, &P)> {
        let versions = self.entries.get(id)?;
        versions
            .iter()
            .find(|(version, _)| patterns.map_or(true, |p| p.matches(version)))
            .map(|(version, policy)| (version, policy))
    }

    /// Number of distinct policy ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(id, version)` pairs across all registered policies.
    pub fn iter_versions(&self) -> impl Iterator<Item = (&str, &PolicyVersion)> {
        self.entries
            .iter()
            .flat_map(|(id, versions)| versions.iter().map(move |(v, _)| (id.as_str(), v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> PolicyVersion {
        s.parse().expect(s)
    }

    fn patterns(version: Option<&str>, earliest: Option<&str>, latest: Option<&str>) -> PolicyVersionPatterns {
        PolicyVersionPatterns {
            version: version.map(|p| p.parse().unwrap()),
            earliest: earliest.map(|p| p.parse().unwrap()),
            latest: latest.map(|p| p.parse().unwrap()),
        }
    }

    fn sample() -> PolicyMap<&'static str> {
        let mut map = PolicyMap::new();
        map.insert("P", v("1.0"), "1.0").unwrap();
        map.insert("P", v("1.5"), "1.5").unwrap();
        map.insert("P", v("1.2"), "1.2").unwrap();
        map.insert("P", v("2.0"), "2.0").unwrap();
        map
    }

    #[test]
    fn unconstrained_lookup_returns_latest() {
        let map = sample();
        let (version, policy) = map.get("P", None).unwrap();
        assert_eq!(version, &v("2.0"));
        assert_eq!(*policy, "2.0");
        assert!(map.get("missing", None).is_none());
    }

    #[test]
    fn version_pattern_with_earliest_bound() {
        let map = sample();
        let p = patterns(Some("1.*"), Some("1.2"), None);
        let (version, _) = map.get("P", Some(&p)).unwrap();
        assert_eq!(version, &v("1.5"));

        let too_high = patterns(Some("1.*"), Some("1.6"), None);
        assert!(map.get("P", Some(&too_high)).is_none());
    }

    #[test]
    fn latest_bound_is_inclusive() {
        let map = sample();
        let p = patterns(None, None, Some("1.2"));
        let (version, _) = map.get("P", Some(&p)).unwrap();
        assert_eq!(version, &v("1.2"));
    }

    #[test]
    fn duplicate_version_is_rejected() {
        let mut map = sample();
        assert!(map.insert("P", v("1.5"), "again").is_err());
    }
}
