//! Policy versions and version-matching constraints.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PolicyBuildError;

/// A policy version: a dot-separated sequence of non-negative integers,
/// compared segment-wise with shorter sequences ranking first on a tie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyVersion(Vec<u64>);

impl PolicyVersion {
    pub fn parse(version: &str) -> Result<Self, PolicyBuildError> {
        let segments: Result<Vec<u64>, _> =
            version.split('.').map(|s| s.parse::<u64>()).collect();
        match segments {
            Ok(segments) if !segments.is_empty() => Ok(Self(segments)),
            _ => Err(PolicyBuildError::InvalidVersion {
                version: version.to_owned(),
            }),
        }
    }

    pub fn segments(&self) -> &[u64] {
        &self.0
    }
}

impl PartialOrd for PolicyVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PolicyVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for PolicyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(u64),
    /// `*`: exactly one segment of any value.
    AnyOne,
    /// `+`: any remaining sequence of segments, including none.
    AnyTail,
}

/// A version-matching pattern: literal segments, `*` (one segment of any
/// value) and `+` (any trailing sequence). `+` is only meaningful as the
/// final segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPattern {
    segments: Vec<Segment>,
    source: String,
}

impl VersionPattern {
    pub fn parse(pattern: &str) -> Result<Self, PolicyBuildError> {
        let invalid = || PolicyBuildError::InvalidVersionPattern {
            pattern: pattern.to_owned(),
        };
        let mut segments = Vec::new();
        for (i, part) in pattern.split('.').enumerate() {
            let segment = match part {
                "*" => Segment::AnyOne,
                "+" => {
                    if i + 1 != pattern.split('.').count() {
                        return Err(invalid());
                    }
                    Segment::AnyTail
                }
                _ => Segment::Literal(part.parse().map_err(|_| invalid())?),
            };
            segments.push(segment);
        }
        if segments.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            segments,
            source: pattern.to_owned(),
        })
    }

    pub fn matches(&self, version: &PolicyVersion) -> bool {
        let values = version.segments();
        let mut vi = 0;
        for segment in &self.segments {
            match segment {
                Segment::AnyTail => return true,
                Segment::AnyOne => {
                    if vi >= values.len() {
                        return false;
                    }
                    vi += 1;
                }
                Segment::Literal(n) => {
                    if vi >= values.len() || values[vi] != *n {
                        return false;
                    }
                    vi += 1;
                }
            }
        }
        vi == values.len()
    }

    /// The smallest concrete version this pattern can match, used to
    /// order earliest/latest bounds (`*` counts as 0, `+` as nothing).
    fn lower_bound(&self) -> PolicyVersion {
        let values = self
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Literal(n) => Some(*n),
                Segment::AnyOne => Some(0),
                Segment::AnyTail => None,
            })
            .collect();
        PolicyVersion(values)
    }
}

impl fmt::Display for VersionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// The version constraints a policy reference may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionConstraints {
    /// Exact-match pattern.
    pub version: Option<VersionPattern>,
    /// Inclusive lower bound pattern.
    pub earliest: Option<VersionPattern>,
    /// Inclusive upper bound pattern.
    pub latest: Option<VersionPattern>,
}

impl VersionConstraints {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn exact(pattern: VersionPattern) -> Self {
        Self {
            version: Some(pattern),
            ..Self::default()
        }
    }

    /// Whether a concrete policy version satisfies all present constraints.
    pub fn matches(&self, version: &PolicyVersion) -> bool {
        if let Some(p) = &self.version {
            if !p.matches(version) {
                return false;
            }
        }
        if let Some(p) = &self.earliest {
            if !p.matches(version) && *version < p.lower_bound() {
                return false;
            }
        }
        if let Some(p) = &self.latest {
            if !p.matches(version) && *version > p.lower_bound() {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> PolicyVersion {
        PolicyVersion::parse(s).unwrap()
    }

    #[test]
    fn version_ordering() {
        assert!(v("1.0") < v("1.1"));
        assert!(v("1.9") < v("1.10"));
        assert!(v("1") < v("1.0"));
        assert_eq!(v("2.0.1"), v("2.0.1"));
    }

    #[test]
    fn invalid_versions_rejected() {
        assert!(PolicyVersion::parse("").is_err());
        assert!(PolicyVersion::parse("1..2").is_err());
        assert!(PolicyVersion::parse("1.a").is_err());
    }

    #[test]
    fn pattern_literals_and_wildcards() {
        let p = VersionPattern::parse("1.*.3").unwrap();
        assert!(p.matches(&v("1.2.3")));
        assert!(p.matches(&v("1.0.3")));
        assert!(!p.matches(&v("1.2.4")));
        assert!(!p.matches(&v("1.2")));

        let p = VersionPattern::parse("2.+").unwrap();
        assert!(p.matches(&v("2")));
        assert!(p.matches(&v("2.9.9")));
        assert!(!p.matches(&v("3.0")));
    }

    #[test]
    fn plus_only_allowed_last() {
        assert!(VersionPattern::parse("1.+.2").is_err());
        assert!(VersionPattern::parse("+").is_ok());
    }

    #[test]
    fn constraint_bounds() {
        let constraints = VersionConstraints {
            version: None,
            earliest: Some(VersionPattern::parse("1.2").unwrap()),
            latest: Some(VersionPattern::parse("2.0").unwrap()),
        };
        assert!(!constraints.matches(&v("1.1")));
        assert!(constraints.matches(&v("1.2")));
        assert!(constraints.matches(&v("1.5")));
        assert!(constraints.matches(&v("2.0")));
        assert!(!constraints.matches(&v("2.1")));
    }
}
