//! Document version numbers
//!
//! Provides [`DocVersion`], a dotted numeric version compared segment by segment.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Version of a published document
///
/// Parsed from a JSON number or string. Segments are compared numerically,
/// left to right, with missing trailing segments treated as zero:
///
/// - `1.10` > `1.9` > `1.2`
/// - `2` == `2.0`
///
/// The original text is kept for display.
#[derive(Debug, Clone)]
pub struct DocVersion {
    raw: String,
    segments: Vec<u64>,
}

/// Version parse failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version {input:?}: {reason}")]
pub struct VersionParseError {
    /// Rejected input
    pub input: String,
    /// Why it was rejected
    pub reason: &'static str,
}

impl DocVersion {
    /// Parse a dotted version (`"3"`, `"1.10"`, `"v2.0.1"`)
    ///
    /// # Errors
    /// Returns error for empty input, empty segments or non-digit characters
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let reject = |reason| VersionParseError {
            input: input.to_string(),
            reason,
        };

        let trimmed = input.trim();
        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        if body.is_empty() {
            return Err(reject("empty version"));
        }

        let mut segments = Vec::new();
        for part in body.split('.') {
            if part.is_empty() {
                return Err(reject("empty segment"));
            }
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(reject("segments must be decimal digits"));
            }
            let value = part
                .parse::<u64>()
                .map_err(|_| reject("segment out of range"))?;
            segments.push(value);
        }

        Ok(Self {
            raw: body.to_string(),
            segments,
        })
    }

    /// Single-segment version
    #[inline]
    #[must_use]
    pub fn from_major(major: u64) -> Self {
        Self {
            raw: major.to_string(),
            segments: vec![major],
        }
    }

    /// Numeric segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[u64] {
        &self.segments
    }

    /// First segment
    #[inline]
    #[must_use]
    pub fn major(&self) -> u64 {
        self.segments.first().copied().unwrap_or(0)
    }

    /// Next whole version after this one (`1.4` -> `2`)
    #[inline]
    #[must_use]
    pub fn next_major(&self) -> Self {
        Self::from_major(self.major().saturating_add(1))
    }

    /// Version text as written
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Segments without trailing zeros, the canonical comparison key
    fn significant(&self) -> &[u64] {
        let len = self
            .segments
            .iter()
            .rposition(|s| *s != 0)
            .map_or(0, |idx| idx + 1);
        &self.segments[..len]
    }
}

impl PartialEq for DocVersion {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for DocVersion {}

impl Hash for DocVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl Ord for DocVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for idx in 0..len {
            let lhs = self.segments.get(idx).copied().unwrap_or(0);
            let rhs = other.segments.get(idx).copied().unwrap_or(0);
            match lhs.cmp(&rhs) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for DocVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for DocVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DocVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DocVersion {
    /// Whole versions serialize as numbers, dotted ones as strings
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.segments.len() == 1 {
            serializer.serialize_u64(self.segments[0])
        } else {
            serializer.serialize_str(&self.raw)
        }
    }
}

impl<'de> Deserialize<'de> for DocVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DocVersionVisitor)
    }
}

struct DocVersionVisitor;

impl Visitor<'_> for DocVersionVisitor {
    type Value = DocVersion;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative version number or dotted version string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(DocVersion::from_major(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(DocVersion::from_major)
            .map_err(|_| E::custom(format!("negative version {v}")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        if !v.is_finite() || v < 0.0 {
            return Err(E::custom(format!("invalid version {v}")));
        }
        DocVersion::parse(&v.to_string()).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        DocVersion::parse(v).map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> DocVersion {
        DocVersion::parse(s).unwrap()
    }

    #[test]
    fn dotted_versions_compare_numerically() {
        assert!(v("1.10") > v("1.2"));
        assert!(v("1.10") > v("1.9"));
        assert!(v("1.9") > v("1.2"));
        assert!(v("2") > v("1.99"));
    }

    #[test]
    fn trailing_zero_segments_are_equal() {
        assert_eq!(v("2"), v("2.0"));
        assert_eq!(v("2.0.0").cmp(&v("2")), Ordering::Equal);
        assert_ne!(v("2.0.1"), v("2"));
    }

    #[test]
    fn parse_accepts_prefix_and_whitespace() {
        assert_eq!(v(" v3.1 ").segments(), &[3, 1]);
        assert_eq!(v("V7").major(), 7);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(DocVersion::parse("").is_err());
        assert!(DocVersion::parse("1..2").is_err());
        assert!(DocVersion::parse("1.x").is_err());
        assert!(DocVersion::parse("-1").is_err());
        assert!(DocVersion::parse("v").is_err());
    }

    #[test]
    fn next_major_drops_minor() {
        assert_eq!(v("1.4").next_major(), DocVersion::from_major(2));
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let from_int: DocVersion = serde_json::from_str("3").unwrap();
        let from_float: DocVersion = serde_json::from_str("1.5").unwrap();
        let from_text: DocVersion = serde_json::from_str("\"1.10\"").unwrap();

        assert_eq!(from_int, v("3"));
        assert_eq!(from_float.segments(), &[1, 5]);
        assert_eq!(from_text.segments(), &[1, 10]);
        assert!(serde_json::from_str::<DocVersion>("-2").is_err());
        assert!(serde_json::from_str::<DocVersion>("true").is_err());
    }

    #[test]
    fn serializes_whole_versions_as_numbers() {
        assert_eq!(serde_json::to_string(&v("4")).unwrap(), "4");
        assert_eq!(serde_json::to_string(&v("1.10")).unwrap(), "\"1.10\"");
    }
}
