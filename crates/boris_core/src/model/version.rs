//! Project format version marker.
//!
//! # Invariants
//! - Versions are dotted non-negative integers (`"4.0"`, `"2"`).
//! - Comparison is component-wise; missing trailing components count as zero.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// Project format version written by this library.
pub const PROJECT_FORMAT_VERSION: &str = "4.0";

/// First format version using structured modifier sets.
pub const STRUCTURED_MODIFIERS_VERSION: &str = "4.0";

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)*$").expect("valid version regex"));

/// Parsed project format version.
#[derive(Debug, Clone)]
pub struct FormatVersion {
    raw: String,
    parts: Vec<u32>,
}

impl FormatVersion {
    /// Parses a dotted version string.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if !VERSION_RE.is_match(trimmed) {
            return None;
        }
        let parts = trimmed
            .split('.')
            .map(|part| part.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            raw: trimmed.to_string(),
            parts,
        })
    }

    /// Parses a version marker stored either as a string or a JSON number.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Self::parse(text),
            Value::Number(number) => Self::parse(&number.to_string()),
            _ => None,
        }
    }

    /// Version written by this library.
    pub fn current() -> Self {
        Self::known(PROJECT_FORMAT_VERSION)
    }

    /// Version introducing structured modifier sets.
    pub fn structured_modifiers() -> Self {
        Self::known(STRUCTURED_MODIFIERS_VERSION)
    }

    fn known(raw: &'static str) -> Self {
        Self {
            raw: raw.to_string(),
            parts: raw
                .split('.')
                .filter_map(|part| part.parse::<u32>().ok())
                .collect(),
        }
    }

    /// Original textual form.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn component(&self, idx: usize) -> u32 {
        self.parts.get(idx).copied().unwrap_or(0)
    }
}

impl Display for FormatVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for FormatVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FormatVersion {}

impl PartialOrd for FormatVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FormatVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|idx| self.component(idx).cmp(&other.component(idx)))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::FormatVersion;
    use serde_json::json;

    #[test]
    fn parse_rejects_non_numeric_markers() {
        assert!(FormatVersion::parse("4.x").is_none());
        assert!(FormatVersion::parse("").is_none());
        assert!(FormatVersion::parse("v4").is_none());
    }

    #[test]
    fn comparison_is_component_wise() {
        let v2 = FormatVersion::parse("2.0").unwrap();
        let v4 = FormatVersion::parse("4").unwrap();
        let v4_10 = FormatVersion::parse("4.10").unwrap();
        let v4_9 = FormatVersion::parse("4.9").unwrap();

        assert!(v2 < v4);
        assert_eq!(v4, FormatVersion::current());
        assert!(v4_10 > v4_9);
    }

    #[test]
    fn from_value_accepts_numbers_and_strings() {
        assert_eq!(
            FormatVersion::from_value(&json!(3.0)).unwrap(),
            FormatVersion::parse("3").unwrap()
        );
        assert_eq!(FormatVersion::from_value(&json!("7.1")).unwrap().as_str(), "7.1");
        assert!(FormatVersion::from_value(&json!(null)).is_none());
    }
}
