//! Canonical record model shared by both extractors and the comparator.
//!
//! Serialized field names are PascalCase and appear in declaration order; this shape is the
//! on-disk canonical array format.

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Path segment synthesized for ancestor depths that were never materialized as nodes.
pub const PLACEHOLDER_SEGMENT: &str = "Unknown";

/// Comparator value used when a node carries no comparator at all.
pub const COMPARATOR_NONE: &str = "NONE";

/// Kind reported by the embedded extractor when a fragment has no `kind` annotation.
pub const KIND_UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Group,
    Step,
    Measurement,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Group => "Group",
            NodeKind::Step => "Step",
            NodeKind::Measurement => "Measurement",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Limits {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub low: Option<String>,
    #[serde(default = "comparator_none", deserialize_with = "lenient_comparator")]
    pub low_comp: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub high: Option<String>,
    #[serde(default = "comparator_none", deserialize_with = "lenient_comparator")]
    pub high_comp: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub expected: Option<String>,
    #[serde(default = "comparator_none", deserialize_with = "lenient_comparator")]
    pub expected_comp: String,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            low: None,
            low_comp: comparator_none(),
            high: None,
            high_comp: comparator_none(),
            expected: None,
            expected_comp: comparator_none(),
        }
    }
}

/// One normalized group, step or measurement.
///
/// `kind` is kept as text rather than [`NodeKind`] because subject arrays (embedded extraction,
/// foreign producers) may carry kinds outside the enum, and the comparator has to report those
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CanonicalRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub canonical_key: String,
    #[serde(default, deserialize_with = "lenient_ordinal")]
    pub execution_ordinal: u32,
    #[serde(default, deserialize_with = "lenient_string")]
    pub path: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub step_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub units: String,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timestamp: String,
}

impl CanonicalRecord {
    /// The identity used by the comparator.
    ///
    /// Arrays written by this crate always carry `CanonicalKey`; for foreign arrays that omit it
    /// the key is derived from `Path` and `ExecutionOrdinal`.
    pub fn identity(&self) -> String {
        if self.canonical_key.trim().is_empty() {
            canonical_key(&self.path, self.execution_ordinal)
        } else {
            self.canonical_key.clone()
        }
    }
}

pub fn canonical_key(path: &str, ordinal: u32) -> String {
    format!("{path}|{ordinal}")
}

/// Encodes a node name as a single `Path` segment.
///
/// `%` becomes `%25` and `/` becomes `%2F`, so splitting a path on `/` always yields one entry
/// per depth. [`decode_segment`] reverses it.
pub fn encode_segment(name: &str) -> Cow<'_, str> {
    if !name.contains(['%', '/']) {
        return Cow::Borrowed(name);
    }
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

pub fn decode_segment(segment: &str) -> Cow<'_, str> {
    if !segment.contains('%') {
        return Cow::Borrowed(segment);
    }
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(i) = rest.find('%') {
        out.push_str(&rest[..i]);
        let tail = &rest[i..];
        if let Some(t) = tail.strip_prefix("%2F").or_else(|| tail.strip_prefix("%2f")) {
            out.push('/');
            rest = t;
        } else if let Some(t) = tail.strip_prefix("%25") {
            out.push('%');
            rest = t;
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn comparator_none() -> String {
    COMPARATOR_NONE.to_string()
}

fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(scalar_to_string(value).unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(scalar_to_string(value))
}

fn lenient_comparator<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(scalar_to_string(value)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(comparator_none))
}

fn lenient_ordinal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    let ordinal = match &value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    Ok(ordinal.unwrap_or(0))
}
