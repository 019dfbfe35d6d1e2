//! Raw field → canonical string normalization.
//!
//! Nothing here fails: unparseable timestamps and unknown comparator tokens are passed through
//! unchanged so the comparator can still characterize them.

use crate::model::{COMPARATOR_NONE, Limits};
use crate::source::{NodeShape, RawLimit, RawLimits, SourceNode};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Canonical per-node fields, ready to be combined with an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFields {
    pub status: String,
    pub value: String,
    pub units: String,
    pub limits: Limits,
    pub timestamp: String,
}

pub fn text_or_empty(raw: Option<&str>) -> String {
    raw.map(str::to_string).unwrap_or_default()
}

const LOCAL_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        // Keep the wall clock as written; converting to the machine's zone would make output
        // depend on where the extractor runs.
        return Some(dt.naive_local());
    }
    for fmt in LOCAL_TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Renders a timestamp as `HH:MM:SS - DDMonYYYY`, upper-cased (`14:02:11 - 05MAR2024`).
pub fn normalize_timestamp(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    if raw.trim().is_empty() {
        return String::new();
    }
    match parse_timestamp(raw) {
        Some(dt) => dt.format("%H:%M:%S - %d%b%Y").to_string().to_uppercase(),
        None => {
            tracing::debug!(raw, "timestamp not recognized; passing through");
            raw.to_string()
        }
    }
}

fn comparator_alias(token: &str) -> Option<&'static str> {
    let folded: String = token
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .collect::<String>()
        .to_lowercase();
    let canonical = match folded.as_str() {
        "ge"
        | "gte"
        | ">="
        | "&gt;="
        | "=>"
        | "≥"
        | "greaterorequal"
        | "greaterthanorequal"
        | "greaterthanorequalto" => "GE",
        "gt" | ">" | "&gt;" | "greater" | "greaterthan" => "GT",
        "le"
        | "lte"
        | "<="
        | "&lt;="
        | "=<"
        | "≤"
        | "lessorequal"
        | "lessthanorequal"
        | "lessthanorequalto" => "LE",
        "lt" | "<" | "&lt;" | "less" | "lessthan" => "LT",
        "eq" | "=" | "==" | "equal" | "equals" | "equalto" => "EQ",
        "ne" | "!=" | "<>" | "&lt;&gt;" | "≠" | "notequal" | "notequalto" => "NE",
        "none" => COMPARATOR_NONE,
        _ => return None,
    };
    Some(canonical)
}

/// Maps comparator aliases onto `GE|GT|LE|LT|EQ|NE`.
///
/// Absent or blank input yields `NONE`; unrecognized tokens are returned unchanged.
pub fn normalize_comparator(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return COMPARATOR_NONE.to_string();
    };
    match comparator_alias(raw) {
        Some(canonical) => canonical.to_string(),
        None => {
            tracing::debug!(raw, "unknown comparator token; passing through");
            raw.to_string()
        }
    }
}

fn is_greater_family(comparator: &str) -> bool {
    matches!(comparator, "GE" | "GT")
}

fn is_lesser_family(comparator: &str) -> bool {
    matches!(comparator, "LE" | "LT")
}

fn limit_value(limit: &RawLimit) -> Option<String> {
    limit.value.clone().filter(|v| !v.trim().is_empty())
}

/// Applies the limit policy: either independent low/high bounds or a single expected value.
pub fn normalize_limits(raw: &RawLimits) -> Limits {
    let mut limits = Limits::default();
    match raw {
        RawLimits::Absent => {}
        RawLimits::Bounds(entries) => {
            let normalized: Vec<(String, &RawLimit)> = entries
                .iter()
                .map(|e| (normalize_comparator(e.comparator.as_deref()), e))
                .collect();
            if let Some((comp, entry)) = normalized.iter().find(|(c, _)| is_greater_family(c)) {
                limits.low = limit_value(entry);
                limits.low_comp = comp.clone();
            }
            if let Some((comp, entry)) = normalized.iter().find(|(c, _)| is_lesser_family(c)) {
                limits.high = limit_value(entry);
                limits.high_comp = comp.clone();
            }
        }
        RawLimits::Expected(entry) => {
            limits.expected = limit_value(entry);
            limits.expected_comp = normalize_comparator(entry.comparator.as_deref());
        }
    }
    limits
}

pub fn normalize_node(node: &SourceNode) -> NormalizedFields {
    let data = match &node.shape {
        NodeShape::Group | NodeShape::Step(None) => None,
        NodeShape::Step(Some(data)) | NodeShape::Measurement(data) => Some(data),
    };
    NormalizedFields {
        status: text_or_empty(node.status.as_deref()),
        value: text_or_empty(data.and_then(|d| d.value.as_deref())),
        units: text_or_empty(data.and_then(|d| d.units.as_deref())),
        limits: data
            .map(|d| normalize_limits(&d.limits))
            .unwrap_or_default(),
        timestamp: normalize_timestamp(node.timestamp.as_deref()),
    }
}
