//! Subject extraction: annotated artifact → canonical record array.
//!
//! Only the per-fragment annotations are read. Tags, nesting, classes and text content of the
//! artifact are irrelevant, so any renderer that honours the annotation contract can be checked.

use crate::extract::read_input;
use crate::model::{CanonicalRecord, KIND_UNKNOWN, Limits, canonical_key};
use crate::normalize::{normalize_comparator, normalize_timestamp, text_or_empty};
use crate::{Error, ExtractOptions, Result};
use lol_html::{RewriteStrSettings, element, rewrite_str};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::cell::RefCell;
use std::path::Path;

/// Annotation keys, one per canonical field. Attribute names are `<prefix><key>`.
pub const ANNOTATION_KEYS: [&str; 14] = [
    "path",
    "ordinal",
    "kind",
    "name",
    "status",
    "value",
    "units",
    "low",
    "lowcomp",
    "high",
    "highcomp",
    "expected",
    "expectedcomp",
    "timestamp",
];

/// An element carrying at least one annotation, with decoded values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub tag: String,
    pub annotations: FxHashMap<String, String>,
}

impl Fragment {
    fn get(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

/// A fragment that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationWarning {
    /// Zero-based position of the fragment in document order.
    pub fragment: usize,
    pub tag: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct EmbeddedExtraction {
    pub records: Vec<CanonicalRecord>,
    pub warnings: Vec<AnnotationWarning>,
}

/// Collects annotated fragments in document order.
///
/// `lol_html` hands out attribute values raw, so entities are decoded here.
pub fn scan_fragments(html: &str, prefix: &str) -> std::result::Result<Vec<Fragment>, String> {
    let fragments: RefCell<Vec<Fragment>> = RefCell::new(Vec::new());
    let prefix = prefix.to_ascii_lowercase();

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                let mut annotations = FxHashMap::default();
                for attr in el.attributes() {
                    let name = attr.name().to_ascii_lowercase();
                    let Some(key) = name.strip_prefix(prefix.as_str()) else {
                        continue;
                    };
                    if !ANNOTATION_KEYS.contains(&key) {
                        continue;
                    }
                    let raw = attr.value();
                    annotations.insert(key.to_string(), htmlize::unescape(&raw).into_owned());
                }
                if !annotations.is_empty() {
                    fragments.borrow_mut().push(Fragment {
                        tag: el.tag_name(),
                        annotations,
                    });
                }
                Ok(())
            })],
            ..RewriteStrSettings::new()
        },
    )
    .map_err(|e| e.to_string())?;

    Ok(fragments.into_inner())
}

fn parse_ordinal(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

fn record_from_fragment(fragment: &Fragment) -> std::result::Result<CanonicalRecord, String> {
    let missing: Vec<&str> = ["path", "ordinal"]
        .into_iter()
        .filter(|k| fragment.get(k).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(format!("missing required annotation(s): {}", missing.join(", ")));
    }
    let path = fragment.get("path").unwrap_or_default().to_string();
    let raw_ordinal = fragment.get("ordinal").unwrap_or_default();
    let Some(ordinal) = parse_ordinal(raw_ordinal) else {
        return Err(format!("ordinal annotation `{raw_ordinal}` is not a positive integer"));
    };

    let limit_value = |key: &str| {
        fragment
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
    };
    Ok(CanonicalRecord {
        canonical_key: canonical_key(&path, ordinal),
        execution_ordinal: ordinal,
        path,
        kind: fragment.get("kind").unwrap_or(KIND_UNKNOWN).to_string(),
        step_name: text_or_empty(fragment.get("name")),
        status: text_or_empty(fragment.get("status")),
        value: text_or_empty(fragment.get("value")),
        units: text_or_empty(fragment.get("units")),
        limits: Limits {
            low: limit_value("low"),
            low_comp: normalize_comparator(fragment.get("lowcomp")),
            high: limit_value("high"),
            high_comp: normalize_comparator(fragment.get("highcomp")),
            expected: limit_value("expected"),
            expected_comp: normalize_comparator(fragment.get("expectedcomp")),
        },
        timestamp: normalize_timestamp(fragment.get("timestamp")),
    })
}

pub fn extract_embedded_str(
    html: &str,
    origin: &str,
    options: &ExtractOptions,
) -> Result<EmbeddedExtraction> {
    if html.trim().is_empty() {
        return Err(Error::EmptyInput {
            origin: origin.to_string(),
        });
    }
    let fragments = scan_fragments(html, &options.annotation_prefix).map_err(|message| {
        Error::MalformedInput {
            origin: origin.to_string(),
            message,
        }
    })?;

    let mut out = EmbeddedExtraction::default();
    for (index, fragment) in fragments.iter().enumerate() {
        match record_from_fragment(fragment) {
            Ok(record) => out.records.push(record),
            Err(message) => {
                tracing::warn!(
                    fragment = index,
                    tag = %fragment.tag,
                    "{message}; fragment skipped"
                );
                out.warnings.push(AnnotationWarning {
                    fragment: index,
                    tag: fragment.tag.clone(),
                    message,
                });
            }
        }
    }

    if out.records.is_empty() {
        return Err(Error::StructuralEmpty {
            origin: origin.to_string(),
        });
    }
    tracing::debug!(
        origin,
        records = out.records.len(),
        skipped = out.warnings.len(),
        "embedded extraction complete"
    );
    Ok(out)
}

pub fn extract_embedded_file(path: &Path, options: &ExtractOptions) -> Result<EmbeddedExtraction> {
    let text = read_input(path)?;
    extract_embedded_str(&text, &path.display().to_string(), options)
}
