//! Keyed parity comparison of two canonical arrays.

use crate::extract::read_input;
use crate::model::CanonicalRecord;
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Fields compared for every key present on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Kind,
    StepName,
    Status,
    Value,
    Units,
    Timestamp,
    Low,
    LowComp,
    High,
    HighComp,
    Expected,
    ExpectedComp,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::Kind,
        Field::StepName,
        Field::Status,
        Field::Value,
        Field::Units,
        Field::Timestamp,
        Field::Low,
        Field::LowComp,
        Field::High,
        Field::HighComp,
        Field::Expected,
        Field::ExpectedComp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Kind => "Kind",
            Field::StepName => "StepName",
            Field::Status => "Status",
            Field::Value => "Value",
            Field::Units => "Units",
            Field::Timestamp => "Timestamp",
            Field::Low => "Limits.Low",
            Field::LowComp => "Limits.LowComp",
            Field::High => "Limits.High",
            Field::HighComp => "Limits.HighComp",
            Field::Expected => "Limits.Expected",
            Field::ExpectedComp => "Limits.ExpectedComp",
        }
    }

    fn read(self, record: &CanonicalRecord) -> Option<&str> {
        let limits = &record.limits;
        match self {
            Field::Kind => Some(&record.kind),
            Field::StepName => Some(&record.step_name),
            Field::Status => Some(&record.status),
            Field::Value => Some(&record.value),
            Field::Units => Some(&record.units),
            Field::Timestamp => Some(&record.timestamp),
            Field::Low => limits.low.as_deref(),
            Field::LowComp => Some(&limits.low_comp),
            Field::High => limits.high.as_deref(),
            Field::HighComp => Some(&limits.high_comp),
            Field::Expected => limits.expected.as_deref(),
            Field::ExpectedComp => Some(&limits.expected_comp),
        }
    }
}

fn parse_number(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok()
}

/// String-first equality with a numeric fallback.
///
/// Both operands are trimmed, absent counts as empty. Exact match, then case-insensitive match,
/// then numeric equality when both sides parse as numbers.
pub fn values_equal(a: Option<&str>, b: Option<&str>) -> bool {
    let a = a.unwrap_or_default().trim();
    let b = b.unwrap_or_default().trim();
    if a == b {
        return true;
    }
    if a.to_lowercase() == b.to_lowercase() {
        return true;
    }
    match (parse_number(a), parse_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMismatch {
    pub field: &'static str,
    pub reference: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorruptedRecord {
    pub key: String,
    pub fields: Vec<FieldMismatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Reference,
    Subject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateKey {
    pub side: Side,
    pub key: String,
    pub occurrences: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParitySummary {
    pub reference_records: usize,
    pub subject_records: usize,
    pub dropped: usize,
    pub hallucinated: usize,
    pub corrupted: usize,
    pub duplicate_keys: usize,
    pub pass: bool,
}

impl fmt::Display for ParitySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "records: reference={} subject={}",
            self.reference_records, self.subject_records
        )?;
        writeln!(f, "dropped: {}", self.dropped)?;
        writeln!(f, "hallucinated: {}", self.hallucinated)?;
        writeln!(f, "corrupted: {}", self.corrupted)?;
        writeln!(f, "duplicate keys: {}", self.duplicate_keys)?;
        write!(f, "parity: {}", if self.pass { "PASS" } else { "FAIL" })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParityReport {
    pub summary: ParitySummary,
    pub dropped: Vec<CanonicalRecord>,
    pub hallucinated: Vec<CanonicalRecord>,
    pub corrupted: Vec<CorruptedRecord>,
    pub duplicate_keys: Vec<DuplicateKey>,
}

impl ParityReport {
    pub fn passed(&self) -> bool {
        self.summary.pass
    }

    /// `0` when parity holds, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.passed() { 0 } else { 1 }
    }
}

/// Builds the key map for one side. Later duplicates replace earlier ones; every duplicated key
/// is reported so the verdict cannot pass on a masked record.
fn index_side(
    records: &[CanonicalRecord],
    side: Side,
    duplicates: &mut Vec<DuplicateKey>,
) -> IndexMap<String, CanonicalRecord> {
    let mut map: IndexMap<String, CanonicalRecord> = IndexMap::with_capacity(records.len());
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for record in records {
        let key = record.identity();
        *counts.entry(key.clone()).or_insert(0) += 1;
        map.insert(key, record.clone());
    }
    duplicates.extend(
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(key, occurrences)| DuplicateKey {
                side,
                key,
                occurrences,
            }),
    );
    map
}

fn diff_fields(reference: &CanonicalRecord, subject: &CanonicalRecord) -> Vec<FieldMismatch> {
    Field::ALL
        .into_iter()
        .filter_map(|field| {
            let a = field.read(reference);
            let b = field.read(subject);
            if values_equal(a, b) {
                return None;
            }
            Some(FieldMismatch {
                field: field.name(),
                reference: a.unwrap_or_default().to_string(),
                subject: b.unwrap_or_default().to_string(),
            })
        })
        .collect()
}

pub fn compare(reference: &[CanonicalRecord], subject: &[CanonicalRecord]) -> ParityReport {
    let mut duplicate_keys = Vec::new();
    let reference_map = index_side(reference, Side::Reference, &mut duplicate_keys);
    let mut subject_map = index_side(subject, Side::Subject, &mut duplicate_keys);

    let mut dropped = Vec::new();
    let mut corrupted = Vec::new();
    for (key, expected) in &reference_map {
        let Some(actual) = subject_map.shift_remove(key) else {
            dropped.push(expected.clone());
            continue;
        };
        let fields = diff_fields(expected, &actual);
        if !fields.is_empty() {
            corrupted.push(CorruptedRecord {
                key: key.clone(),
                fields,
            });
        }
    }
    let hallucinated: Vec<CanonicalRecord> = subject_map.into_values().collect();

    let pass = dropped.is_empty()
        && hallucinated.is_empty()
        && corrupted.is_empty()
        && duplicate_keys.is_empty();
    tracing::debug!(
        dropped = dropped.len(),
        hallucinated = hallucinated.len(),
        corrupted = corrupted.len(),
        duplicates = duplicate_keys.len(),
        pass,
        "comparison complete"
    );

    ParityReport {
        summary: ParitySummary {
            reference_records: reference.len(),
            subject_records: subject.len(),
            dropped: dropped.len(),
            hallucinated: hallucinated.len(),
            corrupted: corrupted.len(),
            duplicate_keys: duplicate_keys.len(),
            pass,
        },
        dropped,
        hallucinated,
        corrupted,
        duplicate_keys,
    }
}

/// Loads a canonical array written by either extractor (or any producer of the same shape).
pub fn read_canonical_array(path: &Path) -> Result<Vec<CanonicalRecord>> {
    let text = read_input(path)?;
    let origin = path.display().to_string();
    if text.trim().is_empty() {
        return Err(Error::EmptyInput { origin });
    }
    serde_json::from_str(&text).map_err(|e| Error::MalformedInput {
        origin,
        message: e.to_string(),
    })
}
