//! Reference extraction: source XML → canonical record array.

use crate::flatten::flatten;
use crate::model::CanonicalRecord;
use crate::normalize::normalize_node;
use crate::resolve::PathOrdinalResolver;
use crate::source::SourceDocument;
use crate::{Error, ExtractOptions, Result};
use rustc_hash::FxHashSet;
use std::path::Path;

/// Reads a whole input file, distinguishing a missing path from other I/O failures.
pub(crate) fn read_input(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::InputNotFound {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path).map_err(|source| Error::ReadInput {
        path: path.display().to_string(),
        source,
    })
}

pub(crate) fn ensure_unique_keys(records: &[CanonicalRecord], origin: &str) -> Result<()> {
    let mut seen = FxHashSet::default();
    for record in records {
        if !seen.insert(record.canonical_key.as_str()) {
            return Err(Error::DuplicateKey {
                origin: origin.to_string(),
                key: record.canonical_key.clone(),
            });
        }
    }
    Ok(())
}

/// Extracts the reference array from source text. `origin` names the input in errors.
pub fn extract_source_str(
    text: &str,
    origin: &str,
    options: &ExtractOptions,
) -> Result<Vec<CanonicalRecord>> {
    let doc = SourceDocument::parse(text, origin)?;
    let nodes = flatten(&doc);
    if nodes.is_empty() {
        return Err(Error::StructuralEmpty {
            origin: origin.to_string(),
        });
    }

    let mut resolver = PathOrdinalResolver::new(options.placeholder_segment.as_str());
    let mut records = Vec::with_capacity(nodes.len());
    for flat in nodes {
        let kind = flat.kind();
        let identity = resolver.resolve(flat.depth, &flat.name, kind);
        if identity.synthesized_segments > 0 {
            tracing::warn!(
                key = %identity.canonical_key,
                synthesized = identity.synthesized_segments,
                "path contains synthesized ancestor segments"
            );
        }
        let fields = normalize_node(&flat.node);
        records.push(CanonicalRecord {
            canonical_key: identity.canonical_key,
            execution_ordinal: identity.ordinal,
            path: identity.path,
            kind: kind.to_string(),
            step_name: flat.name,
            status: fields.status,
            value: fields.value,
            units: fields.units,
            limits: fields.limits,
            timestamp: fields.timestamp,
        });
    }

    ensure_unique_keys(&records, origin)?;
    tracing::debug!(
        origin,
        records = records.len(),
        "source extraction complete"
    );
    Ok(records)
}

pub fn extract_source_file(path: &Path, options: &ExtractOptions) -> Result<Vec<CanonicalRecord>> {
    let text = read_input(path)?;
    extract_source_str(&text, &path.display().to_string(), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Limits;

    const COLD_START: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<trc:TestResults xmlns:trc="urn:IEEE-1636.1:2011:01:TestResultsCollection"
                 xmlns:tr="urn:IEEE-1636.1:2011:01:TestResults"
                 xmlns:c="urn:IEEE-1671:2010:Common">
  <tr:ResultSet ID="rs-1" name="UUT_Test#123" startDateTime="2024-03-05T14:02:11">
    <tr:Outcome value="Passed"/>
    <tr:TestGroup ID="g-1" name="Cold_Start" startDateTime="2024-03-05T14:02:12">
      <tr:Outcome value="Passed"/>
      <tr:Test ID="t-1" name="Voltage_Check" startDateTime="2024-03-05T14:02:13.250">
        <tr:Outcome value="Passed"/>
        <tr:TestResult ID="r-1" name="Voltage">
          <tr:TestData><c:Datum value="5" nonStandardUnit="V"/></tr:TestData>
          <tr:TestLimits><tr:Limits>
            <c:LimitPair operator="AND">
              <c:Limit comparator="GE"><c:Datum value="4.5"/></c:Limit>
              <c:Limit comparator="LE"><c:Datum value="5.5"/></c:Limit>
            </c:LimitPair>
          </tr:Limits></tr:TestLimits>
        </tr:TestResult>
      </tr:Test>
    </tr:TestGroup>
  </tr:ResultSet>
</trc:TestResults>"#;

    #[test]
    fn cold_start_measurement_record() {
        let records = extract_source_str(COLD_START, "inline", &ExtractOptions::default()).unwrap();
        assert_eq!(records.len(), 3);

        let m = &records[2];
        assert_eq!(m.path, "UUT Test/Cold_Start/Voltage_Check");
        assert_eq!(m.canonical_key, "UUT Test/Cold_Start/Voltage_Check|1");
        assert_eq!(m.execution_ordinal, 1);
        assert_eq!(m.kind, "Measurement");
        assert_eq!(m.step_name, "Voltage_Check");
        assert_eq!(m.status, "Passed");
        assert_eq!(m.value, "5");
        assert_eq!(m.units, "V");
        assert_eq!(m.timestamp, "14:02:13 - 05MAR2024");
        assert_eq!(
            m.limits,
            Limits {
                low: Some("4.5".into()),
                low_comp: "GE".into(),
                high: Some("5.5".into()),
                high_comp: "LE".into(),
                expected: None,
                expected_comp: "NONE".into(),
            }
        );

        assert_eq!(records[0].path, "UUT Test");
        assert_eq!(records[0].step_name, "UUT Test");
        assert_eq!(records[0].kind, "Group");
        assert_eq!(records[1].path, "UUT Test/Cold_Start");
    }

    #[test]
    fn extraction_is_deterministic() {
        let opts = ExtractOptions::default();
        let a = extract_source_str(COLD_START, "inline", &opts).unwrap();
        let b = extract_source_str(COLD_START, "inline", &opts).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn same_named_siblings_get_distinct_keys() {
        let xml = r#"<ResultSet name="Loop.seq">
            <Test name="Sample"><Outcome value="Passed"/></Test>
            <Test name="Sample"><Outcome value="Failed"/></Test>
          </ResultSet>"#;
        let records = extract_source_str(xml, "inline", &ExtractOptions::default()).unwrap();
        assert_eq!(records[1].path, records[2].path);
        assert_eq!(records[1].canonical_key, "Loop/Sample|1");
        assert_eq!(records[2].canonical_key, "Loop/Sample|2");
        assert_eq!(records[2].status, "Failed");
    }

    #[test]
    fn group_and_leaf_sharing_a_name_is_a_duplicate_key() {
        let xml = r#"<ResultSet name="Dup.seq">
            <TestGroup name="X"/>
            <Test name="X"/>
          </ResultSet>"#;
        let err = extract_source_str(xml, "inline", &ExtractOptions::default()).unwrap_err();
        assert!(
            matches!(err, Error::DuplicateKey { ref key, .. } if key == "Dup/X|1"),
            "{err}"
        );
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn slash_in_a_name_does_not_collide_with_a_nested_path() {
        let xml = r#"<ResultSet name="Board.seq">
            <TestGroup name="A"><Test name="B"/></TestGroup>
            <Test name="A/B"/>
          </ResultSet>"#;
        let records = extract_source_str(xml, "inline", &ExtractOptions::default()).unwrap();
        let keys: Vec<&str> = records.iter().map(|r| r.canonical_key.as_str()).collect();
        assert_eq!(
            keys,
            vec!["Board|1", "Board/A|1", "Board/A/B|1", "Board/A%2FB|1"]
        );
        assert_eq!(records[3].step_name, "A/B");
        assert_eq!(records[3].path.split('/').count(), 2);
    }

    #[test]
    fn empty_top_level_name_keeps_its_segment() {
        let xml = r##"<TestResults>
            <ResultSet name="#Main"><Test name="x"/></ResultSet>
            <ResultSet name="x.seq"/>
          </TestResults>"##;
        let records = extract_source_str(xml, "inline", &ExtractOptions::default()).unwrap();
        let keys: Vec<&str> = records.iter().map(|r| r.canonical_key.as_str()).collect();
        assert_eq!(keys, vec!["Unknown|1", "Unknown/x|1", "x|1"]);
        assert_eq!(records[0].step_name, "");

        let opts = ExtractOptions::default().with_placeholder_segment("Unnamed");
        let records = extract_source_str(xml, "inline", &opts).unwrap();
        assert_eq!(records[1].path, "Unnamed/x");
    }

    #[test]
    fn structural_and_validation_failures() {
        let opts = ExtractOptions::default();

        let err = extract_source_str("<TestResults/>", "inline", &opts).unwrap_err();
        assert!(matches!(err, Error::StructuralEmpty { .. }), "{err}");
        assert_eq!(err.exit_code(), 2);

        let err = extract_source_str("", "inline", &opts).unwrap_err();
        assert!(matches!(err, Error::EmptyInput { .. }), "{err}");
        assert_eq!(err.exit_code(), 1);

        let err = extract_source_str("not xml at all", "inline", &opts).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }), "{err}");
        assert_eq!(err.exit_code(), 1);

        let err = extract_source_file(Path::new("/definitely/not/here.xml"), &opts).unwrap_err();
        assert!(matches!(err, Error::InputNotFound { .. }), "{err}");
        assert_eq!(err.exit_code(), 1);
    }
}
