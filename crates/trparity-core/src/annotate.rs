//! Minimal annotated artifact writer.
//!
//! Emits one `<li>` per record with every annotation attribute present. The markup carries no
//! styling; real report renderers only need to reproduce the attributes.

use crate::model::CanonicalRecord;
use std::fmt::Write as _;

fn annotation_pairs(record: &CanonicalRecord) -> [(&'static str, String); 14] {
    let limits = &record.limits;
    [
        ("path", record.path.clone()),
        ("ordinal", record.execution_ordinal.to_string()),
        ("kind", record.kind.clone()),
        ("name", record.step_name.clone()),
        ("status", record.status.clone()),
        ("value", record.value.clone()),
        ("units", record.units.clone()),
        ("low", limits.low.clone().unwrap_or_default()),
        ("lowcomp", limits.low_comp.clone()),
        ("high", limits.high.clone().unwrap_or_default()),
        ("highcomp", limits.high_comp.clone()),
        ("expected", limits.expected.clone().unwrap_or_default()),
        ("expectedcomp", limits.expected_comp.clone()),
        ("timestamp", record.timestamp.clone()),
    ]
}

pub fn render_annotated_html(records: &[CanonicalRecord], title: &str, prefix: &str) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", htmlize::escape_text(title));
    out.push_str("</head>\n<body>\n<ol class=\"tr-records\">\n");

    for record in records {
        out.push_str("<li");
        for (key, value) in annotation_pairs(record) {
            let _ = write!(
                out,
                " {prefix}{key}=\"{}\"",
                htmlize::escape_attribute(value.as_str())
            );
        }
        let _ = writeln!(
            out,
            ">{}</li>",
            htmlize::escape_text(record.step_name.as_str())
        );
    }

    out.push_str("</ol>\n</body>\n</html>\n");
    out
}
