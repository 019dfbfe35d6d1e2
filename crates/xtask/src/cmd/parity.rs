use crate::XtaskError;
use crate::cmd::{list_source_fixtures, parse_filter, workspace_root};
use std::path::Path;
use trparity_core::{
    ExtractOptions, compare, extract_embedded_str, extract_source_file, read_canonical_array,
    render_annotated_html,
};

/// Checks one fixture two ways: the reference array against its golden snapshot, and against the
/// array re-derived from an annotated artifact rendered from it.
fn check_fixture(xml_path: &Path, options: &ExtractOptions) -> Result<(), String> {
    let reference = extract_source_file(xml_path, options).map_err(|e| e.to_string())?;

    let golden_path = xml_path.with_extension("golden.json");
    let golden = read_canonical_array(&golden_path)
        .map_err(|e| format!("{e} (generate with `cargo run -p xtask -- update-snapshots`)"))?;
    let against_golden = compare(&golden, &reference);
    if !against_golden.passed() {
        return Err(format!(
            "golden mismatch\n{}\n(update with `cargo run -p xtask -- update-snapshots`)",
            against_golden.summary
        ));
    }

    let html = render_annotated_html(&reference, "parity", &options.annotation_prefix);
    let embedded = extract_embedded_str(&html, "annotated", options).map_err(|e| e.to_string())?;
    if !embedded.warnings.is_empty() {
        return Err(format!("{} fragment(s) skipped", embedded.warnings.len()));
    }
    let round_trip = compare(&reference, &embedded.records);
    if !round_trip.passed() {
        return Err(format!("round trip mismatch\n{}", round_trip.summary));
    }
    Ok(())
}

pub(crate) fn check_parity(args: Vec<String>) -> Result<(), XtaskError> {
    let filter = parse_filter(&args)?;
    let fixtures_root = workspace_root().join("fixtures");
    let xml_files = list_source_fixtures(&fixtures_root, filter.as_deref());
    if xml_files.is_empty() {
        return Err(XtaskError::ParityCheckFailed(format!(
            "no .xml fixtures found under {}",
            fixtures_root.display()
        )));
    }

    let options = ExtractOptions::default();
    let mut failures = Vec::new();
    let total = xml_files.len();
    for xml_path in xml_files {
        if let Err(msg) = check_fixture(&xml_path, &options) {
            failures.push(format!("{}: {msg}", xml_path.display()));
        }
    }

    println!("parity: {}/{total} fixture(s) ok", total - failures.len());
    if failures.is_empty() {
        return Ok(());
    }

    Err(XtaskError::ParityCheckFailed(failures.join("\n")))
}
