use crate::XtaskError;
use crate::cmd::{list_source_fixtures, parse_filter, workspace_root};
use std::fs;
use trparity_core::{ExtractOptions, extract_source_file};

pub(crate) fn update_snapshots(args: Vec<String>) -> Result<(), XtaskError> {
    let filter = parse_filter(&args)?;
    let fixtures_root = workspace_root().join("fixtures");
    let xml_files = list_source_fixtures(&fixtures_root, filter.as_deref());
    if xml_files.is_empty() {
        return Err(XtaskError::SnapshotUpdateFailed(format!(
            "no .xml fixtures found under {}",
            fixtures_root.display()
        )));
    }

    let options = ExtractOptions::default();
    let mut failures = Vec::new();
    let mut written = 0usize;

    for xml_path in xml_files {
        let records = match extract_source_file(&xml_path, &options) {
            Ok(v) => v,
            Err(err) => {
                failures.push(format!("extraction failed for {}: {err}", xml_path.display()));
                continue;
            }
        };

        let pretty = match serde_json::to_string_pretty(&records) {
            Ok(v) => v,
            Err(err) => {
                failures.push(format!(
                    "failed to serialize JSON for {}: {err}",
                    xml_path.display()
                ));
                continue;
            }
        };

        let out_path = xml_path.with_extension("golden.json");
        if let Err(err) = fs::write(&out_path, format!("{pretty}\n")) {
            failures.push(format!("failed to write {}: {err}", out_path.display()));
            continue;
        }
        written += 1;
    }

    println!("updated {written} snapshot(s)");
    if failures.is_empty() {
        return Ok(());
    }

    Err(XtaskError::SnapshotUpdateFailed(failures.join("\n")))
}
