pub(crate) mod parity;
pub(crate) mod snapshots;
pub(crate) mod verify;

pub(crate) use parity::*;
pub(crate) use snapshots::*;
pub(crate) use verify::*;

use crate::XtaskError;
use std::fs;
use std::path::{Path, PathBuf};

pub(crate) fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Parses the `[--filter <substr>]` tail shared by the fixture commands.
pub(crate) fn parse_filter(args: &[String]) -> Result<Option<String>, XtaskError> {
    let mut filter = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--filter" => {
                i += 1;
                filter = Some(args.get(i).ok_or(XtaskError::Usage)?.to_string());
            }
            "--help" | "-h" => return Err(XtaskError::Usage),
            _ => return Err(XtaskError::Usage),
        }
        i += 1;
    }
    Ok(filter)
}

/// Every `*.xml` under `root`, sorted, optionally narrowed by file-name substring.
pub(crate) fn list_source_fixtures(root: &Path, filter: Option<&str>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if path.extension().is_some_and(|e| e == "xml") {
                out.push(path);
            }
        }
    }
    out.sort();
    if let Some(f) = filter {
        out.retain(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(f))
        });
    }
    out
}
