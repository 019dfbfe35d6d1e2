use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture(name: &str) -> PathBuf {
    let path = repo_root().join("fixtures").join("atml").join(name);
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

fn trparity() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("trparity"));
    cmd.current_dir(repo_root());
    cmd
}

fn arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read json")).expect("valid json")
}

#[test]
fn extract_prints_the_golden_array() {
    let source = fixture("cold_start.xml");
    let golden = read_json(&source.with_extension("golden.json"));

    let output = trparity()
        .args(["extract", arg(&source).as_str()])
        .output()
        .expect("run trparity");
    assert!(output.status.success(), "{output:?}");

    let actual: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(actual, golden);
}

#[test]
fn extract_missing_input_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");
    trparity()
        .args(["extract", arg(&tmp.path().join("nope.xml")).as_str()])
        .assert()
        .code(1);
}

#[test]
fn extract_malformed_input_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("broken.xml");
    fs::write(&src, "<TestResults><ResultSet name=\"x\">").unwrap();
    trparity()
        .args(["extract", arg(&src).as_str()])
        .assert()
        .code(1);
}

#[test]
fn extract_structurally_empty_input_exits_2() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("empty.xml");
    let out = tmp.path().join("out.json");
    fs::write(&src, "<TestResults/>").unwrap();
    trparity()
        .args(["extract", "--out", arg(&out).as_str(), arg(&src).as_str()])
        .assert()
        .code(2);
    assert!(!out.exists(), "no output may be written on failure");
}

#[test]
fn extract_placeholder_replaces_empty_segments() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let src = tmp.path().join("unnamed.xml");
    let xml = r##"<ResultSet name="#Main"><Test name="x"/></ResultSet>"##;
    fs::write(&src, xml).unwrap();

    let output = trparity()
        .args(["extract", "--placeholder", "Unnamed", arg(&src).as_str()])
        .output()
        .expect("run trparity");
    assert!(output.status.success(), "{output:?}");
    let records: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(records[0]["CanonicalKey"], "Unnamed|1");
    assert_eq!(records[1]["Path"], "Unnamed/x");

    for bad in ["a/b", "a|b", ""] {
        trparity()
            .args(["extract", "--placeholder", bad, arg(&src).as_str()])
            .assert()
            .code(2);
    }
}

#[test]
fn annotation_prefix_is_shared_by_annotate_and_extract_embedded() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let source = fixture("cold_start.xml");
    let html = tmp.path().join("report.html");
    let subject = tmp.path().join("subject.json");

    trparity()
        .args(["annotate", "--annotation-prefix", "data-x-"])
        .args(["--out", arg(&html).as_str(), arg(&source).as_str()])
        .assert()
        .success();
    let text = fs::read_to_string(&html).unwrap();
    assert!(text.contains(" data-x-path=\""), "{text}");
    assert!(!text.contains("data-tr-"), "{text}");

    trparity()
        .args(["extract-embedded", "--annotation-prefix", "data-x-"])
        .args(["--out", arg(&subject).as_str(), arg(&html).as_str()])
        .assert()
        .success();
    assert_eq!(
        read_json(&subject),
        read_json(&source.with_extension("golden.json"))
    );

    // The default prefix finds nothing in this artifact.
    trparity()
        .args(["extract-embedded", arg(&html).as_str()])
        .assert()
        .code(2);
}

#[test]
fn annotate_extract_embedded_compare_round_trip() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let reference = tmp.path().join("reference.json");
    let html = tmp.path().join("report.html");
    let subject = tmp.path().join("subject.json");
    let diff = tmp.path().join("diff.json");

    for name in [
        "cold_start.xml",
        "retry_loop.xml",
        "multi_uut.xml",
        "odd_names.xml",
    ] {
        let source = fixture(name);
        trparity()
            .args(["extract", "--pretty", "--out", arg(&reference).as_str()])
            .arg(&source)
            .assert()
            .success();
        trparity()
            .args(["annotate", "--out", arg(&html).as_str()])
            .arg(&source)
            .assert()
            .success();
        trparity()
            .args(["extract-embedded", "--out", arg(&subject).as_str()])
            .arg(&html)
            .assert()
            .success();

        let output = trparity()
            .args(["compare", "--out", arg(&diff).as_str()])
            .args([&reference, &subject])
            .output()
            .expect("run trparity");
        assert_eq!(output.status.code(), Some(0), "{name}: {output:?}");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("parity: PASS"), "{name}: {stdout}");

        let report = read_json(&diff);
        assert_eq!(report["summary"]["pass"], Value::Bool(true), "{name}");
    }
}

#[test]
fn compare_reports_dropped_records_and_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let reference = fixture("cold_start.golden.json");
    let mut records: Vec<Value> =
        serde_json::from_str(&fs::read_to_string(&reference).unwrap()).unwrap();
    let removed = records.remove(2);
    let subject = tmp.path().join("subject.json");
    fs::write(&subject, serde_json::to_string(&records).unwrap()).unwrap();
    let diff = tmp.path().join("diff.json");

    let output = trparity()
        .args(["compare", "--pretty", "--out", arg(&diff).as_str()])
        .args([&reference, &subject])
        .output()
        .expect("run trparity");
    assert_eq!(output.status.code(), Some(1), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("dropped: 1"), "{stdout}");
    assert!(stdout.contains("parity: FAIL"), "{stdout}");

    let report = read_json(&diff);
    assert_eq!(
        report["dropped"][0]["CanonicalKey"],
        removed["CanonicalKey"]
    );
    assert_eq!(report["hallucinated"], Value::Array(Vec::new()));
    assert_eq!(report["corrupted"], Value::Array(Vec::new()));
}

#[test]
fn compare_unreadable_input_exits_2() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let bad = tmp.path().join("bad.json");
    fs::write(&bad, "{ not an array").unwrap();
    trparity()
        .arg("compare")
        .args([&fixture("cold_start.golden.json"), &bad])
        .assert()
        .code(2);
}

#[test]
fn closed_stdout_fails_without_panicking() {
    let source = fixture("retry_loop.xml");
    let mut child = trparity()
        .args(["extract", "--pretty"])
        .arg(&source)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn trparity");
    drop(child.stdout.take());
    let output = child.wait_with_output().expect("wait for trparity");

    // The write may land before the pipe closes; either way it must not panic.
    assert!(matches!(output.status.code(), Some(0 | 1)), "{output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("panicked"), "{stderr}");
}

#[test]
fn usage_errors_exit_2() {
    trparity().assert().code(2);
    trparity().args(["frobnicate"]).assert().code(2);
    trparity().args(["extract"]).assert().code(2);
    trparity()
        .arg("compare")
        .arg(fixture("cold_start.golden.json"))
        .assert()
        .code(2);
    trparity()
        .args(["extract", "--title", "x"])
        .arg(fixture("cold_start.xml"))
        .assert()
        .code(2);
}
