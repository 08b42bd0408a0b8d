use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::Value;

fn sentinel(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_aegis-sentinel"));
    cmd.current_dir(dir)
        .env_remove("AEGIS_EVALUATOR_CMD")
        .env_remove("AEGIS_EVALUATOR_URL")
        .env_remove("AEGIS_EVIDENCE_LOG")
        .env_remove("AEGIS_SNAPSHOT")
        .env_remove("AEGIS_AUDIT_LOG")
        .env_remove("AEGIS_EVALUATOR_TIMEOUT_MS")
        .env_remove("AEGIS_MAX_IN_FLIGHT")
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn daemon_answers_each_line_in_order_and_logs_evidence() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = sentinel(dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn aegis-sentinel");

    {
        let mut stdin = child.stdin.take().unwrap();
        writeln!(stdin, r#"{{"url":"http://one.test","content":"a"}}"#).unwrap();
        writeln!(stdin, "not json").unwrap();
        writeln!(stdin).unwrap();
        writeln!(stdin, r#"{{"url":"http://two.test"}}"#).unwrap();
    }

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let lines: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["status"], "warning");
    assert_eq!(lines[0]["score"], 60);
    assert_eq!(lines[1]["error"], "Invalid JSON Input");
    assert_eq!(lines[2]["status"], "warning");

    let log = std::fs::read_to_string(dir.path().join("evidence_stream.log")).unwrap();
    let urls: Vec<String> = log
        .lines()
        .map(|l| serde_json::from_str::<Value>(l).unwrap()["request"]["url"].to_string())
        .collect();
    assert_eq!(urls, [r#""http://one.test""#, r#""http://two.test""#]);
}

#[test]
fn one_shot_prints_one_line_and_writes_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let output = sentinel(dir.path())
        .args(["http://test.com", "body"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1);
    let verdict: Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(verdict["status"], "warning");
    assert_eq!(verdict["threatLevel"], "medium");

    let snapshot: Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("evidence_dump.json")).unwrap())
            .unwrap();
    assert_eq!(snapshot["request"]["url"], "http://test.com");
    assert_eq!(snapshot["request"]["content"], "body");

    // Only the snapshot remains; its temp file was renamed into place.
    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["evidence_dump.json"]);
}

#[test]
fn logs_never_reach_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let output = sentinel(dir.path())
        .args(["--verbose", "http://quiet.test"])
        .env("RUST_LOG", "debug")
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1);
    assert!(serde_json::from_str::<Value>(stdout.trim()).is_ok());
    assert!(!output.stderr.is_empty());
}

#[test]
fn invalid_configuration_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let output = sentinel(dir.path())
        .args(["--max-in-flight", "0", "http://x.test"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
