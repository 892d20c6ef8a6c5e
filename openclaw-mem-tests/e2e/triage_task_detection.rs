//! `triage --mode tasks` over ingested capture rows: a task-pattern
//! summary surfaces once with exit code 10, then goes quiet.

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

fn cli(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("openclaw-mem").expect("binary builds");
    cmd.current_dir(dir).arg("--db").arg("ledger.db").arg("--json");
    cmd
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("valid json output")
}

#[test]
fn first_triage_run_flags_new_task_second_run_is_quiet() {
    let dir = TempDir::new().unwrap();
    let capture_path = dir.path().join("capture.jsonl");

    let lines = [
        r#"{"ts":"2026-02-05T10:00:00Z","kind":"note","summary":"> - [ ] TODO: rotate runbook"}"#,
        r#"{"ts":"2026-02-05T10:01:00Z","kind":"note","summary":"fetched openclaw.ai successfully"}"#,
    ];
    std::fs::write(&capture_path, lines.join("\n")).unwrap();

    let ingest_output = cli(dir.path()).arg("ingest").arg(&capture_path).output().unwrap();
    assert!(ingest_output.status.success(), "{:?}", ingest_output);
    let ingest_receipt = stdout_json(&ingest_output.stdout);
    assert_eq!(ingest_receipt["inserted"], 2);

    let first = cli(dir.path())
        .arg("triage")
        .arg("--mode")
        .arg("tasks")
        .output()
        .unwrap();
    assert_eq!(first.status.code(), Some(10), "{:?}", first);
    let first_summary = stdout_json(&first.stdout);
    assert_eq!(first_summary["summary"]["new_tasks"].as_array().unwrap().len(), 1);
    assert!(first_summary["summary"]["new_tasks"][0]["summary"]
        .as_str()
        .unwrap()
        .contains("rotate runbook"));

    let second = cli(dir.path())
        .arg("triage")
        .arg("--mode")
        .arg("tasks")
        .output()
        .unwrap();
    assert_eq!(second.status.code(), Some(0), "{:?}", second);
    let second_summary = stdout_json(&second.stdout);
    assert_eq!(second_summary["summary"]["new_tasks"].as_array().unwrap().len(), 0);
}
