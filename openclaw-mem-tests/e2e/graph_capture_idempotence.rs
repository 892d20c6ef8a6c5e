//! Idempotence of `graph capture-md`: a second run over an unchanged
//! directory inserts nothing and reports every section as already seen.

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
fn second_capture_md_run_over_unchanged_tree_inserts_nothing() {
    let dir = TempDir::new().unwrap();
    let docs_dir = dir.path().join("docs");
    std::fs::create_dir_all(&docs_dir).unwrap();
    std::fs::write(
        docs_dir.join("runbook.md"),
        "# Runbook\nintro text\n## Rotate credentials\nsteps here\n## Escalation path\nmore steps\n",
    )
    .unwrap();

    let first = cli(dir.path())
        .arg("graph")
        .arg("capture-md")
        .arg("--source")
        .arg(&docs_dir)
        .output()
        .unwrap();
    assert!(first.status.success(), "{:?}", first);
    let first_receipt = stdout_json(&first.stdout);
    assert_eq!(first_receipt["scanned"], 1);
    assert_eq!(first_receipt["changed"], 1);
    assert_eq!(first_receipt["inserted"], 2, "{first_receipt:#}");
    assert_eq!(first_receipt["skipped_existing"], 0);

    let second = cli(dir.path())
        .arg("graph")
        .arg("capture-md")
        .arg("--source")
        .arg(&docs_dir)
        .output()
        .unwrap();
    assert!(second.status.success(), "{:?}", second);
    let second_receipt = stdout_json(&second.stdout);
    assert_eq!(second_receipt["scanned"], 1);
    assert_eq!(second_receipt["changed"], 0);
    assert_eq!(second_receipt["inserted"], 0);
    assert_eq!(second_receipt["skipped_existing"], 1, "{second_receipt:#}");
}
