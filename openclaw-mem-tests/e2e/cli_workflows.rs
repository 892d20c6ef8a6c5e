//! CLI end-to-end workflow tests driving the `openclaw-mem` binary
//! directly via `std::process::Command` (through `assert_cmd`).

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

fn cli(db_path: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("openclaw-mem").expect("binary builds");
    cmd.arg("--db").arg(db_path).arg("--json");
    cmd
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("valid json output")
}

#[test]
fn progressive_recall_across_search_timeline_and_get() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("ledger.db");
    let capture_path = dir.path().join("capture.jsonl");

    let lines = [
        r#"{"ts":"2026-02-05T10:00:00Z","kind":"note","summary":"searched for OpenClaw"}"#,
        r#"{"ts":"2026-02-05T10:01:00Z","kind":"note","summary":"fetched openclaw.ai"}"#,
        r#"{"ts":"2026-02-05T10:02:00Z","kind":"note","summary":"ran git status"}"#,
    ];
    std::fs::write(&capture_path, lines.join("\n")).unwrap();

    let ingest_output = cli(&db_path)
        .arg("ingest")
        .arg(&capture_path)
        .output()
        .unwrap();
    assert!(ingest_output.status.success(), "{:?}", ingest_output);
    let receipt = stdout_json(&ingest_output.stdout);
    assert_eq!(receipt["inserted"], 3);

    let search_output = cli(&db_path)
        .arg("search")
        .arg("OpenClaw")
        .arg("--limit")
        .arg("10")
        .output()
        .unwrap();
    assert!(search_output.status.success());
    let search_result = stdout_json(&search_output.stdout);
    let hits = search_result["hits"].as_array().unwrap();
    assert_eq!(hits.len(), 2, "{search_result:#}");
    assert!(hits
        .iter()
        .all(|h| h["summary"].as_str().unwrap().to_lowercase().contains("openclaw")));

    let row2_id = hits
        .iter()
        .find(|h| h["summary"].as_str().unwrap().contains("fetched"))
        .map(|h| h["id"].as_i64().unwrap())
        .or_else(|| hits[0]["id"].as_i64())
        .unwrap();

    let timeline_output = cli(&db_path)
        .arg("timeline")
        .arg(row2_id.to_string())
        .arg("--window")
        .arg("2")
        .output()
        .unwrap();
    assert!(timeline_output.status.success());
    let timeline_result = stdout_json(&timeline_output.stdout);
    let slice = timeline_result["slices"][0].as_array().unwrap();
    assert_eq!(slice.len(), 3, "{timeline_result:#}");

    let get_output = cli(&db_path)
        .arg("get")
        .arg(row2_id.to_string())
        .output()
        .unwrap();
    assert!(get_output.status.success());
    let get_result = stdout_json(&get_output.stdout);
    assert_eq!(get_result["rows"][0]["id"], row2_id);
}

#[test]
fn tiered_fallback_prefers_must_remember_then_nice_to_have() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("ledger.db");
    let capture_path = dir.path().join("capture.jsonl");

    let governed = |score: f64| {
        format!(
            r#""detail":{{"governance":{{"importance":{{"score":{score},"label":"{}","method":"operator","version":"1.0.0","graded_at":"2026-02-05T00:00:00Z"}}}}}}"#,
            if score >= 0.80 {
                "must_remember"
            } else if score >= 0.50 {
                "nice_to_have"
            } else {
                "ignore"
            }
        )
    };

    let lines = vec![
        format!(
            r#"{{"ts":"2026-02-05T09:00:00Z","kind":"note","summary":"billing retry budget exceeded",{}}}"#,
            governed(0.90)
        ),
        format!(
            r#"{{"ts":"2026-02-05T09:01:00Z","kind":"note","summary":"billing retry latency elevated",{}}}"#,
            governed(0.60)
        ),
        format!(
            r#"{{"ts":"2026-02-05T09:02:00Z","kind":"note","summary":"billing retry dashboard updated",{}}}"#,
            governed(0.55)
        ),
        r#"{"ts":"2026-02-05T09:03:00Z","kind":"note","summary":"billing retry note one"}"#.to_string(),
        r#"{"ts":"2026-02-05T09:04:00Z","kind":"note","summary":"billing retry note two"}"#.to_string(),
    ];
    std::fs::write(&capture_path, lines.join("\n")).unwrap();

    let ingest_output = cli(&db_path)
        .arg("ingest")
        .arg(&capture_path)
        .arg("--importance-scorer")
        .arg("off")
        .output()
        .unwrap();
    assert!(ingest_output.status.success(), "{:?}", ingest_output);
    let receipt = stdout_json(&ingest_output.stdout);
    assert_eq!(receipt["inserted"], 5);

    let hybrid_output = cli(&db_path)
        .arg("hybrid")
        .arg("billing retry")
        .arg("--limit")
        .arg("3")
        .output()
        .unwrap();
    assert!(hybrid_output.status.success(), "{:?}", hybrid_output);
    let result = stdout_json(&hybrid_output.stdout);

    let tier_counts = result["receipt"]["tier_counts"].as_array().unwrap();
    let must = tier_counts
        .iter()
        .find(|t| t["tier"] == "must_remember")
        .unwrap();
    assert_eq!(must["selected"], 1);
    let nice = tier_counts
        .iter()
        .find(|t| t["tier"] == "nice_to_have")
        .unwrap();
    assert_eq!(nice["selected"], 2);

    assert_eq!(result["hits"].as_array().unwrap().len(), 3);
    assert!(result["receipt"]["rejected"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r.as_str().unwrap().contains("budget_cap")));
}
