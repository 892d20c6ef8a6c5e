//! Markdown-heading-source capture (spec §4.9): idempotent indexing of
//! heading spans into the ledger, index-only (no body excerpts stored).

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::{ImportanceScorer, MemoryConfig};
use crate::error::{Error, Result};
use crate::observation::{Detail, ObservationKind};
use crate::storage_trait::{LedgerStore, NewObservation};

use super::state::{with_locked_markdown_state, FileCursor};
use super::GraphCaptureReceipt;

/// One matched heading within a markdown file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadingSection {
    pub heading: String,
    pub heading_level: usize,
    pub start_line: usize,
    pub end_line: usize,
}

/// Options controlling which files and headings are considered.
#[derive(Debug, Clone)]
pub struct MarkdownScanOptions {
    pub include_extensions: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub min_heading_level: usize,
    pub since_hours: i64,
}

impl Default for MarkdownScanOptions {
    fn default() -> Self {
        Self {
            include_extensions: vec!["md".to_string(), "markdown".to_string()],
            exclude_globs: Vec::new(),
            min_heading_level: 1,
            since_hours: 24 * 7,
        }
    }
}

fn matches_any_glob(path: &Path, globs: &[String]) -> bool {
    let path_str = path.to_string_lossy();
    globs.iter().any(|pattern| glob_match(pattern, &path_str))
}

/// A minimal glob matcher supporting `*` (any run of characters) and
/// literal segments, sufficient for exclude patterns like `**/node_modules/**`
/// or `*.draft.md`.
fn glob_match(pattern: &str, text: &str) -> bool {
    fn helper(p: &[u8], t: &[u8]) -> bool {
        match (p.first(), t.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                let rest = &p[1..];
                helper(rest, t) || (!t.is_empty() && helper(p, &t[1..]))
            }
            (Some(pc), Some(tc)) if pc == tc => helper(&p[1..], &t[1..]),
            _ => false,
        }
    }
    helper(pattern.as_bytes(), text.as_bytes())
}

fn has_included_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.iter().any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext)))
}

fn discover_files(root: &Path, options: &MarkdownScanOptions) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if !has_included_extension(&path, &options.include_extensions) {
                continue;
            }
            if matches_any_glob(&path, &options.exclude_globs) {
                continue;
            }
            out.push(path);
        }
    }
    out.sort();
    out
}

/// Parse heading sections at or below `min_heading_level` (i.e. `#` is
/// level 1; `min_heading_level = 2` matches `##` and deeper).
#[must_use]
pub fn parse_headings(contents: &str, min_heading_level: usize) -> Vec<HeadingSection> {
    let lines: Vec<&str> = contents.lines().collect();
    let mut headings: Vec<(usize, String, usize)> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        let level = trimmed.chars().take_while(|c| *c == '#').count();
        if level == 0 || level < min_heading_level {
            continue;
        }
        if !trimmed[level..].starts_with(' ') && trimmed.len() > level {
            continue;
        }
        let heading = trimmed[level..].trim().to_string();
        if heading.is_empty() {
            continue;
        }
        headings.push((level, heading, idx + 1));
    }

    let mut sections = Vec::with_capacity(headings.len());
    for (i, (level, heading, start_line)) in headings.iter().enumerate() {
        let end_line = headings
            .get(i + 1)
            .map(|(_, _, next_start)| next_start - 1)
            .unwrap_or(lines.len());
        sections.push(HeadingSection {
            heading: heading.clone(),
            heading_level: *level,
            start_line: *start_line,
            end_line,
        });
    }
    sections
}

fn section_fingerprint(path: &Path, section: &HeadingSection) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    path.to_string_lossy().hash(&mut hasher);
    section.heading.hash(&mut hasher);
    section.heading_level.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn file_hash(contents: &str) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    contents.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn mtime_secs(path: &Path) -> i64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Run the markdown-heading capture scan over `root` (spec §4.9). A file
/// is re-scanned only if its mtime has moved past the stored cursor;
/// first-seen files are bound to `since_hours` lookback. Idempotency is
/// per-section-fingerprint, so unrelated edits elsewhere in a file don't
/// re-capture headings whose content hasn't changed.
pub async fn capture_markdown<S: LedgerStore + ?Sized>(
    store: &S,
    root: &Path,
    state_path: &Path,
    options: &MarkdownScanOptions,
    config: &MemoryConfig,
) -> Result<GraphCaptureReceipt> {
    let files = discover_files(root, options);
    let cutoff = (Utc::now() - chrono::Duration::hours(options.since_hours)).timestamp();

    let mut receipt = GraphCaptureReceipt {
        scanned: files.len(),
        ..Default::default()
    };

    for path in &files {
        let key = path.to_string_lossy().to_string();
        let current_mtime = mtime_secs(path);

        let cursor = with_locked_markdown_state(state_path, |state| {
            state.files.get(&key).cloned().unwrap_or_default()
        })?;

        let is_first_seen = cursor.mtime_secs == 0;
        if is_first_seen && current_mtime < cutoff {
            continue;
        }
        if !is_first_seen && current_mtime <= cursor.mtime_secs {
            receipt.skipped_existing += 1;
            continue;
        }

        receipt.changed += 1;

        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        let sections = parse_headings(&contents, options.min_heading_level);
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| key.clone());
        let file_hash_value = file_hash(&contents);

        let mut newly_seen = Vec::new();

        for section in &sections {
            let fingerprint = section_fingerprint(path, section);
            if cursor.seen_fingerprints.contains(&fingerprint) {
                receipt.skipped_existing += 1;
                continue;
            }

            let summary = format!("[MD] {basename}#{}", section.heading);
            let summary = crate::capture::truncate_chars(&summary, crate::constants::MAX_SUMMARY_CHARS);

            let mut detail = Detail::default();
            detail
                .extra
                .insert("source_path".to_string(), serde_json::Value::String(key.clone()));
            detail
                .extra
                .insert("heading".to_string(), serde_json::Value::String(section.heading.clone()));
            detail.extra.insert(
                "heading_level".to_string(),
                serde_json::Value::Number(section.heading_level.into()),
            );
            detail.extra.insert(
                "start_line".to_string(),
                serde_json::Value::Number(section.start_line.into()),
            );
            detail.extra.insert(
                "end_line".to_string(),
                serde_json::Value::Number(section.end_line.into()),
            );
            detail
                .extra
                .insert("mtime".to_string(), serde_json::Value::Number(current_mtime.into()));
            detail.extra.insert(
                "file_hash".to_string(),
                serde_json::Value::String(file_hash_value.clone()),
            );
            detail.extra.insert(
                "section_fingerprint".to_string(),
                serde_json::Value::String(fingerprint.clone()),
            );

            let ts = Utc::now();

            if matches!(config.importance_scorer, ImportanceScorer::HeuristicV1) {
                detail.governance.importance = Some(crate::importance::grade(
                    ObservationKind::Note,
                    Some("graph.capture-md"),
                    &summary,
                    &detail,
                ));
            }

            let content_hash =
                crate::capture::content_hash(ObservationKind::Note, Some("graph.capture-md"), &summary, ts);

            let new_observation = NewObservation {
                ts,
                kind: ObservationKind::Note,
                tool_name: Some("graph.capture-md".to_string()),
                summary,
                detail,
                content_hash,
                session_key: None,
                agent_id: None,
            };

            match store.insert_observation(new_observation).await {
                Ok(_) => {
                    receipt.inserted += 1;
                    newly_seen.push(fingerprint);
                }
                Err(Error::Duplicate) => receipt.skipped_existing += 1,
                Err(other) => return Err(other),
            }
        }

        with_locked_markdown_state(state_path, |state| {
            let entry = state.files.entry(key.clone()).or_insert_with(FileCursor::default);
            entry.mtime_secs = current_mtime;
            for fingerprint in &newly_seen {
                entry.seen_fingerprints.insert(fingerprint.clone());
            }
        })?;
    }

    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headings_at_min_level() {
        let contents = "# Title\ntext\n## Sub\nmore text\n### Deep\nend";
        let sections = parse_headings(contents, 2);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].heading, "Sub");
        assert_eq!(sections[1].heading, "Deep");
    }

    #[test]
    fn glob_match_supports_wildcards() {
        assert!(glob_match("*.draft.md", "notes.draft.md"));
        assert!(!glob_match("*.draft.md", "notes.md"));
    }

    #[test]
    fn heading_section_spans_until_next_heading_or_eof() {
        let contents = "# A\nline1\nline2\n# B\nline3";
        let sections = parse_headings(contents, 1);
        assert_eq!(sections[0].start_line, 1);
        assert_eq!(sections[0].end_line, 3);
        assert_eq!(sections[1].start_line, 4);
        assert_eq!(sections[1].end_line, 5);
    }
}
