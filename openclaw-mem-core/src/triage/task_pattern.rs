//! The deterministic task-pattern matcher used by `triage --mode tasks`
//! (spec §6).

use std::sync::OnceLock;

use regex::Regex;

use crate::policy::trivial::nfkc_collapse;

/// Wrapper prefixes accepted ahead of the keyword, in any combination:
/// blockquotes, bullets, checklists, ordered-list markers.
fn wrapper_and_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Leading wrappers, then TODO/TASK/REMINDER (plain or bracketed),
        // then a separator or end of string.
        let blockquote = r"(?:>\s*){0,3}";
        let bullet = r"(?:[-*+•‣∙·]\s*)?";
        let checklist = r"(?:\[[ xX✓✔]\]\s*)?";
        let ordered = r"(?:\(?(?:[0-9]+|[a-zA-Z]+|i{1,3}v?|v|x{1,3})[.)]\s*)?";
        let bracket_open = r"(?:\[|\(|【|〔|「|『)?";
        let bracket_close = r"(?:\]|\)|】|〕|」|』)?";
        let keyword = r"(?i:TODO|TASK|REMINDER)";
        let separator = r"(?:[:：\s\-－–—−]|$)";

        let pattern = format!(
            "^{blockquote}{bullet}{checklist}{ordered}{bracket_open}{keyword}{bracket_close}{separator}"
        );
        Regex::new(&pattern).expect("static task-pattern regex")
    })
}

/// Whether a summary (not already `kind == "task"`) matches the
/// deterministic task pattern, after NFKC normalization and full-width
/// folding plus whitespace collapse.
#[must_use]
pub fn matches_task_pattern(summary: &str) -> bool {
    let normalized = nfkc_collapse(summary);
    wrapper_and_keyword_re().is_match(&normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_todo_matches() {
        assert!(matches_task_pattern("TODO: rotate runbook"));
    }

    #[test]
    fn checklist_and_blockquote_wrapper_matches() {
        assert!(matches_task_pattern("> - [ ] TODO: rotate runbook"));
    }

    #[test]
    fn bracketed_keyword_matches() {
        assert!(matches_task_pattern("[TASK] ship the release"));
        assert!(matches_task_pattern("【REMINDER】call the vendor"));
    }

    #[test]
    fn ordered_list_prefix_matches() {
        assert!(matches_task_pattern("1. TODO rotate keys"));
        assert!(matches_task_pattern("(a) REMINDER: follow up"));
    }

    #[test]
    fn unrelated_text_does_not_match() {
        assert!(!matches_task_pattern("fetched openclaw.ai successfully"));
    }

    #[test]
    fn keyword_without_separator_does_not_match() {
        assert!(!matches_task_pattern("TODOnt forget this"));
    }
}
