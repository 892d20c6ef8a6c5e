//! Deterministic scope resolution for a recall request (spec §4.5).

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use regex::Regex;

/// How a recall request's scope was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    /// The caller passed an explicit scope.
    Explicit,
    /// Scanned from an `[ISO: ...]` or `[SCOPE: ...]` tag in the query text.
    Inferred,
    /// No explicit scope and no tag found; defaults to `"global"`.
    Global,
}

/// The resolved scope and how it was arrived at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedScope {
    pub scope: String,
    pub mode: ScopeMode,
}

fn iso_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[ISO:\s*([^\]]+)\]").expect("static pattern"))
}

fn scope_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[SCOPE:\s*([^\]]+)\]").expect("static pattern"))
}

/// Resolve the effective scope for a recall request: an explicit scope
/// wins outright; otherwise scan `query_text` for the first `[ISO: ...]`
/// tag, then the first `[SCOPE: ...]` tag; otherwise default to `"global"`.
#[must_use]
pub fn resolve(explicit_scope: Option<&str>, query_text: &str) -> ResolvedScope {
    if let Some(scope) = explicit_scope {
        return ResolvedScope {
            scope: scope.to_string(),
            mode: ScopeMode::Explicit,
        };
    }

    if let Some(captures) = iso_tag_re().captures(query_text) {
        return ResolvedScope {
            scope: captures[1].trim().to_string(),
            mode: ScopeMode::Inferred,
        };
    }

    if let Some(captures) = scope_tag_re().captures(query_text) {
        return ResolvedScope {
            scope: captures[1].trim().to_string(),
            mode: ScopeMode::Inferred,
        };
    }

    ResolvedScope {
        scope: "global".to_string(),
        mode: ScopeMode::Global,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_scope_always_wins() {
        let resolved = resolve(Some("project-a"), "[SCOPE: project-b] anything");
        assert_eq!(resolved.scope, "project-a");
        assert_eq!(resolved.mode, ScopeMode::Explicit);
    }

    #[test]
    fn iso_tag_is_preferred_over_scope_tag() {
        let resolved = resolve(None, "[SCOPE: project-b] and also [ISO: project-a]");
        assert_eq!(resolved.scope, "project-a");
        assert_eq!(resolved.mode, ScopeMode::Inferred);
    }

    #[test]
    fn scope_tag_used_when_no_iso_tag() {
        let resolved = resolve(None, "remember this [SCOPE: project-c]");
        assert_eq!(resolved.scope, "project-c");
        assert_eq!(resolved.mode, ScopeMode::Inferred);
    }

    #[test]
    fn falls_back_to_global_when_no_tag_present() {
        let resolved = resolve(None, "what did we decide about auth");
        assert_eq!(resolved.scope, "global");
        assert_eq!(resolved.mode, ScopeMode::Global);
    }
}
