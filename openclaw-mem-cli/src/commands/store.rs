//! `store <text> [--text-en <t>] [--lang <code>] [--category <c>]
//! [--importance <0..1>]` (spec §6): explicit write, bypassing capture
//! JSONL parsing but still going through redaction and (unless an
//! explicit importance is given) heuristic autograde.

use serde::Serialize;

use openclaw_mem_core::observation::{ImportanceLabel, ObservationKind};
use openclaw_mem_core::LedgerStore;

use crate::context::Context;
use crate::output::Output;

#[derive(Debug, Serialize)]
pub struct StoreResult {
    pub id: i64,
    pub label: ImportanceLabel,
}

impl Output for StoreResult {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "stored #{} ({:?})", self.id, self.label)?;
        Ok(())
    }
}

/// `--category` names the observation kind for an explicit write; the
/// stable CLI surface only has `note`/`task` to choose from (the other
/// `ObservationKind` variants are only ever produced by capture/triage).
fn parse_category(raw: &str) -> anyhow::Result<ObservationKind> {
    match raw {
        "note" => Ok(ObservationKind::Note),
        "task" => Ok(ObservationKind::Task),
        other => Err(anyhow::anyhow!(
            "unknown --category '{other}' (expected note|task)"
        )),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn run(
    ctx: &Context,
    text: &str,
    text_en: Option<&str>,
    lang: Option<&str>,
    category: Option<&str>,
    scope: Option<String>,
    importance: Option<f64>,
) -> anyhow::Result<StoreResult> {
    let kind = match category {
        Some(raw) => parse_category(raw)?,
        None => ObservationKind::Note,
    };

    let mut row = openclaw_mem_core::ingest::build_explicit_observation(
        text,
        kind,
        scope,
        importance,
        chrono::Utc::now(),
        ctx.config.memory.importance_scorer,
    );

    if let Some(lang) = lang {
        row.detail.governance.lang = Some(lang.to_string());
    }
    if let Some(text_en) = text_en {
        row.detail.extra.insert(
            "text_en".to_string(),
            serde_json::Value::String(text_en.to_string()),
        );
    }

    let label = row.detail.governance.label();
    let id = ctx.ledger.insert_observation(row).await?;
    Ok(StoreResult { id, label })
}
