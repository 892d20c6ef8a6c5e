//! `graph capture-git` and `graph capture-md` (spec §4.9, §6 [ADDED]):
//! idempotent indexing of commit metadata and markdown headings.

use std::path::{Path, PathBuf};

use openclaw_mem_core::graph_capture::markdown::MarkdownScanOptions;
use openclaw_mem_core::graph_capture::{git, markdown, GraphCaptureReceipt};

use crate::context::Context;
use crate::output::Output;

impl Output for GraphCaptureReceipt {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "scanned={} changed={} inserted={} skipped_existing={}",
            self.scanned, self.changed, self.inserted, self.skipped_existing
        )?;
        Ok(())
    }
}

fn state_dir(ctx: &Context) -> PathBuf {
    ctx.base_dir().join(".openclaw-mem")
}

/// `graph capture-git --source <dir> [--since-hours N]`.
pub async fn run_capture_git(
    ctx: &Context,
    source: &Path,
    since_hours: i64,
) -> anyhow::Result<GraphCaptureReceipt> {
    std::fs::create_dir_all(state_dir(ctx))?;
    let state_path = state_dir(ctx).join("commit_capture.json");
    let receipt =
        git::capture_git(&ctx.ledger, source, &state_path, since_hours, &ctx.config.memory)
            .await?;
    Ok(receipt)
}

/// `graph capture-md --source <dir> [--include ext]... [--exclude glob]...
/// [--min-heading-level N] [--since-hours N]`.
pub async fn run_capture_md(
    ctx: &Context,
    source: &Path,
    include: Vec<String>,
    exclude: Vec<String>,
    min_heading_level: usize,
    since_hours: i64,
) -> anyhow::Result<GraphCaptureReceipt> {
    std::fs::create_dir_all(state_dir(ctx))?;
    let state_path = state_dir(ctx).join("markdown_capture.json");

    let mut options = MarkdownScanOptions {
        since_hours,
        min_heading_level,
        ..Default::default()
    };
    if !include.is_empty() {
        options.include_extensions = include;
    }
    if !exclude.is_empty() {
        options.exclude_globs = exclude;
    }

    let receipt =
        markdown::capture_markdown(&ctx.ledger, source, &state_path, &options, &ctx.config.memory)
            .await?;
    Ok(receipt)
}
