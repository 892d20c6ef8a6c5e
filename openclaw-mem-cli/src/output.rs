//! Human/JSON dual-mode output (spec §6).

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colorized summary.
    Human,
    /// Machine-readable JSON, one value per invocation.
    Json,
}

/// Implemented once per command result so each subcommand controls its
/// own human-readable rendering while sharing the JSON path.
pub trait Output: Serialize {
    fn write_human<W: Write>(&self, writer: W) -> anyhow::Result<()>;

    fn write_json<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    fn print(&self, format: OutputFormat) -> anyhow::Result<()> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        match format {
            OutputFormat::Human => self.write_human(&mut handle)?,
            OutputFormat::Json => self.write_json(&mut handle)?,
        }
        writeln!(handle)?;
        Ok(())
    }
}
