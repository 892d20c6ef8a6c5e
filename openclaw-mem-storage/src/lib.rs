//! libSQL-backed implementation of [`openclaw_mem_core::LedgerStore`].
//!
//! A single local database file backs the ledger: one writer connection
//! serialized behind a mutex, and as many reader connections as callers
//! need (spec §4.1, §5).

#![forbid(unsafe_code)]

mod fts;
mod ledger;
mod schema;

pub use ledger::{LedgerStats, LibsqlLedger};
