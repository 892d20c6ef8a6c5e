//! Library surface for the `openclaw-mem` CLI binary, split out so
//! integration tests can exercise command handlers directly.

pub mod commands;
pub mod config;
pub mod context;
pub mod output;
