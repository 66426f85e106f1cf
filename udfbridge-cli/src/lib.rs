//! udfbridge CLI library
//!
//! Argument definitions, subcommand handlers and output rendering for the
//! `udfbridge` binary. Handlers take an orchestrator and a writer so they can
//! be driven from tests without touching stdout.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
