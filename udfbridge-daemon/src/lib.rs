//! udfbridge daemon library.
//!
//! Exposes the daemon's modules for integration testing.
//! In production, `udfbridged` is used as a binary (main.rs).

pub mod api;
pub mod api_error;
pub mod cli;
pub mod daemon;
pub mod dto;
pub mod health;
pub mod logging;
pub mod metrics_server;
