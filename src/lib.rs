//! mcp-prometheus - launcher for the Prometheus MCP server
//!
//! Keeps the latest server release cached locally, falls back to the cached
//! copy when GitHub is unreachable, and runs it under Java while relaying
//! termination signals and the exit code.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod launch;
pub mod release;
pub mod runtime;
pub mod supervisor;
pub mod ui;

pub use error::{LauncherError, LauncherResult};
