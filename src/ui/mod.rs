//! Terminal presentation
//!
//! Everything here writes to stderr: stdout is reserved for the server.

mod context;
mod progress;

pub use context::UiContext;
pub use progress::DownloadProgress;
