//! Whether a person is watching stderr

use std::io::IsTerminal;

/// Decides if download progress is drawn
///
/// Stdout belongs to the server (MCP over stdio), so only stderr counts.
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    watched: bool,
    verbose: bool,
}

impl UiContext {
    /// Stderr is a terminal and no `CI` variable is set
    pub fn detect() -> Self {
        let watched = std::io::stderr().is_terminal() && std::env::var_os("CI").is_none();
        Self {
            watched,
            verbose: false,
        }
    }

    /// Never draws anything
    pub fn non_interactive() -> Self {
        Self {
            watched: false,
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Progress bars only when someone is watching and asked for chatter
    pub fn use_fancy_output(&self) -> bool {
        self.watched && self.verbose
    }
}
