//! Error types for the launcher
//!
//! All modules use `LauncherResult<T>` as their return type. The network
//! stages have their own narrower errors (`MetadataError`, `DownloadError`)
//! so the provisioner can decide which failures degrade to the stale cache.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for launcher operations
pub type LauncherResult<T> = Result<T, LauncherError>;

/// Failures while resolving the latest release
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("release metadata request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("release metadata request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("release metadata could not be parsed: {0}")]
    Parse(String),

    #[error("release has no version tag")]
    MissingTag,

    #[error("release {version} has no asset ending in {suffix}")]
    NoMatchingAsset { version: String, suffix: String },
}

/// Failures while transferring an artifact
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("download request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("download from {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("redirect from {url} (HTTP {status}) has no usable Location header")]
    MissingLocation { url: String, status: u16 },

    #[error("redirect loop detected at {0}")]
    RedirectLoop(String),

    #[error("transfer interrupted after {written} bytes: {source}")]
    Transfer {
        written: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("server returned an empty artifact")]
    EmptyBody,

    #[error("checksum mismatch: expected sha256 {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("download cancelled")]
    Cancelled,
}

/// All errors that can occur in the launcher
#[derive(Error, Debug)]
pub enum LauncherError {
    // Provisioning errors
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("No usable artifact is available: {source}")]
    Provisioning {
        #[source]
        source: Box<LauncherError>,
    },

    #[error("Interrupted by signal {signal} before the server started")]
    Interrupted { signal: i32 },

    // Process errors
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} is required but was not found")]
    RuntimeNotFound { program: String },

    #[error("Java {required}+ is required. Found: {found}")]
    RuntimeTooOld { found: String, required: u32 },

    #[error("Lost track of child process: {source}")]
    ChildWait {
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl LauncherError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Wrap a failure as "nothing runnable could be produced"
    pub fn provisioning(source: LauncherError) -> Self {
        Self::Provisioning {
            source: Box::new(source),
        }
    }

    /// Create a spawn error
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Whether this error came from a cancelled download
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Download(DownloadError::Cancelled))
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RuntimeNotFound { .. } | Self::RuntimeTooOld { .. } => {
                Some("Install Java from: https://adoptium.net/")
            }
            Self::Provisioning { .. } => {
                Some("Check your network connection; the server is downloaded on first run")
            }
            Self::Metadata(MetadataError::Status { status: 403, .. }) => {
                Some("GitHub API rate limit reached. Set GITHUB_TOKEN to raise it")
            }
            _ => None,
        }
    }

    /// Exit code the launcher should report for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Interrupted { signal } => u8::try_from(128 + signal).unwrap_or(1),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = LauncherError::RuntimeTooOld {
            found: "openjdk version \"17.0.2\"".to_string(),
            required: 21,
        };
        assert!(err.to_string().contains("Java 21+ is required"));
    }

    #[test]
    fn error_hint() {
        let err = LauncherError::RuntimeNotFound {
            program: "java".to_string(),
        };
        assert_eq!(err.hint(), Some("Install Java from: https://adoptium.net/"));
    }

    #[test]
    fn provisioning_keeps_cause() {
        let err = LauncherError::provisioning(MetadataError::MissingTag.into());
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("release has no version tag"));
        assert!(err.hint().is_some());
    }

    #[test]
    fn cancelled_detected() {
        assert!(LauncherError::from(DownloadError::Cancelled).is_cancelled());
        assert!(!LauncherError::from(DownloadError::EmptyBody).is_cancelled());
    }

    #[test]
    fn interrupted_exit_code() {
        assert_eq!(LauncherError::Interrupted { signal: 2 }.exit_code(), 130);
        assert_eq!(
            LauncherError::RuntimeNotFound {
                program: "java".into()
            }
            .exit_code(),
            1
        );
    }
}
