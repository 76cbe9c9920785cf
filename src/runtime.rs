//! Java runtime preflight check

use crate::config::schema::RuntimeConfig;
use crate::error::{LauncherError, LauncherResult};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Verifies that the runtime exists and is recent enough
pub struct RuntimeCheck {
    program: String,
    min_version: u32,
}

impl RuntimeCheck {
    pub fn new(program: impl Into<String>, min_version: u32) -> Self {
        Self {
            program: program.into(),
            min_version,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(&config.program, config.min_version)
    }

    /// Run `<program> -version` and check the reported major version
    ///
    /// Returns the detected major version, or `None` if the output could not
    /// be understood (which is let through).
    pub async fn verify(&self) -> LauncherResult<Option<u32>> {
        let output = Command::new(&self.program)
            .arg("-version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match output {
            Ok(out) if out.status.success() => out,
            Ok(out) => {
                debug!("{} -version exited with {}", self.program, out.status);
                return Err(self.not_found());
            }
            Err(e) => {
                debug!("{} -version failed: {}", self.program, e);
                return Err(self.not_found());
            }
        };

        // `java -version` prints to stderr
        let text = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stderr),
            String::from_utf8_lossy(&output.stdout)
        );

        match parse_major_version(&text) {
            Some(major) if major < self.min_version => Err(LauncherError::RuntimeTooOld {
                found: text.lines().next().unwrap_or_default().trim().to_string(),
                required: self.min_version,
            }),
            Some(major) => {
                debug!("Found {} {}", self.program, major);
                Ok(Some(major))
            }
            None => {
                warn!("Could not determine {} version, continuing", self.program);
                Ok(None)
            }
        }
    }

    fn not_found(&self) -> LauncherError {
        LauncherError::RuntimeNotFound {
            program: self.program.clone(),
        }
    }
}

/// Extract the major version from `java -version` output
///
/// Handles `version "21.0.2"`, `version "17"` and the legacy `version "1.8.0_392"`
/// (major 8).
pub fn parse_major_version(output: &str) -> Option<u32> {
    let start = output.find("version \"")? + "version \"".len();
    let quoted = &output[start..];
    let quoted = &quoted[..quoted.find('"')?];

    let mut parts = quoted.split(['.', '_', '-', '+']);
    let first: u32 = parts.next()?.parse().ok()?;
    if first == 1 {
        if let Some(minor) = parts.next().and_then(|p| p.parse().ok()) {
            return Some(minor);
        }
    }
    Some(first)
}
