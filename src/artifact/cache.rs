//! Single-slot artifact cache
//!
//! Layout (one directory, two files):
//!
//! | File | Content |
//! |------|---------|
//! | `<artifact_name>` | the runnable artifact |
//! | `version` | plain-text release tag of the artifact |
//!
//! Staged downloads live next to them as `.<artifact_name>.*.part` so the
//! final promotion is a same-filesystem rename.

use super::download::DownloadedArtifact;
use crate::error::{LauncherError, LauncherResult};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Name of the sidecar version marker
pub const VERSION_MARKER: &str = "version";

/// Snapshot of what is on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    pub artifact_path: PathBuf,
    pub installed_version: Option<String>,
}

/// The cache directory and the names inside it
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
    artifact_name: String,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>, artifact_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            artifact_name: artifact_name.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Canonical location of the cached artifact
    pub fn artifact_path(&self) -> PathBuf {
        self.dir.join(&self.artifact_name)
    }

    pub fn marker_path(&self) -> PathBuf {
        self.dir.join(VERSION_MARKER)
    }

    /// Version recorded in the marker. Missing marker or directory is `None`.
    pub fn read_installed_version(&self) -> Option<String> {
        let path = self.marker_path();
        match fs::read_to_string(&path) {
            Ok(content) => {
                let version = content.trim();
                (!version.is_empty()).then(|| version.to_string())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Ignoring unreadable version marker {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Whether a non-empty, readable artifact is present, whatever its version
    pub fn has_artifact(&self) -> bool {
        let path = self.artifact_path();
        let Ok(file) = File::open(&path) else {
            return false;
        };
        file.metadata().is_ok_and(|m| m.is_file() && m.len() > 0)
    }

    /// True only if the marker equals `version` and the artifact is usable
    pub fn is_up_to_date(&self, version: &str) -> bool {
        self.read_installed_version().as_deref() == Some(version) && self.has_artifact()
    }

    pub fn record(&self) -> CacheRecord {
        CacheRecord {
            artifact_path: self.artifact_path(),
            installed_version: self.read_installed_version(),
        }
    }

    /// Create the cache directory if needed
    pub fn ensure_dir(&self) -> LauncherResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            LauncherError::io(format!("creating cache directory {}", self.dir.display()), e)
        })
    }

    /// A fresh staging file inside the cache directory
    ///
    /// The file is removed when dropped unless it is installed first.
    pub fn staging_file(&self) -> LauncherResult<NamedTempFile> {
        self.ensure_dir()?;
        tempfile::Builder::new()
            .prefix(&format!(".{}.", self.artifact_name))
            .suffix(".part")
            .tempfile_in(&self.dir)
            .map_err(|e| LauncherError::io("creating download staging file", e))
    }

    /// Delete staged downloads whose transfer was abandoned
    ///
    /// Returns how many files were removed. A missing directory counts as
    /// nothing to do.
    pub fn discard_staging(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        let prefix = format!(".{}.", self.artifact_name);

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !(name.starts_with(&prefix) && name.ends_with(".part")) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove {}: {}", entry.path().display(), e),
            }
        }
        removed
    }

    /// Promote a completed download and record its version
    ///
    /// Order: drop the marker, rename the artifact into place, then write the
    /// new marker via its own rename. An interruption at any point leaves
    /// either no marker or a marker describing complete bytes.
    pub fn install(&self, artifact: DownloadedArtifact, version: &str) -> LauncherResult<PathBuf> {
        self.ensure_dir()?;

        let marker = self.marker_path();
        match fs::remove_file(&marker) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(LauncherError::io(
                    format!("clearing version marker {}", marker.display()),
                    e,
                ))
            }
        }

        let target = self.artifact_path();
        artifact.persist(&target).map_err(|e| {
            LauncherError::io(format!("installing artifact to {}", target.display()), e)
        })?;

        self.write_marker(version)?;
        self.sync_dir();

        debug!("Installed {} as {}", version, target.display());
        Ok(target)
    }

    fn write_marker(&self, version: &str) -> LauncherResult<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| LauncherError::io("creating version marker", e))?;
        tmp.write_all(version.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| LauncherError::io("writing version marker", e))?;
        tmp.persist(self.marker_path())
            .map_err(|e| LauncherError::io("recording installed version", e.error))?;
        Ok(())
    }

    /// Flush the directory entries so both renames survive a power loss
    fn sync_dir(&self) {
        if !cfg!(unix) {
            return;
        }
        if let Err(e) = File::open(&self.dir).and_then(|d| d.sync_all()) {
            debug!("Could not sync cache directory: {}", e);
        }
    }
}
