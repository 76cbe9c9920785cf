//! Resolve, download and install, degrading to the cached copy when offline

use super::cache::ArtifactCache;
use super::download::{CancelFlag, Downloader};
use crate::error::{DownloadError, LauncherError, LauncherResult};
use crate::release::ReleaseResolver;
use crate::supervisor::SignalSource;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How the returned artifact was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Cache already held the latest release
    Current,
    /// Latest release was downloaded and installed just now
    Installed,
    /// Refresh failed; an older cached artifact is being used
    Stale,
}

/// A runnable artifact on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub path: PathBuf,
    pub version: Option<String>,
    pub freshness: Freshness,
}

/// Produces a usable artifact path from resolver, downloader and cache
pub struct ArtifactProvisioner {
    resolver: Arc<dyn ReleaseResolver>,
    downloader: Downloader,
    cache: ArtifactCache,
}

impl ArtifactProvisioner {
    pub fn new(
        resolver: Arc<dyn ReleaseResolver>,
        downloader: Downloader,
        cache: ArtifactCache,
    ) -> Self {
        Self {
            resolver,
            downloader,
            cache,
        }
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Return a runnable artifact, refreshing it if possible
    ///
    /// Fails only when the refresh fails and nothing is cached, or when the
    /// refresh was cancelled.
    pub async fn ensure(&self, cancel: &CancelFlag) -> LauncherResult<Provisioned> {
        match self.refresh(cancel).await {
            Ok(provisioned) => Ok(provisioned),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => self.fall_back(e),
        }
    }

    /// [`ensure`](Self::ensure), stopped by the first signal from `signals`
    ///
    /// The signal cancels the refresh and gives it `grace` to wind down. A
    /// second signal or an expired grace abandons it instead; a transfer
    /// stuck in a blocking read is left behind and its staging file removed.
    /// Either way the result is [`LauncherError::Interrupted`].
    pub async fn ensure_or_interrupt<S>(
        &self,
        signals: &mut S,
        grace: Duration,
    ) -> LauncherResult<Provisioned>
    where
        S: SignalSource + ?Sized,
    {
        let cancel = CancelFlag::new();
        let ensure = self.ensure(&cancel);
        tokio::pin!(ensure);

        let signal = tokio::select! {
            result = &mut ensure => return result,
            Some(signal) = signals.recv() => signal,
        };
        info!("Received {:?} while preparing the server, aborting", signal);
        cancel.cancel();

        tokio::select! {
            finished = tokio::time::timeout(grace, &mut ensure) => match finished {
                Ok(result) => debug!(
                    "Provisioning stopped after cancel: {:?}",
                    result.map(|p| p.freshness)
                ),
                Err(_) => debug!("Provisioning still busy after {:?}, abandoning it", grace),
            },
            Some(again) = signals.recv() => {
                debug!("Received {:?} again, abandoning provisioning", again);
            }
        }

        let removed = self.cache.discard_staging();
        if removed > 0 {
            debug!("Removed {} abandoned staging file(s)", removed);
        }
        Err(LauncherError::Interrupted {
            signal: signal.number(),
        })
    }

    async fn refresh(&self, cancel: &CancelFlag) -> LauncherResult<Provisioned> {
        let release = self.resolver.resolve_latest().await?;
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled.into());
        }

        if self.cache.is_up_to_date(&release.version) {
            debug!("Cached artifact is at latest version {}", release.version);
            return Ok(Provisioned {
                path: self.cache.artifact_path(),
                version: Some(release.version),
                freshness: Freshness::Current,
            });
        }

        info!("Downloading mcp-prometheus {}...", release.version);
        let staging = self.cache.staging_file()?;
        let artifact = self
            .downloader
            .fetch(&release.asset_url, staging, cancel)
            .await?;

        if let Some(expected) = &release.sha256 {
            artifact.verify_sha256(expected)?;
        }

        let path = self.cache.install(artifact, &release.version)?;
        info!("Download complete.");

        Ok(Provisioned {
            path,
            version: Some(release.version),
            freshness: Freshness::Installed,
        })
    }

    fn fall_back(&self, cause: LauncherError) -> LauncherResult<Provisioned> {
        if !self.cache.has_artifact() {
            return Err(LauncherError::provisioning(cause));
        }

        warn!("Could not check for updates, using cached version: {}", cause);
        Ok(Provisioned {
            path: self.cache.artifact_path(),
            version: self.cache.read_installed_version(),
            freshness: Freshness::Stale,
        })
    }
}
