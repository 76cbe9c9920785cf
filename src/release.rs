//! Latest-release lookup against the GitHub Releases API

use crate::config::schema::{NetworkConfig, ReleaseConfig};
use crate::error::MetadataError;
use crate::http::{HttpClient, HttpRequest};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// What the latest release offers for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMetadata {
    /// Release tag, compared only for equality
    pub version: String,
    pub asset_name: String,
    pub asset_url: String,
    /// Hex SHA-256 published alongside the asset, when GitHub provides one
    pub sha256: Option<String>,
}

/// GitHub release payload, reduced to the fields we read
#[derive(Debug, Deserialize)]
struct Release {
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    browser_download_url: String,
    #[serde(default)]
    digest: Option<String>,
}

/// Source of "latest version" information
#[async_trait]
pub trait ReleaseResolver: Send + Sync {
    /// Look up the latest published release. Never retries.
    async fn resolve_latest(&self) -> Result<ReleaseMetadata, MetadataError>;
}

/// Resolver backed by `GET /repos/{owner}/{repo}/releases/latest`
pub struct GithubReleaseResolver {
    client: Arc<dyn HttpClient>,
    url: String,
    asset_suffix: String,
    timeout: Duration,
    token: Option<String>,
}

impl GithubReleaseResolver {
    pub fn new(
        client: Arc<dyn HttpClient>,
        url: impl Into<String>,
        asset_suffix: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            asset_suffix: asset_suffix.into(),
            timeout: NetworkConfig::default().metadata_timeout(),
            token: None,
        }
    }

    /// Build a resolver from configuration, picking up `GITHUB_TOKEN`/`GH_TOKEN`
    pub fn from_config(
        client: Arc<dyn HttpClient>,
        release: &ReleaseConfig,
        network: &NetworkConfig,
    ) -> Self {
        let token = std::env::var("GITHUB_TOKEN")
            .or_else(|_| std::env::var("GH_TOKEN"))
            .ok()
            .filter(|t| !t.is_empty());

        Self::new(client, release.latest_release_url(), &release.asset_suffix)
            .with_timeout(network.metadata_timeout())
            .with_token(token)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn request(&self) -> HttpRequest {
        let mut request = HttpRequest::get(&self.url)
            .header("Accept", "application/vnd.github+json")
            .timeout(self.timeout);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        request
    }
}

#[async_trait]
impl ReleaseResolver for GithubReleaseResolver {
    async fn resolve_latest(&self) -> Result<ReleaseMetadata, MetadataError> {
        debug!(url = %self.url, "Fetching latest release");

        let client = Arc::clone(&self.client);
        let request = self.request();
        let suffix = self.asset_suffix.clone();

        tokio::task::spawn_blocking(move || fetch_release(client.as_ref(), &request, &suffix))
            .await
            .map_err(|e| MetadataError::Request {
                url: self.url.clone(),
                reason: e.to_string(),
            })?
    }
}

fn fetch_release(
    client: &dyn HttpClient,
    request: &HttpRequest,
    suffix: &str,
) -> Result<ReleaseMetadata, MetadataError> {
    let mut response = client.get(request).map_err(|e| MetadataError::Request {
        url: request.url.clone(),
        reason: e.to_string(),
    })?;

    if !response.is_success() {
        return Err(MetadataError::Status {
            url: request.url.clone(),
            status: response.status,
        });
    }

    let mut body = Vec::new();
    response
        .body
        .read_to_end(&mut body)
        .map_err(|e| MetadataError::Request {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

    parse_release(&body, suffix)
}

/// Pick the version tag and the first asset whose name ends with `suffix`
pub fn parse_release(body: &[u8], suffix: &str) -> Result<ReleaseMetadata, MetadataError> {
    let release: Release =
        serde_json::from_slice(body).map_err(|e| MetadataError::Parse(e.to_string()))?;

    let version = release
        .tag_name
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(MetadataError::MissingTag)?;

    let asset = release
        .assets
        .into_iter()
        .find(|a| a.name.ends_with(suffix))
        .ok_or_else(|| MetadataError::NoMatchingAsset {
            version: version.clone(),
            suffix: suffix.to_string(),
        })?;

    let sha256 = asset
        .digest
        .as_deref()
        .and_then(|d| d.strip_prefix("sha256:"))
        .map(str::to_ascii_lowercase);

    Ok(ReleaseMetadata {
        version,
        asset_name: asset.name,
        asset_url: asset.browser_download_url,
        sha256,
    })
}
