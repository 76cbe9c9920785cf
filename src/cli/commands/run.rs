//! Launch flow: preflight, provision, supervise

use crate::artifact::{ArtifactCache, ArtifactProvisioner, Downloader, Freshness};
use crate::cli::args::Cli;
use crate::config::{Config, ConfigManager};
use crate::error::{LauncherError, LauncherResult};
use crate::http::{HttpClient, UreqClient};
use crate::launch::LaunchPlan;
use crate::release::GithubReleaseResolver;
use crate::runtime::RuntimeCheck;
use crate::supervisor::{OsSignals, OsSpawner, ProcessSupervisor};
use crate::ui::{DownloadProgress, UiContext};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// How long a cancelled download may take to stop on its own
const CANCEL_GRACE: Duration = Duration::from_secs(2);

/// Execute the launcher and return the server's exit code
pub async fn execute(cli: Cli, config: Config) -> LauncherResult<i32> {
    let ui = UiContext::detect().with_verbose(cli.log_level() > 0);

    RuntimeCheck::from_config(&config.runtime).verify().await?;

    // From here on, interrupt/terminate are ours to handle
    let mut signals =
        OsSignals::install().map_err(|e| LauncherError::io("installing signal handlers", e))?;

    let provisioner = build_provisioner(&cli, &config, &ui);
    debug!("Artifact cache: {}", provisioner.cache().dir().display());

    let provisioned = provisioner
        .ensure_or_interrupt(&mut signals, CANCEL_GRACE)
        .await?;

    if provisioned.freshness == Freshness::Stale {
        debug!("Running stale artifact {:?}", provisioned.version);
    }

    let plan = LaunchPlan::new(cli.port, cli.extra);
    let command = plan.command(&config.runtime, &config.server, &provisioned.path, |key| {
        std::env::var(key).ok()
    });

    if let (Some(port), Some(endpoint)) = (plan.port, plan.sse_endpoint()) {
        info!("Starting MCP server in SSE mode on port {}...", port);
        info!("SSE endpoint: {}", endpoint);
    }

    let mut supervisor = ProcessSupervisor::new(OsSpawner, signals);
    let code = supervisor.run(&command).await?;
    debug!("Server exited with code {}", code);
    Ok(code)
}

fn build_provisioner(cli: &Cli, config: &Config, ui: &UiContext) -> ArtifactProvisioner {
    let client: Arc<dyn HttpClient> = Arc::new(UreqClient::new(
        &config.network,
        &config.release.user_agent,
    ));

    let resolver = GithubReleaseResolver::from_config(
        Arc::clone(&client),
        &config.release,
        &config.network,
    );

    let downloader = Downloader::new(client)
        .with_timeout(config.network.download_timeout())
        .with_progress(Arc::new(DownloadProgress::new(ui)));

    let cache = ArtifactCache::new(
        ConfigManager::cache_dir(config, cli.cache_dir.as_deref()),
        &config.release.artifact_name,
    );

    ArtifactProvisioner::new(Arc::new(resolver), downloader, cache)
}
