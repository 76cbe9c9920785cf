//! mcp-prometheus - MCP Server for Prometheus
//!
//! CLI entry point: loads configuration, sets up logging, then hands over
//! to the launch flow. The process exits with the server's exit code.

use console::style;
use mcp_prometheus::cli::Cli;
use mcp_prometheus::config::{Config, ConfigManager};
use mcp_prometheus::error::LauncherResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{} failed to start async runtime: {}", style("Error:").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run());
    // An interrupted download may still sit in a blocking read
    runtime.shutdown_background();

    match result {
        Ok(code) => u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from),
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> LauncherResult<i32> {
    let cli = Cli::parse_args();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.log_level(), &config);
    tracing::debug!("Configuration: {}", config_manager.path().display());

    mcp_prometheus::cli::commands::run(cli, config).await
}

/// 0 = warn, 1 = info, 2+ = debug. `RUST_LOG` wins when set.
fn init_logging(level: u8, config: &Config) {
    let default = match level {
        0 => "mcp_prometheus=warn",
        1 => "mcp_prometheus=info",
        _ => "mcp_prometheus=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Stdout carries MCP traffic; diagnostics go to stderr
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
