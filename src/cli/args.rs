//! CLI argument definitions using clap derive

use clap::{ArgAction, Command, CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

const AFTER_HELP: &str = r#"ENVIRONMENT:
  PROMETHEUS_URL   Prometheus API URL (default: http://localhost:9090)
  GITHUB_TOKEN     Optional token used when checking for new releases

EXAMPLES:
  # stdio mode (for Claude Code, Claude Desktop)
  PROMETHEUS_URL="http://prometheus:9090" mcp-prometheus

  # SSE mode on port 9081
  PROMETHEUS_URL="http://prometheus:9090" mcp-prometheus --port 9081

MCP CLIENT CONFIGURATION:
  {
    "mcpServers": {
      "prometheus": {
        "command": "mcp-prometheus",
        "env": {
          "PROMETHEUS_URL": "http://localhost:9090"
        }
      }
    }
  }

Unrecognized arguments, and everything after `--`, are passed to the
server unchanged."#;

/// mcp-prometheus - MCP Server for Prometheus
///
/// Downloads the latest server release on demand, caches it, and runs it
/// with Java. Uses stdio transport unless a port is given.
#[derive(Parser, Debug)]
#[command(name = "mcp-prometheus")]
#[command(author, version, about, long_about = None)]
#[command(disable_version_flag = true)]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: (),

    /// Start in SSE mode on this port (default: stdio mode)
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Increase log verbosity (repeat for debug)
    #[arg(long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(long, env = "MCP_PROMETHEUS_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the cached server artifact
    #[arg(long, env = "MCP_PROMETHEUS_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Arguments the launcher does not recognize, in order
    #[arg(skip)]
    pub extra: Vec<String>,
}

impl Cli {
    /// Parse the process arguments, exiting on `--help`, `--version` or errors
    pub fn parse_args() -> Self {
        Self::try_parse_args_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
    }

    /// Parse `args` (program name first)
    ///
    /// Launcher flags are honoured wherever they appear. Any other token is
    /// collected into `extra` for the server, as is everything after `--`.
    pub fn try_parse_args_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut command = Self::command();
        command.build();

        let (own, extra) = split_passthrough(&command, args);
        let mut cli = Self::try_parse_from(own)?;
        cli.extra = extra;
        Ok(cli)
    }

    /// Effective log verbosity: HTTP mode is chattier by default
    pub fn log_level(&self) -> u8 {
        self.verbose.max(u8::from(self.port.is_some()))
    }
}

/// Separate the launcher's own flags (with their values) from the rest
fn split_passthrough<I, T>(command: &Command, args: I) -> (Vec<OsString>, Vec<String>)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut own: Vec<OsString> = args.next().into_iter().collect();
    let mut extra = Vec::new();

    while let Some(arg) = args.next() {
        let token = arg.to_string_lossy().into_owned();
        if token == "--" {
            extra.extend(args.by_ref().map(|a| a.to_string_lossy().into_owned()));
            break;
        }
        match own_flag(command, &token) {
            Some(takes_value) => {
                own.push(arg);
                if takes_value {
                    own.extend(args.next());
                }
            }
            None => extra.push(token),
        }
    }

    (own, extra)
}

/// `Some(takes_value)` when `token` is one of the launcher's flags
fn own_flag(command: &Command, token: &str) -> Option<bool> {
    if let Some(long) = token.strip_prefix("--") {
        let (name, inline_value) = match long.split_once('=') {
            Some((name, _)) => (name, true),
            None => (long, false),
        };
        return command
            .get_arguments()
            .find(|arg| arg.get_long() == Some(name))
            .map(|arg| arg.get_action().takes_values() && !inline_value);
    }

    let mut short = token.strip_prefix('-')?.chars();
    match (short.next(), short.next()) {
        (Some(flag), None) => command
            .get_arguments()
            .find(|arg| arg.get_short() == Some(flag))
            .map(|arg| arg.get_action().takes_values()),
        _ => None,
    }
}
