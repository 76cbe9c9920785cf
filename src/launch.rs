//! Command line for the Java child process

use crate::config::schema::{RuntimeConfig, ServerConfig};
use crate::supervisor::LaunchCommand;
use std::path::Path;

/// Environment variable read by the server to find Prometheus
pub const PROMETHEUS_URL_ENV: &str = "PROMETHEUS_URL";

/// JVM flags that keep stdout clean for MCP over stdio
const STDIO_FLAGS: &[&str] = &[
    "-Dquarkus.http.host-enabled=false",
    "-Dquarkus.banner.enabled=false",
    "-Dquarkus.log.level=WARN",
    "-Dquarkus.mcp.server.traffic-logging.enabled=false",
];

/// How the server should be started
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchPlan {
    /// HTTP/SSE port; stdio transport when absent
    pub port: Option<u16>,
    /// Passed to the server verbatim, after `-jar <path>`
    pub extra_args: Vec<String>,
}

impl LaunchPlan {
    pub fn new(port: Option<u16>, extra_args: Vec<String>) -> Self {
        Self { port, extra_args }
    }

    /// SSE endpoint exposed in HTTP mode
    pub fn sse_endpoint(&self) -> Option<String> {
        self.port
            .map(|port| format!("http://localhost:{}/mcp/sse", port))
    }

    fn jvm_flags(&self) -> Vec<String> {
        match self.port {
            Some(port) => vec![
                format!("-Dquarkus.http.port={}", port),
                "-Dquarkus.http.host=0.0.0.0".to_string(),
            ],
            None => STDIO_FLAGS.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Build the child command for `artifact`
    ///
    /// `lookup` reads the launcher's environment; `PROMETHEUS_URL` is only
    /// supplied when it is unset or empty there.
    pub fn command(
        &self,
        runtime: &RuntimeConfig,
        server: &ServerConfig,
        artifact: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> LaunchCommand {
        let mut args = self.jvm_flags();
        args.push("-jar".to_string());
        args.push(artifact.display().to_string());
        args.extend(self.extra_args.iter().cloned());

        let mut env = Vec::new();
        if lookup(PROMETHEUS_URL_ENV).map_or(true, |v| v.is_empty()) {
            env.push((
                PROMETHEUS_URL_ENV.to_string(),
                server.prometheus_url.clone(),
            ));
        }

        LaunchCommand {
            program: runtime.program.clone(),
            args,
            env,
        }
    }
}
