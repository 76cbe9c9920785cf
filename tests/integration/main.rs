//! Integration tests for mcp-prometheus

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn launcher() -> Command {
        cargo_bin_cmd!("mcp-prometheus")
    }

    /// Launcher isolated from the user's config and cache
    fn isolated(temp: &TempDir, config: &str) -> Command {
        let config_path = temp.path().join("config.toml");
        std::fs::write(&config_path, config).unwrap();

        let mut cmd = launcher();
        cmd.env("MCP_PROMETHEUS_CONFIG", &config_path)
            .env("MCP_PROMETHEUS_CACHE_DIR", temp.path().join("cache"))
            .env_remove("RUST_LOG");
        cmd
    }

    fn offline_config(program: &Path) -> String {
        format!(
            "[release]\n\
             api_url = 'http://127.0.0.1:1'\n\n\
             [network]\n\
             connect_timeout_secs = 2\n\n\
             [runtime]\n\
             program = '{}'\n",
            program.display()
        )
    }

    #[test]
    fn help_displays() {
        launcher()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("MCP Server for Prometheus"))
            .stdout(predicate::str::contains("PROMETHEUS_URL"));
    }

    #[test]
    fn version_displays() {
        launcher()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("mcp-prometheus"));
    }

    #[test]
    fn short_v_displays_version() {
        launcher()
            .args(["--some-server-flag", "-v"])
            .assert()
            .success()
            .stdout(predicate::str::contains("mcp-prometheus"));
    }

    #[test]
    fn missing_runtime_fails_fast() {
        let temp = TempDir::new().unwrap();
        isolated(&temp, "[runtime]\nprogram = 'definitely-not-a-java-binary'\n")
            .assert()
            .failure()
            .stderr(predicate::str::contains("was not found"))
            .stderr(predicate::str::contains("adoptium.net"));

        assert!(!temp.path().join("cache").exists());
    }

    #[test]
    fn malformed_config_is_reported() {
        let temp = TempDir::new().unwrap();
        isolated(&temp, "[runtime\n")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[cfg(unix)]
    mod with_fake_java {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::path::PathBuf;

        /// A `java` stand-in: answers `-version`, otherwise records its
        /// arguments and `PROMETHEUS_URL`, then exits 7
        fn fake_java(temp: &TempDir, version: &str) -> (PathBuf, PathBuf) {
            let record = temp.path().join("invocation.txt");
            let script = temp.path().join("java");
            let body = format!(
                "#!/bin/sh\n\
                 if [ \"$1\" = \"-version\" ]; then\n\
                 \techo 'openjdk version \"{version}\" 2024-01-16' >&2\n\
                 \texit 0\n\
                 fi\n\
                 printf '%s\\n' \"$@\" > '{record}'\n\
                 printf 'PROMETHEUS_URL=%s\\n' \"$PROMETHEUS_URL\" >> '{record}'\n\
                 exit 7\n",
                version = version,
                record = record.display()
            );
            std::fs::write(&script, body).unwrap();
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
            (script, record)
        }

        #[test]
        fn old_runtime_is_rejected() {
            let temp = TempDir::new().unwrap();
            let (java, _) = fake_java(&temp, "17.0.9");

            isolated(&temp, &offline_config(&java))
                .assert()
                .failure()
                .stderr(predicate::str::contains("Java 21+ is required"));
        }

        #[test]
        fn offline_without_cache_fails() {
            let temp = TempDir::new().unwrap();
            let (java, record) = fake_java(&temp, "21.0.2");

            isolated(&temp, &offline_config(&java))
                .assert()
                .failure()
                .stderr(predicate::str::contains("No usable artifact"));

            assert!(!record.exists());
            assert!(!temp.path().join("cache").exists());
        }

        #[test]
        fn offline_with_cache_runs_stale_artifact() {
            let temp = TempDir::new().unwrap();
            let (java, record) = fake_java(&temp, "21.0.2");
            let cache = temp.path().join("cache");
            std::fs::create_dir_all(&cache).unwrap();
            std::fs::write(cache.join("mcp-prometheus.jar"), b"PK\x03\x04").unwrap();
            std::fs::write(cache.join("version"), "v1.0.0").unwrap();

            isolated(&temp, &offline_config(&java))
                .env_remove("PROMETHEUS_URL")
                .args(["--server-flag", "value"])
                .assert()
                .code(7)
                .stderr(predicate::str::contains("using cached version"));

            let invocation = std::fs::read_to_string(&record).unwrap();
            let lines: Vec<&str> = invocation.lines().collect();
            let jar = cache.join("mcp-prometheus.jar");
            assert_eq!(
                lines,
                vec![
                    "-Dquarkus.http.host-enabled=false",
                    "-Dquarkus.banner.enabled=false",
                    "-Dquarkus.log.level=WARN",
                    "-Dquarkus.mcp.server.traffic-logging.enabled=false",
                    "-jar",
                    jar.to_str().unwrap(),
                    "--server-flag",
                    "value",
                    "PROMETHEUS_URL=http://localhost:9090",
                ]
            );
            assert_eq!(
                std::fs::read_to_string(cache.join("version")).unwrap(),
                "v1.0.0"
            );
        }

        #[test]
        fn port_mode_passes_http_flags() {
            let temp = TempDir::new().unwrap();
            let (java, record) = fake_java(&temp, "21.0.2");
            let cache = temp.path().join("cache");
            std::fs::create_dir_all(&cache).unwrap();
            std::fs::write(cache.join("mcp-prometheus.jar"), b"PK\x03\x04").unwrap();

            isolated(&temp, &offline_config(&java))
                .env("PROMETHEUS_URL", "http://prom:9090")
                .args(["--server-flag", "--port", "9081"])
                .assert()
                .code(7)
                .stderr(predicate::str::contains("http://localhost:9081/mcp/sse"));

            let invocation = std::fs::read_to_string(&record).unwrap();
            assert!(invocation
                .starts_with("-Dquarkus.http.port=9081\n-Dquarkus.http.host=0.0.0.0\n-jar\n"));
            assert!(invocation.contains("\n--server-flag\n"));
            assert!(invocation.contains("PROMETHEUS_URL=http://prom:9090"));
        }
    }
}
