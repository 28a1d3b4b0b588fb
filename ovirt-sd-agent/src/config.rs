//! Configuration resolution
//!
//! Handles:
//! - Command line flags (clap), with `ENGINE_PASSWORD` as password fallback
//! - Optional TOML config file underneath the flags
//! - Startup validation (https only, credentials present, sane interval)
//!
//! The resolved [`AgentConfig`] is immutable and handed to the loop by value.

use crate::error::ConfigError;
use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_OUTPUT: &str = "engine-hosts.json";
pub const DEFAULT_ENGINE_URL: &str = "https://localhost:8443";
pub const DEFAULT_ENGINE_USER: &str = "admin@internal";
pub const DEFAULT_ENGINE_CA: &str = "/etc/pki/vdsm/certs/cacert.pem";
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const PASSWORD_ENV: &str = "ENGINE_PASSWORD";

#[derive(Debug, Parser)]
#[command(name = "ovirt-sd-agent")]
#[command(about = "Writes oVirt engine hosts as Prometheus file_sd targets, grouped by cluster.")]
pub struct Cli {
    /// Optional TOML config file; flags take precedence over it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Target for the configuration file [default: engine-hosts.json]
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Engine URL [default: https://localhost:8443]
    #[arg(long)]
    pub engine_url: Option<String>,

    /// Engine user [default: admin@internal]
    #[arg(long)]
    pub engine_user: Option<String>,

    /// Engine password
    #[arg(long, env = PASSWORD_ENV, hide_env_values = true)]
    pub engine_password: Option<String>,

    /// Don't verify the engine certificate
    #[arg(long)]
    pub no_verify: bool,

    /// Path to engine CA certificate [default: /etc/pki/vdsm/certs/cacert.pem]
    #[arg(long)]
    pub engine_ca: Option<PathBuf>,

    /// Update interval for host discovery in seconds [default: 60]
    #[arg(long)]
    pub update_interval: Option<u64>,

    /// Timeout for one engine request in seconds, capped at the update interval [default: 30]
    #[arg(long)]
    pub request_timeout: Option<u64>,

    /// Serve /health and /status on this address
    #[arg(long)]
    pub status_addr: Option<SocketAddr>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// An empty `--engine-password` still falls back to the environment
    pub fn with_password_fallback(mut self, env_password: Option<String>) -> Self {
        if self.engine_password.as_deref().map_or(true, str::is_empty) {
            self.engine_password = env_password.filter(|p| !p.is_empty());
        }
        self
    }
}

/// On-disk configuration, every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub output: Option<PathBuf>,
    pub update_interval: Option<u64>,
    pub request_timeout: Option<u64>,
    pub status_addr: Option<SocketAddr>,
    #[serde(default)]
    pub engine: EngineFileConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineFileConfig {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub no_verify: Option<bool>,
    pub ca: Option<PathBuf>,
}

impl FileConfig {
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::File {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml(path, &content)
    }

    fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// How the engine certificate is checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// Trust only the certificates in this PEM bundle
    Verify { ca_bundle: PathBuf },
    /// Skip chain and hostname verification entirely
    Insecure,
}

#[derive(Clone)]
pub struct EngineConfig {
    /// Base URL without trailing slash
    pub url: String,
    pub user: String,
    pub password: String,
    pub tls: TlsMode,
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"***")
            .field("tls", &self.tls)
            .finish()
    }
}

impl EngineConfig {
    pub fn hosts_url(&self) -> String {
        format!("{}/ovirt-engine/api/hosts", self.url)
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub output: PathBuf,
    pub engine: EngineConfig,
    pub update_interval: Duration,
    pub request_timeout: Duration,
    pub status_addr: Option<SocketAddr>,
}

impl AgentConfig {
    /// Resolve flags, then the config file, then built-in defaults, and validate
    pub async fn resolve(cli: Cli) -> Result<Self, ConfigError> {
        let cli = cli.with_password_fallback(std::env::var(PASSWORD_ENV).ok());
        let file = match &cli.config {
            Some(path) => FileConfig::load(path).await?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    fn merge(cli: Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let no_verify = cli.no_verify || file.engine.no_verify.unwrap_or(false);
        let tls = if no_verify {
            TlsMode::Insecure
        } else {
            TlsMode::Verify {
                ca_bundle: cli
                    .engine_ca
                    .or(file.engine.ca)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_ENGINE_CA)),
            }
        };

        let engine = EngineConfig {
            url: cli
                .engine_url
                .or(file.engine.url)
                .unwrap_or_else(|| DEFAULT_ENGINE_URL.to_string()),
            user: cli
                .engine_user
                .or(file.engine.user)
                .unwrap_or_else(|| DEFAULT_ENGINE_USER.to_string()),
            password: cli
                .engine_password
                .filter(|p| !p.is_empty())
                .or(file.engine.password)
                .unwrap_or_default(),
            tls,
        };

        let update_interval = Duration::from_secs(
            cli.update_interval
                .or(file.update_interval)
                .unwrap_or(DEFAULT_UPDATE_INTERVAL_SECS),
        );
        let request_timeout = Duration::from_secs(
            cli.request_timeout
                .or(file.request_timeout)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );

        let mut config = AgentConfig {
            output: cli
                .output
                .or(file.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            engine,
            update_interval,
            request_timeout,
            status_addr: cli.status_addr.or(file.status_addr),
        };
        config.validate()?;
        Ok(config)
    }

    /// Startup-fatal checks; normalizes the engine URL and clamps the timeout
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        let parsed = reqwest::Url::parse(&self.engine.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.engine.url.clone(),
            reason: e.to_string(),
        })?;
        if parsed.scheme() != "https" {
            return Err(ConfigError::InsecureScheme(self.engine.url.clone()));
        }
        self.engine.url = self.engine.url.trim_end_matches('/').to_string();

        if self.engine.user.is_empty() {
            return Err(ConfigError::MissingUser);
        }
        if self.engine.password.is_empty() {
            return Err(ConfigError::MissingPassword);
        }
        if self.update_interval.is_zero() {
            return Err(ConfigError::InvalidInterval);
        }

        if self.request_timeout.is_zero() || self.request_timeout > self.update_interval {
            warn!(
                "Request timeout {:?} capped to update interval {:?}",
                self.request_timeout, self.update_interval
            );
            self.request_timeout = self.update_interval;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["ovirt-sd-agent"];
        argv.extend_from_slice(args);
        let mut cli = Cli::try_parse_from(argv).unwrap();
        // keep a stray ENGINE_PASSWORD in the test environment out of the picture
        if !args.iter().any(|a| a.starts_with("--engine-password")) {
            cli.engine_password = None;
        }
        cli
    }

    #[test]
    fn test_defaults() {
        let config =
            AgentConfig::merge(cli(&["--engine-password", "secret"]), FileConfig::default()).unwrap();
        assert_eq!(config.output, PathBuf::from("engine-hosts.json"));
        assert_eq!(config.engine.url, "https://localhost:8443");
        assert_eq!(config.engine.user, "admin@internal");
        assert_eq!(
            config.engine.tls,
            TlsMode::Verify {
                ca_bundle: PathBuf::from("/etc/pki/vdsm/certs/cacert.pem")
            }
        );
        assert_eq!(config.update_interval, Duration::from_secs(60));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.status_addr.is_none());
    }

    #[test]
    fn test_insecure_scheme_rejected() {
        let err = AgentConfig::merge(
            cli(&["--engine-password", "secret", "--engine-url", "http://engine.example.com"]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureScheme(_)));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = AgentConfig::merge(
            cli(&["--engine-password", "secret", "--engine-url", "not a url"]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn test_missing_password() {
        let err = AgentConfig::merge(cli(&["--engine-password="]), FileConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPassword));
    }

    #[test]
    fn test_empty_password_flag_falls_back_to_env() {
        let env = || Some("from-env".to_string());

        let flags = cli(&["--engine-password="]).with_password_fallback(env());
        let config = AgentConfig::merge(flags, FileConfig::default()).unwrap();
        assert_eq!(config.engine.password, "from-env");

        let flags = cli(&["--engine-password", "from-flag"]).with_password_fallback(env());
        let config = AgentConfig::merge(flags, FileConfig::default()).unwrap();
        assert_eq!(config.engine.password, "from-flag");

        let flags = cli(&["--engine-password="]).with_password_fallback(Some(String::new()));
        let err = AgentConfig::merge(flags, FileConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPassword));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = AgentConfig::merge(
            cli(&["--engine-password", "secret", "--update-interval", "0"]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInterval));
    }

    #[test]
    fn test_timeout_capped_to_interval() {
        let config = AgentConfig::merge(
            cli(&["--engine-password", "secret", "--update-interval", "10", "--request-timeout", "45"]),
            FileConfig::default(),
        )
        .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = AgentConfig::merge(
            cli(&["--engine-password", "secret", "--engine-url", "https://engine.example.com/"]),
            FileConfig::default(),
        )
        .unwrap();
        assert_eq!(
            config.engine.hosts_url(),
            "https://engine.example.com/ovirt-engine/api/hosts"
        );
    }

    #[test]
    fn test_flags_override_file() {
        let file = FileConfig::from_toml(
            Path::new("agent.toml"),
            r#"
                output = "/var/lib/prometheus/ovirt.json"
                update_interval = 120

                [engine]
                url = "https://file.example.com"
                password = "from-file"
                no_verify = true
            "#,
        )
        .unwrap();
        let config = AgentConfig::merge(
            cli(&["--engine-url", "https://flag.example.com"]),
            file,
        )
        .unwrap();
        assert_eq!(config.engine.url, "https://flag.example.com");
        assert_eq!(config.engine.password, "from-file");
        assert_eq!(config.engine.tls, TlsMode::Insecure);
        assert_eq!(config.output, PathBuf::from("/var/lib/prometheus/ovirt.json"));
        assert_eq!(config.update_interval, Duration::from_secs(120));
    }

    #[test]
    fn test_unknown_file_key_rejected() {
        let err = FileConfig::from_toml(Path::new("agent.toml"), "outptu = \"x.json\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = FileConfig::load(Path::new("/nonexistent/ovirt-sd-agent.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::File { .. }));
    }

    #[test]
    fn test_password_redacted() {
        let config =
            AgentConfig::merge(cli(&["--engine-password", "hunter2"]), FileConfig::default()).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("***"));
    }
}
