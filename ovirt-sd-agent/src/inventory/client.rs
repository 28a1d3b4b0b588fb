use crate::config::{EngineConfig, TlsMode};
use crate::error::{ConfigError, FetchError};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Certificate;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest response body kept in an error for a non-2xx answer
const BODY_SNIPPET_LEN: usize = 512;

/// Source of the raw host listing, one call per discovery cycle
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}

/// HTTPS client for the engine REST API
pub struct EngineClient {
    http: reqwest::Client,
    hosts_url: String,
    user: String,
    password: String,
}

impl EngineClient {
    /// Build the client once at startup; CA problems are startup-fatal
    pub fn new(engine: &EngineConfig, request_timeout: Duration) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("ovirt-sd-agent/", env!("CARGO_PKG_VERSION")));

        match &engine.tls {
            TlsMode::Insecure => {
                warn!("TLS verification disabled, engine certificate will not be checked");
                builder = builder
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true);
            }
            TlsMode::Verify { ca_bundle } => {
                // the engine CA replaces the system trust store
                builder = builder.tls_built_in_root_certs(false);
                for cert in load_ca_bundle(ca_bundle)? {
                    builder = builder.add_root_certificate(cert);
                }
            }
        }

        Ok(Self {
            http: builder.build()?,
            hosts_url: engine.hosts_url(),
            user: engine.user.clone(),
            password: engine.password.clone(),
        })
    }

    pub fn hosts_url(&self) -> &str {
        &self.hosts_url
    }
}

#[async_trait]
impl InventorySource for EngineClient {
    async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        debug!("GET {}", self.hosts_url);

        let response = self
            .http
            .get(&self.hosts_url)
            .header(ACCEPT, "application/json")
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: self.hosts_url.clone(),
                source,
            })?;

        let status = response.status();
        // consumes the response, the connection goes back to the pool either way
        let body = response.bytes().await.map_err(FetchError::Body)?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                body: body_snippet(&body),
            });
        }

        debug!("Engine returned {} bytes", body.len());
        Ok(body.to_vec())
    }
}

/// Read a PEM bundle holding one or more CA certificates
pub fn load_ca_bundle(path: &Path) -> Result<Vec<Certificate>, ConfigError> {
    let pem = std::fs::read(path).map_err(|source| ConfigError::CaBundle {
        path: path.to_path_buf(),
        source,
    })?;

    match Certificate::from_pem_bundle(&pem) {
        Ok(certs) if !certs.is_empty() => Ok(certs),
        _ => Err(ConfigError::EmptyCaBundle(path.to_path_buf())),
    }
}

fn body_snippet(body: &[u8]) -> String {
    let end = body.len().min(BODY_SNIPPET_LEN);
    let mut snippet = String::from_utf8_lossy(&body[..end]).trim().to_string();
    if body.len() > BODY_SNIPPET_LEN {
        snippet.push_str("...");
    }
    snippet
}
