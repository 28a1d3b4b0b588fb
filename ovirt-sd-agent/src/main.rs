//! oVirt SD Agent - writes oVirt hosts as Prometheus scrape targets
//!
//! Startup problems (bad URL scheme, missing password, unreadable CA bundle)
//! stop the process. Once the loop runs, every failure only skips a cycle.

use anyhow::{Context, Result};
use ovirt_sd_agent::config::{AgentConfig, Cli};
use ovirt_sd_agent::discovery::DiscoveryLoop;
use ovirt_sd_agent::health::HealthTracker;
use ovirt_sd_agent::http;
use ovirt_sd_agent::inventory::EngineClient;
use ovirt_sd_agent::writer::TargetWriter;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional, it may carry ENGINE_PASSWORD
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    init_logging(&cli.log_level);

    info!("oVirt SD Agent v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = AgentConfig::resolve(cli)
        .await
        .context("Invalid configuration")?;
    debug!("Resolved configuration: {:?}", config);

    let client = EngineClient::new(&config.engine, config.request_timeout)
        .context("Failed to set up engine client")?;
    info!("Polling {}", client.hosts_url());

    let health = HealthTracker::new();
    let (stop, shutdown) = watch::channel(false);

    if let Some(addr) = config.status_addr {
        let _server = http::spawn_status_server(addr, health.clone(), shutdown.clone())
            .await
            .with_context(|| format!("Failed to bind status endpoint on {addr}"))?;
    }

    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown requested");
        let _ = stop.send(true);
    });

    let discovery = DiscoveryLoop::new(
        Box::new(client),
        TargetWriter::new(&config.output),
        config.update_interval,
        health,
    );
    discovery.run(shutdown).await;

    Ok(())
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(e) => warn!("Cannot listen for SIGTERM: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
