//! Discovery loop
//!
//! One cycle is fetch → decode → group → write. Cycles never overlap: the
//! next one starts `interval` after the previous one finished. A failed cycle
//! is logged and leaves the output file untouched; the next tick is the only
//! retry.

use crate::error::CycleError;
use crate::health::HealthTracker;
use crate::inventory::{parse_hosts, InventorySource};
use crate::targets::group_by_cluster;
use crate::writer::TargetWriter;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// What a successful cycle wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub hosts: usize,
    pub groups: usize,
}

pub struct DiscoveryLoop {
    source: Box<dyn InventorySource>,
    writer: TargetWriter,
    interval: Duration,
    health: HealthTracker,
}

impl DiscoveryLoop {
    pub fn new(
        source: Box<dyn InventorySource>,
        writer: TargetWriter,
        interval: Duration,
        health: HealthTracker,
    ) -> Self {
        Self {
            source,
            writer,
            interval,
            health,
        }
    }

    /// Run exactly one cycle and record its outcome
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let result = self.discover().await;
        match &result {
            Ok(report) => self.health.record_success(report),
            Err(e) => self.health.record_failure(e),
        }
        result
    }

    async fn discover(&self) -> Result<CycleReport, CycleError> {
        let body = self.source.fetch().await?;
        let hosts = parse_hosts(&body)?;
        let groups = group_by_cluster(&hosts);

        for group in &groups {
            debug!(
                "Cluster {}: {} targets",
                group.cluster().unwrap_or_default(),
                group.targets.len()
            );
        }

        let report = CycleReport {
            hosts: hosts.len(),
            groups: groups.len(),
        };
        self.writer.persist(groups).await?;
        Ok(report)
    }

    /// Loop until `shutdown` flips to true or its sender goes away
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting host discovery every {:?}, writing to {}",
            self.interval,
            self.writer.path().display()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_cycle().await {
                Ok(report) => info!(
                    "Wrote {} hosts in {} cluster groups to {}",
                    report.hosts,
                    report.groups,
                    self.writer.path().display()
                ),
                Err(e) => error!(
                    "Discovery cycle failed at {} (failure #{}), keeping previous output: {}",
                    e.stage(),
                    self.health.consecutive_failures(),
                    e
                ),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Host discovery stopped");
    }
}
