//! Cycle outcome tracking
//!
//! The last good output file stays in place when a cycle fails, so external
//! monitoring needs another way to notice a stuck agent. The tracker keeps the
//! last success time and the current failure streak; `http` serves it.

use crate::discovery::CycleReport;
use crate::error::CycleError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// No cycle has finished yet
    Starting,
    /// Last cycle wrote the output file
    Ok,
    /// Last cycle failed, output file is from an earlier cycle (if any)
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentHealth {
    pub status: AgentStatus,
    pub uptime_seconds: u64,
    pub cycles_total: u64,
    pub consecutive_failures: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_stage: Option<String>,
    pub hosts: usize,
    pub groups: usize,
}

#[derive(Debug, Default)]
struct LastOutcome {
    success: Option<DateTime<Utc>>,
    error: Option<(String, &'static str)>,
    hosts: usize,
    groups: usize,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    cycles: Arc<AtomicU64>,
    consecutive_failures: Arc<AtomicU64>,
    last: Arc<Mutex<LastOutcome>>,
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: Arc::new(AtomicU64::new(0)),
            consecutive_failures: Arc::new(AtomicU64::new(0)),
            last: Arc::new(Mutex::new(LastOutcome::default())),
        }
    }

    pub fn record_success(&self, report: &CycleReport) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);

        let mut last = self.last.lock();
        last.success = Some(Utc::now());
        last.error = None;
        last.hosts = report.hosts;
        last.groups = report.groups;
    }

    pub fn record_failure(&self, err: &CycleError) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        self.last.lock().error = Some((err.to_string(), err.stage()));
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> AgentHealth {
        let cycles_total = self.cycles.load(Ordering::Relaxed);
        let consecutive_failures = self.consecutive_failures.load(Ordering::Relaxed);
        let last = self.last.lock();

        let status = if cycles_total == 0 {
            AgentStatus::Starting
        } else if consecutive_failures > 0 {
            AgentStatus::Degraded
        } else {
            AgentStatus::Ok
        };

        AgentHealth {
            status,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            cycles_total,
            consecutive_failures,
            last_success: last.success,
            last_error: last.error.as_ref().map(|(msg, _)| msg.clone()),
            last_error_stage: last.error.as_ref().map(|(_, stage)| stage.to_string()),
            hosts: last.hosts,
            groups: last.groups,
        }
    }
}
