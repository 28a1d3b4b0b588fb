//! oVirt SD Agent - Prometheus file-based service discovery for oVirt
//!
//! Periodically lists the hypervisor hosts known to an oVirt engine and
//! writes them as scrape targets, one group per cluster:
//! - [`inventory`] fetches and decodes `/ovirt-engine/api/hosts`
//! - [`targets`] groups hosts by cluster id
//! - [`writer`] atomically replaces the file_sd output file
//! - [`discovery`] runs the cycle on a fixed interval
//! - [`health`] and [`http`] expose the last cycle outcome

pub mod config;
pub mod discovery;
pub mod error;
pub mod health;
pub mod http;
pub mod inventory;
pub mod targets;
pub mod writer;
