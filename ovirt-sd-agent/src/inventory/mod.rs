//! Host inventory retrieval from the oVirt engine
//!
//! This module handles:
//! - The authenticated HTTPS request to `/ovirt-engine/api/hosts`
//! - Decoding the JSON listing into [`Host`] records

mod client;
mod model;

pub use client::{load_ca_bundle, EngineClient, InventorySource};
pub use model::{parse_hosts, ClusterRef, Host};
