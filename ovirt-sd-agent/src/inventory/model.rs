use crate::error::DecodeError;
use serde::Deserialize;

/// One hypervisor as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Host {
    pub address: String,
    pub cluster: ClusterRef,
}

/// Cluster link embedded in a host; only the id is used
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct HostListing {
    // absent and null both mean "no hosts"
    #[serde(default)]
    host: Option<Vec<Host>>,
}

/// Decode the engine's `GET /hosts` body
///
/// Fields other than `address` and `cluster.id` are ignored.
pub fn parse_hosts(body: &[u8]) -> Result<Vec<Host>, DecodeError> {
    let listing: HostListing = serde_json::from_slice(body)?;
    Ok(listing.host.unwrap_or_default())
}

impl Host {
    pub fn new(address: impl Into<String>, cluster_id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            cluster: ClusterRef {
                id: cluster_id.into(),
            },
        }
    }
}
