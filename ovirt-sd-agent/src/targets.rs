//! Prometheus file_sd target groups
//!
//! Hosts are grouped by cluster id. Groups keep the order in which their
//! cluster was first seen, and addresses keep input order within a group.
//! Nothing is deduplicated.

use crate::inventory::Host;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Label carrying the cluster id on every group
pub const CLUSTER_LABEL: &str = "cluster";

/// One `{targets, labels}` entry of a file_sd document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub targets: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

impl TargetGroup {
    fn for_cluster(cluster_id: &str, address: &str) -> Self {
        Self {
            targets: vec![address.to_string()],
            labels: BTreeMap::from([(CLUSTER_LABEL.to_string(), cluster_id.to_string())]),
        }
    }

    pub fn cluster(&self) -> Option<&str> {
        self.labels.get(CLUSTER_LABEL).map(String::as_str)
    }
}

/// Build one group per distinct cluster id
pub fn group_by_cluster(hosts: &[Host]) -> Vec<TargetGroup> {
    let mut groups: Vec<TargetGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for host in hosts {
        match index.get(host.cluster.id.as_str()).copied() {
            Some(i) => groups[i].targets.push(host.address.clone()),
            None => {
                index.insert(&host.cluster.id, groups.len());
                groups.push(TargetGroup::for_cluster(&host.cluster.id, &host.address));
            }
        }
    }

    groups
}
