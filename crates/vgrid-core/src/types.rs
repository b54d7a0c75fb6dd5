//! Shared data types for the vgrid scheduler.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a vpod: namespace plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VPodKey {
    pub namespace: String,
    pub name: String,
}

impl VPodKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for VPodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A number of vreplicas assigned to one worker on behalf of one vpod.
///
/// Invariants: `vreplicas >= 0`; a vpod's placement list holds at most one
/// entry per worker name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub worker_name: String,
    pub vreplicas: i32,
}

impl Placement {
    pub fn new(worker_name: impl Into<String>, vreplicas: i32) -> Self {
        Self {
            worker_name: worker_name.into(),
            vreplicas,
        }
    }
}

/// Total vreplicas across a placement list.
pub fn total_vreplicas(placements: &[Placement]) -> i32 {
    placements.iter().map(|p| p.vreplicas).sum()
}

/// A virtual pod: a workload with a desired vreplica count and its current
/// committed placements.
///
/// The scheduler only reads vpods. It returns a proposed placement list
/// that the surrounding controller commits back to the vpod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VPod {
    pub key: VPodKey,
    /// Desired number of vreplicas.
    pub vreplicas: i32,
    /// Currently committed placements.
    pub placements: Vec<Placement>,
}

impl VPod {
    pub fn new(key: VPodKey, vreplicas: i32, placements: Vec<Placement>) -> Self {
        Self {
            key,
            vreplicas,
            placements,
        }
    }
}

/// A cluster node as seen by the [`NodeInventory`](crate::NodeInventory).
///
/// `labels` is the node's raw label set; the state builder resolves the
/// availability zone from the configured zone label key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub unschedulable: bool,
    pub labels: HashMap<String, String>,
}

impl Node {
    /// The node's availability zone under the given zone label key.
    pub fn zone(&self, zone_label: &str) -> Option<&str> {
        self.labels.get(zone_label).map(String::as_str)
    }
}

/// Built-in placement strategies.
///
/// `None` at the call sites means the predicate/priority plugin pipeline is
/// in charge instead of a built-in strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerPolicyType {
    /// Pack vreplicas onto the lowest ordinals, filling workers up.
    #[serde(rename = "MAXFILLUP")]
    MaxFillup,
    /// Spread vreplicas evenly across availability zones.
    #[serde(rename = "EVENSPREAD")]
    EvenSpread,
    /// Spread vreplicas evenly across nodes.
    #[serde(rename = "EVENSPREAD_BYNODE")]
    EvenSpreadByNode,
}

impl SchedulerPolicyType {
    /// Whether the policy needs failure-domain information in the state
    /// snapshot.
    pub fn is_spread(&self) -> bool {
        matches!(self, Self::EvenSpread | Self::EvenSpreadByNode)
    }
}
