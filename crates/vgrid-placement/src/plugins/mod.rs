//! Built-in predicates and priorities.

pub mod availability_node_priority;
pub mod availability_zone_priority;
pub mod even_pod_spread;
pub mod lowest_ordinal_priority;
pub mod no_max_resource_count;
pub mod pod_fits_resources;

pub use availability_node_priority::AvailabilityNodePriority;
pub use availability_zone_priority::AvailabilityZonePriority;
pub use even_pod_spread::EvenPodSpread;
pub use lowest_ordinal_priority::LowestOrdinalPriority;
pub use no_max_resource_count::NoMaxResourceCount;
pub use pod_fits_resources::PodFitsResources;

/// Well-known plugin names, as referenced from a
/// [`SchedulerPolicy`](crate::SchedulerPolicy).
pub const POD_FITS_RESOURCES: &str = "PodFitsResources";
pub const NO_MAX_RESOURCE_COUNT: &str = "NoMaxResourceCount";
pub const EVEN_POD_SPREAD: &str = "EvenPodSpread";
pub const LOWEST_ORDINAL_PRIORITY: &str = "LowestOrdinalPriority";
pub const AVAILABILITY_ZONE_PRIORITY: &str = "AvailabilityZonePriority";
pub const AVAILABILITY_NODE_PRIORITY: &str = "AvailabilityNodePriority";
