//! Scheduler configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::SchedulerPolicyType;

/// The well-known topology label carrying a node's availability zone.
pub const DEFAULT_ZONE_LABEL: &str = "topology.kubernetes.io/zone";

/// Static configuration for a scheduler + autoscaler pair.
///
/// Loads from TOML; every field has a default. Leaving `policy` unset
/// selects the predicate/priority plugin pipeline instead of a built-in
/// strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Name of the worker pool; workers are named `<pool_name>-<ordinal>`.
    #[serde(default = "default_pool_name")]
    pub pool_name: String,
    /// Maximum vreplicas one worker may carry.
    #[serde(default = "default_capacity")]
    pub capacity: i32,
    /// Built-in placement strategy. `None` selects the plugin pipeline.
    #[serde(default)]
    pub policy: Option<SchedulerPolicyType>,
    /// Autoscaler refresh period in seconds.
    #[serde(default = "default_refresh_period_secs")]
    pub refresh_period_secs: u64,
    /// Lower bound for the autoscaled pool size.
    #[serde(default)]
    pub min_replicas: i32,
    /// Upper bound for the autoscaled pool size.
    #[serde(default = "default_max_replicas")]
    pub max_replicas: i32,
    /// Node label whose value is the availability zone.
    #[serde(default = "default_zone_label")]
    pub zone_label: String,
    /// Upper bound on the number of occupied workers, enforced by the
    /// `NoMaxResourceCount` predicate.
    #[serde(default = "default_max_resource_count")]
    pub max_resource_count: i32,
}

fn default_pool_name() -> String {
    "vgrid-worker".to_string()
}

fn default_capacity() -> i32 {
    10
}

fn default_refresh_period_secs() -> u64 {
    15
}

fn default_max_replicas() -> i32 {
    100
}

fn default_zone_label() -> String {
    DEFAULT_ZONE_LABEL.to_string()
}

fn default_max_resource_count() -> i32 {
    100
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pool_name: default_pool_name(),
            capacity: default_capacity(),
            policy: None,
            refresh_period_secs: default_refresh_period_secs(),
            min_replicas: 0,
            max_replicas: default_max_replicas(),
            zone_label: default_zone_label(),
            max_resource_count: default_max_resource_count(),
        }
    }
}

impl SchedulerConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SchedulerConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_period_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pool_name.is_empty() {
            anyhow::bail!("pool_name must not be empty");
        }
        if self.capacity < 1 {
            anyhow::bail!("capacity must be at least 1, got {}", self.capacity);
        }
        if self.min_replicas < 0 {
            anyhow::bail!("min_replicas must not be negative, got {}", self.min_replicas);
        }
        if self.min_replicas > self.max_replicas {
            anyhow::bail!(
                "min_replicas ({}) must not exceed max_replicas ({})",
                self.min_replicas,
                self.max_replicas
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capacity, 10);
        assert_eq!(config.policy, None);
    }

    #[test]
    fn parse_minimal_toml() {
        let config: SchedulerConfig = toml::from_str(
            r#"
pool_name = "dispatcher"
capacity = 20
policy = "EVENSPREAD"
"#,
        )
        .unwrap();
        assert_eq!(config.pool_name, "dispatcher");
        assert_eq!(config.capacity, 20);
        assert_eq!(config.policy, Some(SchedulerPolicyType::EvenSpread));
        // Unset fields fall back to defaults.
        assert_eq!(config.zone_label, DEFAULT_ZONE_LABEL);
    }

    #[test]
    fn omitted_policy_selects_pipeline_mode() {
        let config: SchedulerConfig = toml::from_str("pool_name = \"dispatcher\"").unwrap();
        assert_eq!(config.policy, None);
    }

    #[test]
    fn rejects_zero_capacity() {
        let config = SchedulerConfig {
            capacity: 0,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_replica_bounds() {
        let config = SchedulerConfig {
            min_replicas: 10,
            max_replicas: 2,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
