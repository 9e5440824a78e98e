//! Label vocabulary configuration (`labels.toml`).

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Names used when rendering constraints.
///
/// Every field may be omitted from the file; missing fields take the
/// defaults of a stock cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Prefix of every Kubernetes node label, e.g. `dice/` in `dice/locked`.
    pub k8s_label_prefix: String,
    /// Agent attribute the Marathon/Metronome tag clauses match against.
    pub marathon_attribute: String,
    /// Agent attribute used to pin a task to a host.
    pub marathon_hostname_attribute: String,
    /// Topology key spreading pods across zones.
    pub zone_topology_key: String,
    /// Topology key spreading pods across nodes.
    pub host_topology_key: String,
    /// Weight of every preferred pod anti-affinity term.
    pub anti_affinity_weight: i32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            k8s_label_prefix: "dice/".to_string(),
            marathon_attribute: "dice_tags".to_string(),
            marathon_hostname_attribute: "hostname".to_string(),
            zone_topology_key: "dice/topology-zone".to_string(),
            host_topology_key: "kubernetes.io/hostname".to_string(),
            anti_affinity_weight: 100,
        }
    }
}

impl LabelConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LabelConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Full Kubernetes label key for `label`, e.g. `dice/org-1`.
    pub fn k8s_label(&self, label: &str) -> String {
        format!("{}{}", self.k8s_label_prefix, label)
    }
}
