//! IP → hostname lookup used to pin a workload to one node.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;

use tracing::debug;

/// Inventory lookup from a node IP to its hostname (the Kubernetes node
/// name).
///
/// `None`, or an empty hostname, means the IP is unknown; the builder then
/// leaves placement unpinned.
pub trait HostnameResolver {
    fn ip_to_hostname(&self, ip: &str) -> Option<String>;
}

impl HostnameResolver for HashMap<String, String> {
    fn ip_to_hostname(&self, ip: &str) -> Option<String> {
        self.get(ip).cloned()
    }
}

impl HostnameResolver for BTreeMap<String, String> {
    fn ip_to_hostname(&self, ip: &str) -> Option<String> {
        self.get(ip).cloned()
    }
}

/// Static inventory parsed from `/etc/hosts`-format content.
///
/// Each non-comment line is `<IP> <hostname> [aliases ...]`; the first
/// hostname is the node name. When an IP appears on several lines the first
/// line wins.
#[derive(Clone, Debug, Default)]
pub struct StaticHosts {
    entries: HashMap<IpAddr, String>,
}

impl StaticHosts {
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            let Some(ip_str) = parts.next() else {
                continue;
            };
            let Ok(ip) = ip_str.parse::<IpAddr>() else {
                debug!(line = %line, "skipping hosts line with invalid IP");
                continue;
            };
            let Some(hostname) = parts.next().filter(|h| !h.starts_with('#')) else {
                debug!(line = %line, "skipping hosts line without hostname");
                continue;
            };

            entries.entry(ip).or_insert_with(|| hostname.to_string());
        }

        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HostnameResolver for StaticHosts {
    fn ip_to_hostname(&self, ip: &str) -> Option<String> {
        let Ok(addr) = ip.trim().parse::<IpAddr>() else {
            debug!(ip, "not an IP address");
            return None;
        };
        self.entries.get(&addr).cloned()
    }
}
