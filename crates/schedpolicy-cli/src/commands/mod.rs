pub mod compile;
pub mod validate;

use std::path::Path;

use anyhow::Context;
use schedpolicy_core::PlacementPolicy;

/// Read a placement policy from a JSON file.
pub fn load_policy(path: &str) -> anyhow::Result<PlacementPolicy> {
    let content = std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("failed to read policy {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse policy {path}"))
}
