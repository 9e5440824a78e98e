use schedpolicy_core::WorkloadShape;

use super::load_policy;

pub fn validate(path: &str) -> anyhow::Result<()> {
    let shape = check(path)?;
    match shape {
        Some(shape) => println!("✓ Policy is valid ({shape})"),
        None => println!("✓ Policy is valid (no workload shape, placement unconstrained)"),
    }
    Ok(())
}

/// Validate the policy at `path` and return the shape it compiles as.
pub fn check(path: &str) -> anyhow::Result<Option<WorkloadShape>> {
    let policy = load_policy(path)?;
    policy.validate()?;
    Ok(WorkloadShape::classify(&policy))
}
