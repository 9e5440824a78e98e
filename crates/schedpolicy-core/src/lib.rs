//! schedpolicy-core: the orchestrator-neutral side of placement.
//!
//! Holds the input model every constraint builder consumes:
//!
//! - **`types`**: `PlacementPolicy`, `ServiceRef`, `AntiAffinityRequest`
//! - **`location`**: per-service location requirement resolution
//! - **`shape`**: classification of a policy into a single `WorkloadShape`
//! - **`config`**: label vocabulary and naming (`LabelConfig`)
//! - **`validate`**: optional lint pass over conflicting flags

pub mod config;
pub mod error;
pub mod location;
pub mod shape;
pub mod types;
pub mod validate;

pub use config::LabelConfig;
pub use error::{PolicyError, PolicyResult};
pub use location::LocationRequirement;
pub use shape::WorkloadShape;
pub use types::*;
