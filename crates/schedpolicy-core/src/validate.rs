//! Optional lint pass over a policy.
//!
//! Builders accept any policy. This pass surfaces the inputs they resolve
//! silently, for callers that would rather reject them up front.

use crate::error::{PolicyError, PolicyResult};
use crate::shape::WorkloadShape;
use crate::types::{LocationEntry, PlacementPolicy};

impl PlacementPolicy {
    /// Every shape whose flag is set, highest precedence first.
    pub fn active_shapes(&self) -> Vec<WorkloadShape> {
        WorkloadShape::ALL
            .into_iter()
            .filter(|shape| shape.is_flagged(self))
            .collect()
    }

    /// Check that at most one shape is set and that negated locations name
    /// a single value.
    ///
    /// `job` together with `is_platform` describes a platform job and is
    /// accepted.
    pub fn validate(&self) -> PolicyResult<()> {
        let shapes = self.active_shapes();
        let platform_job = shapes == [WorkloadShape::Platform, WorkloadShape::Job];
        if shapes.len() > 1 && !platform_job {
            return Err(PolicyError::ConflictingShapes { shapes });
        }

        for (service, entry) in &self.location {
            let LocationEntry::Selector(selector) = entry else {
                continue;
            };
            if selector.not && selector.values.len() > 1 {
                return Err(PolicyError::NegatedLocationValues {
                    service: service.clone(),
                    ignored: selector.values[1..].to_vec(),
                });
            }
        }

        Ok(())
    }
}
