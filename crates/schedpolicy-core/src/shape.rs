//! Workload shape classification.
//!
//! A policy carries one boolean per shape, and callers may set several.
//! [`WorkloadShape::classify`] picks exactly one by precedence, so builders
//! never re-derive the exclusion rules themselves.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::PlacementPolicy;

/// The scheduling class of a workload. Nodes advertise which classes they
/// accept through category labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkloadShape {
    #[serde(rename = "bigdata-job")]
    BigDataJob,
    PackJob,
    Job,
    Platform,
    StatelessService,
    StatefulService,
    Daemonset,
}

impl WorkloadShape {
    /// All shapes, highest precedence first.
    pub const ALL: [WorkloadShape; 7] = [
        WorkloadShape::BigDataJob,
        WorkloadShape::PackJob,
        WorkloadShape::Platform,
        WorkloadShape::Job,
        WorkloadShape::StatelessService,
        WorkloadShape::StatefulService,
        WorkloadShape::Daemonset,
    ];

    /// Pick the single shape that applies to `policy`.
    ///
    /// Precedence: bigdata-job, pack-job, platform, job. A job that is also
    /// a platform workload is classified as platform. The three service-like
    /// shapes (stateless, stateful, daemonset) only apply when exactly one of
    /// them is set; two or more of them together yield `None`.
    pub fn classify(policy: &PlacementPolicy) -> Option<Self> {
        if policy.big_data {
            return Some(WorkloadShape::BigDataJob);
        }
        if policy.pack {
            return Some(WorkloadShape::PackJob);
        }
        if policy.is_platform {
            return Some(WorkloadShape::Platform);
        }
        if policy.job {
            return Some(WorkloadShape::Job);
        }

        match (policy.stateless, policy.stateful, policy.is_daemonset) {
            (true, false, false) => Some(WorkloadShape::StatelessService),
            (false, true, false) => Some(WorkloadShape::StatefulService),
            (false, false, true) => Some(WorkloadShape::Daemonset),
            _ => None,
        }
    }

    /// The category label this shape is known by.
    pub fn label(self) -> &'static str {
        match self {
            WorkloadShape::BigDataJob => "bigdata-job",
            WorkloadShape::PackJob => "pack-job",
            WorkloadShape::Job => "job",
            WorkloadShape::Platform => "platform",
            WorkloadShape::StatelessService => "stateless-service",
            WorkloadShape::StatefulService => "stateful-service",
            WorkloadShape::Daemonset => "daemonset",
        }
    }

    /// Whether placement is narrowed to the policy's workspaces.
    pub fn honors_workspace(self) -> bool {
        matches!(
            self,
            WorkloadShape::StatefulService
                | WorkloadShape::StatelessService
                | WorkloadShape::BigDataJob
                | WorkloadShape::Daemonset
        )
    }

    /// Whether placement is narrowed to the policy's org.
    pub fn honors_org(self) -> bool {
        self != WorkloadShape::Platform
    }

    /// Whether the shape's own flag is set on `policy`, ignoring precedence.
    pub fn is_flagged(self, policy: &PlacementPolicy) -> bool {
        match self {
            WorkloadShape::BigDataJob => policy.big_data,
            WorkloadShape::PackJob => policy.pack,
            WorkloadShape::Job => policy.job,
            WorkloadShape::Platform => policy.is_platform,
            WorkloadShape::StatelessService => policy.stateless,
            WorkloadShape::StatefulService => policy.stateful,
            WorkloadShape::Daemonset => policy.is_daemonset,
        }
    }
}

impl PlacementPolicy {
    /// Whether pods are spread across nodes as batch work.
    ///
    /// Decided on the raw flags, not the classified shape: a platform job is
    /// still spread.
    pub fn is_batch(&self) -> bool {
        self.job || self.pack || self.big_data
    }
}

impl fmt::Display for WorkloadShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
