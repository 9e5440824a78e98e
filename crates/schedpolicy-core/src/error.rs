//! Policy validation errors.

use thiserror::Error;

use crate::shape::WorkloadShape;

/// Result type alias for policy validation.
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Problems the validation pass reports. The builders never fail on these;
/// they resolve them silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("conflicting workload shapes: {}", join_shapes(.shapes))]
    ConflictingShapes { shapes: Vec<WorkloadShape> },

    #[error("negated location for service {service} lists several values; {ignored:?} are ignored")]
    NegatedLocationValues { service: String, ignored: Vec<String> },
}

fn join_shapes(shapes: &[WorkloadShape]) -> String {
    shapes
        .iter()
        .map(|s| s.label())
        .collect::<Vec<_>>()
        .join(", ")
}
