//! Metronome attribute constraint builder.
//!
//! Metronome jobs use the same constraint language as Marathon apps, so the
//! builder hands the request to a [`MarathonBuilder`] and rewraps the result.

use serde::{Deserialize, Serialize};
use std::ops::Deref;

use schedpolicy_core::LabelConfig;

use crate::marathon::{MarathonBuilder, MarathonConstraints};
use crate::{Backend, BuildRequest, ConstraintBuilder, Constraints};

/// Metronome `placement.constraints`, shaped exactly like Marathon's.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetronomeConstraints(pub MarathonConstraints);

impl MetronomeConstraints {
    pub fn into_inner(self) -> MarathonConstraints {
        self.0
    }
}

impl Deref for MetronomeConstraints {
    type Target = MarathonConstraints;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Constraints for MetronomeConstraints {
    fn backend(&self) -> Backend {
        Backend::Metronome
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Builds [`MetronomeConstraints`].
#[derive(Debug, Clone, Default)]
pub struct MetronomeBuilder {
    marathon: MarathonBuilder,
}

impl MetronomeBuilder {
    pub fn new(labels: LabelConfig) -> Self {
        Self {
            marathon: MarathonBuilder::new(labels),
        }
    }
}

impl ConstraintBuilder for MetronomeBuilder {
    type Output = MetronomeConstraints;

    fn build(&self, request: &BuildRequest<'_>) -> MetronomeConstraints {
        MetronomeConstraints(self.marathon.build(request))
    }
}
