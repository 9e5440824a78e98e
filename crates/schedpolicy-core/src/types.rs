//! Input types for constraint compilation.
//!
//! Field names serialize in the PascalCase shape used by the workload
//! translation layer that produces these policies, so a policy document can
//! be fed to the compiler without a separate mapping step.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of a service, used as the key into [`PlacementPolicy::location`].
pub type ServiceName = String;

// ── Policy ─────────────────────────────────────────────────────────

/// Orchestrator-neutral description of where a workload may run.
///
/// The shape flags (`big_data`, `pack`, `job`, `is_platform`, `stateless`,
/// `stateful`, `is_daemonset`) are meant to be exclusive. Nothing enforces
/// that here; see [`crate::WorkloadShape::classify`] for how overlapping
/// flags are resolved and [`PlacementPolicy::validate`] for flagging them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PlacementPolicy {
    pub is_daemonset: bool,
    pub stateful: bool,
    /// Marathon only: also accept nodes tagged `any`.
    pub prefer_stateful: bool,
    pub stateless: bool,
    /// Marathon only: also accept nodes tagged `any`.
    pub prefer_stateless: bool,
    pub job: bool,
    /// Marathon only: also accept nodes tagged `any`.
    pub prefer_job: bool,
    pub pack: bool,
    /// Ignored by every backend; pack placement has no `any` fallback.
    pub prefer_pack: bool,
    pub big_data: bool,
    pub is_platform: bool,

    /// Whether `org` is meaningful.
    pub has_org: bool,
    pub org: String,
    /// Whether `workspaces` is meaningful.
    #[serde(rename = "HasWorkSpace")]
    pub has_workspace: bool,
    /// Alternatives: a node in any of these workspaces qualifies.
    #[serde(rename = "WorkSpaces")]
    pub workspaces: Vec<String>,
    /// Marathon only.
    pub has_project: bool,
    pub project: String,

    /// Whether the workload may land on nodes that are *not* locked.
    #[serde(rename = "IsUnLocked")]
    pub is_unlocked: bool,

    /// Per-service location requirements.
    pub location: BTreeMap<ServiceName, LocationEntry>,

    /// Pin to a node by IP. Only the first entry is honored.
    pub specific_host: Vec<String>,
}

// ── Location ───────────────────────────────────────────────────────

/// A per-service location requirement as written in the workload definition.
///
/// - empty `values`: the node must carry no location label
/// - `not = true`: the node must not carry `location-<values[0]>`
/// - otherwise: the node must carry at least one `location-<v>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSelector {
    pub not: bool,
    pub values: Vec<String>,
}

impl LocationSelector {
    /// Selector accepting any of the given locations.
    pub fn any_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            not: false,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Selector rejecting nodes in `value`.
    pub fn not(value: impl Into<String>) -> Self {
        Self {
            not: true,
            values: vec![value.into()],
        }
    }
}

/// A location table entry.
///
/// Policies arrive as loosely typed documents; an entry that does not have
/// the selector shape is kept as `Malformed` and treated as "no location"
/// instead of failing the whole policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationEntry {
    Selector(LocationSelector),
    Malformed(serde_json::Value),
}

impl From<LocationSelector> for LocationEntry {
    fn from(selector: LocationSelector) -> Self {
        LocationEntry::Selector(selector)
    }
}

// ── Service / anti-affinity ────────────────────────────────────────

/// Minimal service identity: the lookup key into the location table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceRef {
    pub name: ServiceName,
}

impl ServiceRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Existing pods to scatter away from.
///
/// Labels are kept in a `BTreeMap` so the generated terms come out in a
/// stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AntiAffinityRequest {
    pub pod_labels: BTreeMap<String, String>,
    /// Hard (never co-schedule) when true, weighted preference otherwise.
    pub required: bool,
}

impl AntiAffinityRequest {
    pub fn required<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pod_labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            required: true,
        }
    }

    pub fn preferred<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            required: false,
            ..Self::required(labels)
        }
    }
}
