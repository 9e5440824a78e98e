//! Placement constraint builders.
//!
//! Compiles a [`PlacementPolicy`] into the native constraint language of a
//! target orchestrator. Compilation is pure: the same inputs always produce
//! the same output and no state is kept between calls.
//!
//! # Components
//!
//! - **`k8s`**: node affinity (OR of AND terms) and pod anti-affinity
//! - **`marathon`**: ordered `[attribute, LIKE|UNLIKE, regex]` clauses
//! - **`metronome`**: delegates to the Marathon builder
//! - **`term`**: regex rendering for Marathon/Metronome clauses
//! - **`resolver`**: IP to hostname lookup for host pinning

pub mod k8s;
pub mod marathon;
pub mod metronome;
pub mod resolver;
pub mod term;

use std::fmt;
use std::str::FromStr;

use schedpolicy_core::{AntiAffinityRequest, LabelConfig, PlacementPolicy, ServiceRef};

pub use k8s::{K8sBuilder, K8sConstraints};
pub use marathon::{MarathonBuilder, MarathonConstraints};
pub use metronome::{MetronomeBuilder, MetronomeConstraints};
pub use resolver::{HostnameResolver, StaticHosts};
pub use term::{AttributeConstraint, Operator, TermGroup};

/// Target orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Kubernetes,
    Marathon,
    Metronome,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::Kubernetes => "k8s",
            Backend::Marathon => "marathon",
            Backend::Metronome => "metronome",
        })
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "k8s" | "kubernetes" => Ok(Backend::Kubernetes),
            "marathon" => Ok(Backend::Marathon),
            "metronome" => Ok(Backend::Metronome),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Output of a constraint builder.
///
/// Callers that only hand the result to an orchestrator template can treat
/// it opaquely through this trait; the concrete types expose the structure.
pub trait Constraints: fmt::Debug + Send + Sync {
    fn backend(&self) -> Backend;

    /// The constraints in the orchestrator's own JSON schema.
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;
}

/// Everything a builder may consume for one service.
#[derive(Clone, Copy)]
pub struct BuildRequest<'a> {
    pub policy: &'a PlacementPolicy,
    pub service: Option<&'a ServiceRef>,
    /// Kubernetes only.
    pub anti_affinity: &'a [AntiAffinityRequest],
    /// Kubernetes only.
    pub resolver: Option<&'a dyn HostnameResolver>,
}

impl<'a> BuildRequest<'a> {
    pub fn new(policy: &'a PlacementPolicy, service: Option<&'a ServiceRef>) -> Self {
        Self {
            policy,
            service,
            anti_affinity: &[],
            resolver: None,
        }
    }

    pub fn with_anti_affinity(mut self, requests: &'a [AntiAffinityRequest]) -> Self {
        self.anti_affinity = requests;
        self
    }

    pub fn with_resolver(mut self, resolver: &'a dyn HostnameResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }
}

impl fmt::Debug for BuildRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildRequest")
            .field("policy", self.policy)
            .field("service", &self.service)
            .field("anti_affinity", &self.anti_affinity)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// A backend-specific constraint compiler.
pub trait ConstraintBuilder {
    type Output: Constraints;

    fn build(&self, request: &BuildRequest<'_>) -> Self::Output;
}

// ── Facade ─────────────────────────────────────────────────────────

/// Kubernetes affinity for `service` with the default label vocabulary.
pub fn k8s(
    policy: &PlacementPolicy,
    service: Option<&ServiceRef>,
    anti_affinity: &[AntiAffinityRequest],
    resolver: Option<&dyn HostnameResolver>,
) -> K8sConstraints {
    let request = BuildRequest {
        policy,
        service,
        anti_affinity,
        resolver,
    };
    K8sBuilder::default().build(&request)
}

/// Marathon constraints for `service` with the default label vocabulary.
pub fn marathon(policy: &PlacementPolicy, service: Option<&ServiceRef>) -> MarathonConstraints {
    MarathonBuilder::default().build(&BuildRequest::new(policy, service))
}

/// Metronome constraints for `service` with the default label vocabulary.
pub fn metronome(policy: &PlacementPolicy, service: Option<&ServiceRef>) -> MetronomeConstraints {
    MetronomeBuilder::default().build(&BuildRequest::new(policy, service))
}

/// Compile for a backend chosen at runtime.
pub fn compile(
    backend: Backend,
    labels: &LabelConfig,
    request: &BuildRequest<'_>,
) -> Box<dyn Constraints> {
    match backend {
        Backend::Kubernetes => Box::new(K8sBuilder::new(labels.clone()).build(request)),
        Backend::Marathon => Box::new(MarathonBuilder::new(labels.clone()).build(request)),
        Backend::Metronome => Box::new(MetronomeBuilder::new(labels.clone()).build(request)),
    }
}
