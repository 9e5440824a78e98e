//! Kubernetes affinity builder.
//!
//! Node affinity is a list of required terms: a node qualifies if it
//! satisfies *any* term, and satisfies a term if it satisfies *all* of that
//! term's match expressions. Each term is assembled from:
//!
//! ```text
//! locked?  ∧  location  ∧  [org]  ∧  [workspace]  ∧  [category]
//! ```
//!
//! Location and workspace are alternatives (a service may accept several
//! locations, a policy several workspaces), so the required terms are the
//! product of location × workspace clauses. Shapes that ignore workspaces
//! (job, pack-job, platform) get one term per location.
//!
//! Pod anti-affinity spreads batch pods across nodes and scatters a
//! workload away from the pods described by [`AntiAffinityRequest`]s.

use k8s_openapi::api::core::v1::{
    Affinity, NodeAffinity, NodeSelector, NodeSelectorRequirement, NodeSelectorTerm,
    PodAffinityTerm, PodAntiAffinity, WeightedPodAffinityTerm,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use serde::{Deserialize, Serialize};
use tracing::debug;

use schedpolicy_core::{
    AntiAffinityRequest, LabelConfig, LocationRequirement, PlacementPolicy, ServiceRef,
    WorkloadShape,
};

use crate::resolver::HostnameResolver;
use crate::{Backend, BuildRequest, ConstraintBuilder, Constraints};

const OP_EXISTS: &str = "Exists";
const OP_DOES_NOT_EXIST: &str = "DoesNotExist";
const OP_IN: &str = "In";

/// Field selector key naming a node.
const NODE_NAME_FIELD: &str = "metadata.name";

/// Kubernetes placement constraints: a pod spec `affinity` value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct K8sConstraints {
    pub affinity: Affinity,
}

impl K8sConstraints {
    pub fn into_affinity(self) -> Affinity {
        self.affinity
    }

    /// Required node selector terms (OR-ed). Empty when unconstrained.
    pub fn required_terms(&self) -> &[NodeSelectorTerm] {
        self.affinity
            .node_affinity
            .as_ref()
            .and_then(|na| na.required_during_scheduling_ignored_during_execution.as_ref())
            .map(|selector| selector.node_selector_terms.as_slice())
            .unwrap_or_default()
    }

    /// Hard pod anti-affinity terms.
    pub fn required_anti_affinity(&self) -> &[PodAffinityTerm] {
        self.affinity
            .pod_anti_affinity
            .as_ref()
            .and_then(|pa| pa.required_during_scheduling_ignored_during_execution.as_deref())
            .unwrap_or_default()
    }

    /// Weighted pod anti-affinity terms.
    pub fn preferred_anti_affinity(&self) -> &[WeightedPodAffinityTerm] {
        self.affinity
            .pod_anti_affinity
            .as_ref()
            .and_then(|pa| pa.preferred_during_scheduling_ignored_during_execution.as_deref())
            .unwrap_or_default()
    }
}

impl Constraints for K8sConstraints {
    fn backend(&self) -> Backend {
        Backend::Kubernetes
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Builds [`K8sConstraints`] from a placement policy.
#[derive(Debug, Clone, Default)]
pub struct K8sBuilder {
    labels: LabelConfig,
}

impl K8sBuilder {
    pub fn new(labels: LabelConfig) -> Self {
        Self { labels }
    }

    fn presence(&self, label: &str, exists: bool) -> NodeSelectorRequirement {
        NodeSelectorRequirement {
            key: self.labels.k8s_label(label),
            operator: if exists { OP_EXISTS } else { OP_DOES_NOT_EXIST }.to_string(),
            values: None,
        }
    }

    fn location_clauses(&self, requirement: LocationRequirement<'_>) -> Vec<NodeSelectorRequirement> {
        match requirement {
            LocationRequirement::Unassigned => vec![self.presence("location", false)],
            LocationRequirement::Excluded(value) => {
                vec![self.presence(&format!("location-{value}"), false)]
            }
            LocationRequirement::AnyOf(values) => values
                .iter()
                .map(|v| self.presence(&format!("location-{v}"), true))
                .collect(),
        }
    }

    /// Workspace alternatives. `None` stands for "no workspace clause" and is
    /// the only alternative when the shape or policy is not workspace scoped.
    fn workspace_alternatives(
        &self,
        policy: &PlacementPolicy,
        shape: WorkloadShape,
    ) -> Vec<Option<NodeSelectorRequirement>> {
        if !shape.honors_workspace() || !policy.has_workspace {
            return vec![None];
        }
        policy
            .workspaces
            .iter()
            .map(|ws| Some(self.presence(&format!("workspace-{ws}"), true)))
            .collect()
    }

    /// Required node selector terms for `shape`.
    fn node_terms(
        &self,
        policy: &PlacementPolicy,
        service: Option<&ServiceRef>,
        shape: WorkloadShape,
    ) -> Vec<NodeSelectorTerm> {
        let unlocked = self.presence("locked", !policy.is_unlocked);
        let locations = self.location_clauses(policy.location_for(service));
        let org = (shape.honors_org() && policy.has_org)
            .then(|| self.presence(&format!("org-{}", policy.org), true));
        let workspaces = self.workspace_alternatives(policy, shape);
        // Daemonsets run on any node matching scope; there is no category label.
        let category =
            (shape != WorkloadShape::Daemonset).then(|| self.presence(shape.label(), true));

        if workspaces.is_empty() {
            debug!(%shape, "workspace scoping requested without workspaces, no node terms");
        }

        product(&locations, &workspaces)
            .map(|(location, workspace)| {
                let expressions = [
                    Some(&unlocked),
                    Some(location),
                    org.as_ref(),
                    workspace,
                    category.as_ref(),
                ]
                .into_iter()
                .flatten()
                .cloned()
                .collect();
                NodeSelectorTerm {
                    match_expressions: Some(expressions),
                    match_fields: None,
                }
            })
            .collect()
    }

    /// Term pinning the pod to the node behind `SpecificHost[0]`.
    fn specific_host_term(
        &self,
        policy: &PlacementPolicy,
        resolver: Option<&dyn HostnameResolver>,
    ) -> Option<NodeSelectorTerm> {
        let ip = policy.specific_host.first()?;
        let Some(resolver) = resolver else {
            debug!(ip = %ip, "no hostname resolver, specific host ignored");
            return None;
        };
        let Some(hostname) = resolver.ip_to_hostname(ip).filter(|h| !h.is_empty()) else {
            debug!(ip = %ip, "specific host did not resolve, keeping node terms");
            return None;
        };

        Some(NodeSelectorTerm {
            match_expressions: None,
            match_fields: Some(vec![NodeSelectorRequirement {
                key: NODE_NAME_FIELD.to_string(),
                operator: OP_IN.to_string(),
                values: Some(vec![hostname]),
            }]),
        })
    }

    fn job_spread_term(&self) -> WeightedPodAffinityTerm {
        WeightedPodAffinityTerm {
            weight: self.labels.anti_affinity_weight,
            pod_affinity_term: PodAffinityTerm {
                label_selector: Some(LabelSelector {
                    match_expressions: Some(vec![LabelSelectorRequirement {
                        key: self.labels.k8s_label("job"),
                        operator: OP_EXISTS.to_string(),
                        values: None,
                    }]),
                    match_labels: None,
                }),
                topology_key: self.labels.host_topology_key.clone(),
                ..Default::default()
            },
        }
    }

    /// Zone-scoped then node-scoped terms for one pod label.
    fn scatter_terms(&self, key: &str, value: &str) -> [PodAffinityTerm; 2] {
        let term = |topology_key: &str| PodAffinityTerm {
            label_selector: Some(LabelSelector {
                match_expressions: Some(vec![LabelSelectorRequirement {
                    key: key.to_string(),
                    operator: OP_IN.to_string(),
                    values: Some(vec![value.to_string()]),
                }]),
                match_labels: None,
            }),
            topology_key: topology_key.to_string(),
            ..Default::default()
        };
        [
            term(&self.labels.zone_topology_key),
            term(&self.labels.host_topology_key),
        ]
    }

    fn anti_affinity(
        &self,
        policy: &PlacementPolicy,
        requests: &[AntiAffinityRequest],
    ) -> (Vec<PodAffinityTerm>, Vec<WeightedPodAffinityTerm>) {
        let mut required = Vec::new();
        let mut preferred = Vec::new();

        if policy.is_batch() {
            preferred.push(self.job_spread_term());
        }

        for request in requests {
            for (key, value) in &request.pod_labels {
                let terms = self.scatter_terms(key, value);
                if request.required {
                    required.extend(terms);
                } else {
                    preferred.extend(terms.into_iter().map(|pod_affinity_term| {
                        WeightedPodAffinityTerm {
                            weight: self.labels.anti_affinity_weight,
                            pod_affinity_term,
                        }
                    }));
                }
            }
        }

        (required, preferred)
    }
}

impl ConstraintBuilder for K8sBuilder {
    type Output = K8sConstraints;

    fn build(&self, request: &BuildRequest<'_>) -> K8sConstraints {
        let policy = request.policy;
        let shape = WorkloadShape::classify(policy);

        let mut node_terms = match shape {
            Some(shape) => self.node_terms(policy, request.service, shape),
            None => {
                debug!("no workload shape applies, no node terms");
                Vec::new()
            }
        };
        if let Some(pin) = self.specific_host_term(policy, request.resolver) {
            node_terms = vec![pin];
        }

        let (required, preferred) = self.anti_affinity(policy, request.anti_affinity);

        debug!(
            shape = ?shape,
            node_terms = node_terms.len(),
            required_anti_affinity = required.len(),
            preferred_anti_affinity = preferred.len(),
            "built kubernetes constraints"
        );

        // An empty selector rejects every node; an absent one admits all.
        // Only keep the parts that carry terms.
        let node_affinity = (!node_terms.is_empty()).then(|| NodeAffinity {
            required_during_scheduling_ignored_during_execution: Some(NodeSelector {
                node_selector_terms: node_terms,
            }),
            preferred_during_scheduling_ignored_during_execution: None,
        });
        let pod_anti_affinity = (!required.is_empty() || !preferred.is_empty()).then(|| {
            PodAntiAffinity {
                required_during_scheduling_ignored_during_execution: (!required.is_empty())
                    .then_some(required),
                preferred_during_scheduling_ignored_during_execution: (!preferred.is_empty())
                    .then_some(preferred),
            }
        });

        K8sConstraints {
            affinity: Affinity {
                node_affinity,
                pod_anti_affinity,
                pod_affinity: None,
            },
        }
    }
}

/// Every `(location, workspace)` pair, locations outermost.
fn product<'a, L, W>(
    locations: &'a [L],
    workspaces: &'a [Option<W>],
) -> impl Iterator<Item = (&'a L, Option<&'a W>)> + 'a {
    locations
        .iter()
        .flat_map(move |l| workspaces.iter().map(move |w| (l, w.as_ref())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schedpolicy_core::LocationSelector;
    use std::collections::HashMap;

    fn build(policy: &PlacementPolicy, service: &str) -> K8sConstraints {
        let service = ServiceRef::new(service);
        K8sBuilder::default().build(&BuildRequest::new(policy, Some(&service)))
    }

    fn keys(term: &NodeSelectorTerm) -> Vec<(String, String)> {
        term.match_expressions
            .iter()
            .flatten()
            .map(|e| (e.key.clone(), e.operator.clone()))
            .collect()
    }

    fn exists(key: &str) -> (String, String) {
        (key.to_string(), OP_EXISTS.to_string())
    }

    fn absent(key: &str) -> (String, String) {
        (key.to_string(), OP_DOES_NOT_EXIST.to_string())
    }

    #[test]
    fn product_orders_locations_outermost() {
        let pairs: Vec<_> = product(&["a", "b"], &[Some(1), Some(2)]).collect();
        assert_eq!(
            pairs,
            vec![(&"a", Some(&1)), (&"a", Some(&2)), (&"b", Some(&1)), (&"b", Some(&2))]
        );

        let pairs: Vec<_> = product(&["a", "b"], &[None::<u8>]).collect();
        assert_eq!(pairs, vec![(&"a", None), (&"b", None)]);
    }

    #[test]
    fn stateful_with_workspaces() {
        let mut policy = PlacementPolicy {
            stateful: true,
            has_workspace: true,
            workspaces: vec!["dev".to_string(), "test".to_string()],
            ..Default::default()
        };
        policy
            .location
            .insert("svcA".to_string(), LocationSelector::any_of(["es"]).into());

        let cons = build(&policy, "svcA");
        let terms = cons.required_terms();
        assert_eq!(terms.len(), 2);
        assert_eq!(
            keys(&terms[0]),
            vec![
                exists("dice/locked"),
                exists("dice/location-es"),
                exists("dice/workspace-dev"),
                exists("dice/stateful-service"),
            ]
        );
        assert_eq!(
            keys(&terms[1]),
            vec![
                exists("dice/locked"),
                exists("dice/location-es"),
                exists("dice/workspace-test"),
                exists("dice/stateful-service"),
            ]
        );
    }

    #[test]
    fn stateless_without_workspace_scoping() {
        let policy = PlacementPolicy {
            stateless: true,
            is_unlocked: true,
            has_org: true,
            org: "1".to_string(),
            workspaces: vec!["ignored".to_string()],
            ..Default::default()
        };

        let cons = build(&policy, "svc");
        let terms = cons.required_terms();
        assert_eq!(terms.len(), 1);
        assert_eq!(
            keys(&terms[0]),
            vec![
                absent("dice/locked"),
                absent("dice/location"),
                exists("dice/org-1"),
                exists("dice/stateless-service"),
            ]
        );
    }

    #[test]
    fn job_ignores_workspaces() {
        let mut policy = PlacementPolicy {
            job: true,
            has_org: true,
            org: "7".to_string(),
            has_workspace: true,
            workspaces: vec!["dev".to_string(), "prod".to_string()],
            ..Default::default()
        };
        policy
            .location
            .insert("svc".to_string(), LocationSelector::any_of(["a", "b", "c"]).into());

        let cons = build(&policy, "svc");
        let terms = cons.required_terms();
        assert_eq!(terms.len(), 3);
        for (term, loc) in terms.iter().zip(["a", "b", "c"]) {
            assert_eq!(
                keys(term),
                vec![
                    exists("dice/locked"),
                    exists(&format!("dice/location-{loc}")),
                    exists("dice/org-7"),
                    exists("dice/job"),
                ]
            );
        }
    }

    #[test]
    fn platform_drops_org_and_supersedes_job() {
        let policy = PlacementPolicy {
            job: true,
            is_platform: true,
            has_org: true,
            org: "1".to_string(),
            ..Default::default()
        };

        let cons = build(&policy, "svc");
        let terms = cons.required_terms();
        assert_eq!(terms.len(), 1);
        assert_eq!(
            keys(&terms[0]),
            vec![
                exists("dice/locked"),
                absent("dice/location"),
                exists("dice/platform"),
            ]
        );
        // Still spread like any other job.
        assert_eq!(cons.preferred_anti_affinity().len(), 1);
        assert!(cons.required_anti_affinity().is_empty());
    }

    #[test]
    fn pack_and_bigdata_categories() {
        let pack = PlacementPolicy {
            pack: true,
            has_workspace: true,
            workspaces: vec!["dev".to_string()],
            ..Default::default()
        };
        let terms = build(&pack, "svc").required_terms().to_vec();
        assert_eq!(terms.len(), 1);
        assert_eq!(
            keys(&terms[0]),
            vec![exists("dice/locked"), absent("dice/location"), exists("dice/pack-job")]
        );

        let bigdata = PlacementPolicy {
            big_data: true,
            has_workspace: true,
            workspaces: vec!["dev".to_string()],
            ..Default::default()
        };
        let terms = build(&bigdata, "svc").required_terms().to_vec();
        assert_eq!(terms.len(), 1);
        assert_eq!(
            keys(&terms[0]),
            vec![
                exists("dice/locked"),
                absent("dice/location"),
                exists("dice/workspace-dev"),
                exists("dice/bigdata-job"),
            ]
        );
    }

    #[test]
    fn daemonset_has_no_category_clause() {
        let policy = PlacementPolicy {
            is_daemonset: true,
            is_unlocked: true,
            ..Default::default()
        };
        let cons = build(&policy, "svc");
        let terms = cons.required_terms();
        assert_eq!(terms.len(), 1);
        assert_eq!(
            keys(&terms[0]),
            vec![absent("dice/locked"), absent("dice/location")]
        );
    }

    #[test]
    fn negated_location_uses_first_value() {
        let mut policy = PlacementPolicy {
            stateless: true,
            ..Default::default()
        };
        policy.location.insert(
            "svc".to_string(),
            LocationSelector {
                not: true,
                values: vec!["a".to_string(), "b".to_string()],
            }
            .into(),
        );

        let cons = build(&policy, "svc");
        let terms = cons.required_terms();
        assert_eq!(terms.len(), 1);
        assert_eq!(keys(&terms[0])[1], absent("dice/location-a"));
        assert!(keys(&terms[0]).iter().all(|(k, _)| !k.ends_with("-b")));
    }

    #[test]
    fn unclassified_policy_has_no_node_affinity() {
        let policy = PlacementPolicy {
            stateful: true,
            stateless: true,
            ..Default::default()
        };
        let cons = build(&policy, "svc");
        assert!(cons.affinity.node_affinity.is_none());
        assert!(cons.affinity.pod_anti_affinity.is_none());
        assert_eq!(cons.to_json().unwrap(), serde_json::json!({}));
    }

    #[test]
    fn workspace_scoping_without_workspaces_leaves_placement_open() {
        let policy = PlacementPolicy {
            stateful: true,
            has_workspace: true,
            ..Default::default()
        };
        let cons = build(&policy, "svc");
        assert!(cons.required_terms().is_empty());
        assert!(cons.affinity.node_affinity.is_none());
    }

    #[test]
    fn specific_host_replaces_terms() {
        let mut policy = PlacementPolicy {
            stateful: true,
            has_workspace: true,
            workspaces: vec!["dev".to_string(), "test".to_string()],
            specific_host: vec!["10.168.0.80".to_string(), "10.168.0.81".to_string()],
            ..Default::default()
        };
        policy
            .location
            .insert("svc".to_string(), LocationSelector::any_of(["a", "b"]).into());

        let mut hosts = HashMap::new();
        hosts.insert("10.168.0.80".to_string(), "node-010168000080".to_string());
        hosts.insert("10.168.0.81".to_string(), "node-010168000081".to_string());

        let service = ServiceRef::new("svc");
        let cons = K8sBuilder::default()
            .build(&BuildRequest::new(&policy, Some(&service)).with_resolver(&hosts));

        let terms = cons.required_terms();
        assert_eq!(terms.len(), 1);
        assert!(terms[0].match_expressions.is_none());
        assert_eq!(
            serde_json::to_value(&terms[0]).unwrap(),
            serde_json::json!({
                "matchFields": [{
                    "key": "metadata.name",
                    "operator": "In",
                    "values": ["node-010168000080"],
                }]
            })
        );
    }

    #[test]
    fn unresolved_specific_host_keeps_terms() {
        let policy = PlacementPolicy {
            stateless: true,
            specific_host: vec!["10.0.0.9".to_string()],
            ..Default::default()
        };
        let mut hosts = HashMap::new();
        hosts.insert("10.0.0.9".to_string(), String::new());
        let service = ServiceRef::new("svc");

        let empty = K8sBuilder::default()
            .build(&BuildRequest::new(&policy, Some(&service)).with_resolver(&hosts));
        assert_eq!(keys(&empty.required_terms()[0])[2], exists("dice/stateless-service"));

        let unresolved = build(&policy, "svc");
        assert_eq!(unresolved.required_terms().len(), 1);
        assert!(unresolved.required_terms()[0].match_fields.is_none());
    }

    #[test]
    fn batch_shapes_spread_across_nodes() {
        for policy in [
            PlacementPolicy { job: true, ..Default::default() },
            PlacementPolicy { pack: true, ..Default::default() },
            PlacementPolicy { big_data: true, ..Default::default() },
            PlacementPolicy { job: true, is_platform: true, ..Default::default() },
        ] {
            let cons = build(&policy, "svc");
            assert!(cons.required_anti_affinity().is_empty());
            let preferred = cons.preferred_anti_affinity();
            assert_eq!(preferred.len(), 1);
            assert_eq!(preferred[0].weight, 100);
            assert_eq!(
                serde_json::to_value(&preferred[0].pod_affinity_term).unwrap(),
                serde_json::json!({
                    "labelSelector": {
                        "matchExpressions": [{"key": "dice/job", "operator": "Exists"}]
                    },
                    "topologyKey": "kubernetes.io/hostname",
                })
            );
        }

        for policy in [
            PlacementPolicy { stateful: true, ..Default::default() },
            PlacementPolicy { is_platform: true, ..Default::default() },
        ] {
            assert!(build(&policy, "svc").affinity.pod_anti_affinity.is_none());
        }
    }

    #[test]
    fn scatter_requests_split_by_required() {
        let policy = PlacementPolicy {
            stateless: true,
            ..Default::default()
        };
        let requests = vec![
            AntiAffinityRequest::required([("app", "es"), ("tier", "data")]),
            AntiAffinityRequest::preferred([("app", "web")]),
        ];
        let cons = K8sBuilder::default()
            .build(&BuildRequest::new(&policy, None).with_anti_affinity(&requests));

        let required = cons.required_anti_affinity();
        assert_eq!(required.len(), 4);
        let topologies: Vec<_> = required.iter().map(|t| t.topology_key.as_str()).collect();
        assert_eq!(
            topologies,
            vec![
                "dice/topology-zone",
                "kubernetes.io/hostname",
                "dice/topology-zone",
                "kubernetes.io/hostname",
            ]
        );
        let first = required[0].label_selector.as_ref().unwrap();
        let expr = &first.match_expressions.as_ref().unwrap()[0];
        assert_eq!(expr.key, "app");
        assert_eq!(expr.operator, "In");
        assert_eq!(expr.values, Some(vec!["es".to_string()]));

        let preferred = cons.preferred_anti_affinity();
        assert_eq!(preferred.len(), 2);
        assert!(preferred.iter().all(|t| t.weight == 100));
        for term in preferred {
            let selector = term.pod_affinity_term.label_selector.as_ref().unwrap();
            let expr = &selector.match_expressions.as_ref().unwrap()[0];
            assert_eq!(expr.values, Some(vec!["web".to_string()]));
        }
    }

    #[test]
    fn custom_label_prefix() {
        let labels = LabelConfig {
            k8s_label_prefix: "acme.io/".to_string(),
            ..LabelConfig::default()
        };
        let policy = PlacementPolicy {
            stateless: true,
            ..Default::default()
        };
        let cons = K8sBuilder::new(labels).build(&BuildRequest::new(&policy, None));
        assert_eq!(
            keys(&cons.required_terms()[0]),
            vec![
                exists("acme.io/locked"),
                absent("acme.io/location"),
                exists("acme.io/stateless-service"),
            ]
        );
    }
}
