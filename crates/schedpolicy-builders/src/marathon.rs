//! Marathon attribute constraint builder.
//!
//! Marathon ANDs every clause of an app, so each concern contributes one
//! independent clause, always in the same order:
//!
//! 1. specific host
//! 2. platform
//! 3. unlocked
//! 4. location
//! 5. org
//! 6. workspace
//! 7. workload category (job, stateful, stateless or bigdata)
//! 8. project
//!
//! Absent scope (no org, no workspace, no project, no location) is expressed
//! as `UNLIKE <prefix>[^,]+`: the agent must carry no tag of that family.
//! Pack jobs and daemonsets have no Marathon category.

use serde::{Deserialize, Serialize};
use tracing::debug;

use schedpolicy_core::{LabelConfig, LocationRequirement, PlacementPolicy, WorkloadShape};

use crate::term::{AttributeConstraint, Operator, TermGroup};
use crate::{Backend, BuildRequest, ConstraintBuilder, Constraints};

/// Generic tag that satisfies any `Prefer*` category clause.
const ANY_TAG: &str = "any";

/// Ordered Marathon `constraints` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarathonConstraints {
    pub clauses: Vec<AttributeConstraint>,
}

impl MarathonConstraints {
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttributeConstraint> {
        self.clauses.iter()
    }
}

impl<'a> IntoIterator for &'a MarathonConstraints {
    type Item = &'a AttributeConstraint;
    type IntoIter = std::slice::Iter<'a, AttributeConstraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.clauses.iter()
    }
}

impl Constraints for MarathonConstraints {
    fn backend(&self) -> Backend {
        Backend::Marathon
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Builds [`MarathonConstraints`] from a placement policy.
#[derive(Debug, Clone, Default)]
pub struct MarathonBuilder {
    labels: LabelConfig,
}

impl MarathonBuilder {
    pub fn new(labels: LabelConfig) -> Self {
        Self { labels }
    }

    fn push(&self, clauses: &mut Vec<AttributeConstraint>, operator: Operator, group: TermGroup) {
        match AttributeConstraint::group(&self.labels.marathon_attribute, operator, &group) {
            Some(clause) => clauses.push(clause),
            None => debug!(%operator, "empty tag group, clause omitted"),
        }
    }

    fn location(&self, requirement: LocationRequirement<'_>) -> (Operator, TermGroup) {
        match requirement {
            LocationRequirement::Unassigned => (Operator::Unlike, TermGroup::prefix("location-")),
            LocationRequirement::Excluded(value) => {
                (Operator::Unlike, TermGroup::tag(format!("location-{value}")))
            }
            LocationRequirement::AnyOf(values) => (
                Operator::Like,
                TermGroup::any_of(values.iter().map(|v| format!("location-{v}"))),
            ),
        }
    }

    /// Category clause for the classified shape, if Marathon models it.
    fn category(policy: &PlacementPolicy, shape: WorkloadShape) -> Option<TermGroup> {
        let prefer = match shape {
            WorkloadShape::Job => policy.prefer_job,
            WorkloadShape::StatefulService => policy.prefer_stateful,
            WorkloadShape::StatelessService => policy.prefer_stateless,
            WorkloadShape::BigDataJob => false,
            WorkloadShape::PackJob | WorkloadShape::Platform | WorkloadShape::Daemonset => {
                return None;
            }
        };
        let group = TermGroup::tag(shape.label());
        Some(if prefer { group.or(ANY_TAG) } else { group })
    }
}

impl ConstraintBuilder for MarathonBuilder {
    type Output = MarathonConstraints;

    fn build(&self, request: &BuildRequest<'_>) -> MarathonConstraints {
        let policy = request.policy;
        let shape = WorkloadShape::classify(policy);
        let mut clauses = Vec::new();

        if let Some(host) = policy.specific_host.first().filter(|h| !h.is_empty()) {
            clauses.push(AttributeConstraint::new(
                self.labels.marathon_hostname_attribute.as_str(),
                Operator::Like,
                host.as_str(),
            ));
        }

        self.push(
            &mut clauses,
            Operator::when(policy.is_platform),
            TermGroup::tag("platform"),
        );

        self.push(
            &mut clauses,
            Operator::when(!policy.is_unlocked),
            TermGroup::tag("locked"),
        );

        let (operator, group) = self.location(policy.location_for(request.service));
        self.push(&mut clauses, operator, group);

        if policy.has_org {
            self.push(
                &mut clauses,
                Operator::Like,
                TermGroup::tag(format!("org-{}", policy.org)),
            );
        } else {
            self.push(&mut clauses, Operator::Unlike, TermGroup::prefix("org-"));
        }

        if policy.has_workspace {
            self.push(
                &mut clauses,
                Operator::Like,
                TermGroup::any_of(policy.workspaces.iter().map(|ws| format!("workspace-{ws}"))),
            );
        } else {
            self.push(&mut clauses, Operator::Unlike, TermGroup::prefix("workspace-"));
        }

        if let Some(group) = shape.and_then(|shape| Self::category(policy, shape)) {
            self.push(&mut clauses, Operator::Like, group);
        }

        if policy.has_project {
            self.push(
                &mut clauses,
                Operator::Like,
                TermGroup::tag(format!("project-{}", policy.project)),
            );
        } else {
            self.push(&mut clauses, Operator::Unlike, TermGroup::prefix("project-"));
        }

        debug!(shape = ?shape, clauses = clauses.len(), "built marathon constraints");

        MarathonConstraints { clauses }
    }
}
