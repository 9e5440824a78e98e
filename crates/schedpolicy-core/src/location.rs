//! Location requirement resolution.

use tracing::debug;

use crate::types::{LocationEntry, PlacementPolicy, ServiceRef};

/// What a service requires of a node's location labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationRequirement<'a> {
    /// The node must carry no location label at all.
    Unassigned,
    /// The node must not be in this location.
    Excluded(&'a str),
    /// The node must be in at least one of these locations. Never empty.
    AnyOf(&'a [String]),
}

impl PlacementPolicy {
    /// Resolve the location requirement for `service`.
    ///
    /// A missing service, a missing or malformed entry, and a selector with
    /// no values all resolve to [`LocationRequirement::Unassigned`]. A negated
    /// selector only ever consults its first value.
    pub fn location_for(&self, service: Option<&ServiceRef>) -> LocationRequirement<'_> {
        let Some(service) = service else {
            return LocationRequirement::Unassigned;
        };
        let selector = match self.location.get(&service.name) {
            Some(LocationEntry::Selector(selector)) => selector,
            Some(LocationEntry::Malformed(value)) => {
                debug!(
                    service = %service.name,
                    entry = %value,
                    "malformed location entry, treating service as unassigned"
                );
                return LocationRequirement::Unassigned;
            }
            None => return LocationRequirement::Unassigned,
        };

        match selector.values.first() {
            None => LocationRequirement::Unassigned,
            Some(first) if selector.not => LocationRequirement::Excluded(first),
            Some(_) => LocationRequirement::AnyOf(&selector.values),
        }
    }
}
