//! NGSI-LD data model: entities, attribute union, URN helpers and the
//! typed entity builders used by the resolution pipeline and the
//! inventory worker.

mod builders;
mod entity;

pub use builders::{InventoryItem, Project, Reservation, ReservationLine, Shortage, ShortageLine};
pub use entity::{Attribute, Entity, Property, Relationship};

use serde_json::{Value, json};

/// NGSI-LD core context, always first in `@context`
pub const CORE_CONTEXT: &str = "https://uri.etsi.org/ngsi-ld/v1/ngsi-ld-core-context.jsonld";

/// Default `@context` value for entities produced by this system
pub fn default_context() -> Value {
    json!([CORE_CONTEXT])
}

const URN_PREFIX: &str = "urn:ngsi-ld:";

/// Build a typed URN, passing through inputs that are already URNs.
///
/// These are pure functions of (kind, local id): recomputing always
/// yields the same identifier, which is what makes reprocessing
/// overwrite instead of duplicate.
pub fn urn(kind: &str, local_id: &str) -> String {
    if local_id.starts_with(URN_PREFIX) {
        local_id.to_string()
    } else {
        format!("{URN_PREFIX}{kind}:{local_id}")
    }
}

pub fn project_urn(project_id: &str) -> String {
    urn("Project", project_id)
}

pub fn reservation_urn(project_id: &str) -> String {
    urn("Reservation", local_part(project_id))
}

pub fn shortage_urn(project_id: &str) -> String {
    urn("Shortage", local_part(project_id))
}

pub fn inventory_item_urn(sku: &str) -> String {
    urn("InventoryItem", sku)
}

pub fn subscription_urn(name: &str) -> String {
    urn("Subscription", name)
}

/// Local part of a URN (text after the last `:`)
pub fn local_part(id: &str) -> &str {
    id.rsplit(':').next().unwrap_or(id)
}

/// Project lifecycle status as carried in the `status` property.
///
/// The enum is open: statuses this system does not act on are kept
/// verbatim so they can be logged and passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectStatus {
    Planning,
    Requested,
    Processing,
    Shortage,
    Other(String),
}

impl ProjectStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "planning" => Self::Planning,
            "requested" => Self::Requested,
            "processing" => Self::Processing,
            "shortage" => Self::Shortage,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Planning => "planning",
            Self::Requested => "requested",
            Self::Processing => "processing",
            Self::Shortage => "shortage",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urns_are_deterministic() {
        assert_eq!(project_urn("P-001"), "urn:ngsi-ld:Project:P-001");
        assert_eq!(project_urn("urn:ngsi-ld:Project:P-001"), "urn:ngsi-ld:Project:P-001");
        assert_eq!(reservation_urn("P-001"), reservation_urn("urn:ngsi-ld:Project:P-001"));
        assert_eq!(shortage_urn("P-001"), "urn:ngsi-ld:Shortage:P-001");
        assert_eq!(inventory_item_urn("LED-STRIP-24V-1M"), "urn:ngsi-ld:InventoryItem:LED-STRIP-24V-1M");
    }

    #[test]
    fn test_project_status_is_open() {
        assert_eq!(ProjectStatus::parse("requested"), ProjectStatus::Requested);
        assert_eq!(ProjectStatus::parse("archived"), ProjectStatus::Other("archived".into()));
        assert_eq!(ProjectStatus::parse("archived").as_str(), "archived");
    }
}
