//! Shared types for the ERP / context-broker bridge
//!
//! Wire-level data model used by both the service crate and its tests:
//!
//! - **NGSI-LD entities** (`ngsi`): open attribute-bag entity model,
//!   Property/Relationship union, deterministic URN helpers and the
//!   typed builders for Reservation / Shortage / InventoryItem.
//! - **Notifications** (`notification`): subscription delivery envelope.

pub mod ngsi;
pub mod notification;
pub mod util;

// Re-exports
pub use ngsi::{Attribute, Entity, Property, ProjectStatus, Relationship};
pub use notification::Notification;
