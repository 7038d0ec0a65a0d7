//! NGSI-LD entity model
//!
//! Entities are open attribute bags: any key that is not `id`, `type`
//! or `@context` is an attribute. Recognized attributes are Properties
//! or Relationships; anything else is preserved verbatim so that
//! unknown attributes survive a read-modify-write cycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marker for the `"type": "Property"` tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyTag {
    #[default]
    Property,
}

/// Marker for the `"type": "Relationship"` tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipTag {
    #[default]
    Relationship,
}

/// NGSI-LD Property attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    tag: PropertyTag,
    pub value: Value,
    #[serde(rename = "unitCode", skip_serializing_if = "Option::is_none")]
    pub unit_code: Option<String>,
    #[serde(rename = "observedAt", skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<String>,
    /// Sub-attributes and vendor extensions, preserved as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Property {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            tag: PropertyTag::Property,
            value: value.into(),
            unit_code: None,
            observed_at: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_unit(mut self, unit_code: impl Into<String>) -> Self {
        self.unit_code = Some(unit_code.into());
        self
    }

    pub fn with_observed_at(mut self, observed_at: impl Into<String>) -> Self {
        self.observed_at = Some(observed_at.into());
        self
    }
}

/// NGSI-LD Relationship attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    tag: RelationshipTag,
    /// URI of the target entity
    pub object: String,
    #[serde(rename = "observedAt", skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Relationship {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            tag: RelationshipTag::Relationship,
            object: object.into(),
            observed_at: None,
            extra: BTreeMap::new(),
        }
    }
}

/// A single entity attribute.
///
/// Deserialization tries Property, then Relationship (the `type` tag
/// disambiguates); anything non-conforming lands in `Raw` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attribute {
    Property(Property),
    Relationship(Relationship),
    Raw(Value),
}

impl Attribute {
    pub fn as_property(&self) -> Option<&Property> {
        match self {
            Attribute::Property(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Attribute::Relationship(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Property> for Attribute {
    fn from(p: Property) -> Self {
        Attribute::Property(p)
    }
}

impl From<Relationship> for Attribute {
    fn from(r: Relationship) -> Self {
        Attribute::Relationship(r)
    }
}

/// NGSI-LD entity with an open attribute bag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(rename = "@context", skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(flatten)]
    pub attrs: BTreeMap<String, Attribute>,
}

impl Entity {
    pub fn new(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            context: None,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn is_type(&self, entity_type: &str) -> bool {
        self.entity_type == entity_type
    }

    /// Local part of the entity URN (text after the last `:`)
    pub fn local_id(&self) -> &str {
        self.id.rsplit(':').next().unwrap_or(&self.id)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.attrs.get(name).and_then(Attribute::as_property)
    }

    pub fn property_value(&self, name: &str) -> Option<&Value> {
        self.property(name).map(|p| &p.value)
    }

    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.property_value(name).and_then(Value::as_str)
    }

    pub fn property_f64(&self, name: &str) -> Option<f64> {
        self.property_value(name).and_then(Value::as_f64)
    }

    /// Target URI of a relationship attribute
    pub fn relationship(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(name)
            .and_then(Attribute::as_relationship)
            .map(|r| r.object.as_str())
    }

    pub fn set_property(&mut self, name: impl Into<String>, property: Property) -> &mut Self {
        self.attrs.insert(name.into(), property.into());
        self
    }

    pub fn set_relationship(
        &mut self,
        name: impl Into<String>,
        relationship: Relationship,
    ) -> &mut Self {
        self.attrs.insert(name.into(), relationship.into());
        self
    }

    /// Attribute map for a PATCH request: every attribute, without
    /// `id` / `type` / `@context`.
    pub fn attrs_for_update(&self) -> Value {
        serde_json::to_value(&self.attrs).unwrap_or(Value::Null)
    }
}
