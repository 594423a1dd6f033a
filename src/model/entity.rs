use crate::model::{DataType, Id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generic record of any domain type. The `entity_type` tag carries the
/// concrete (possibly polymorphic) type the record was persisted as.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: Id,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub properties: Vec<Property>,

    /// Optimistic concurrency version, bumped by every update
    #[serde(default)]
    pub version: u64,

    /// Previous key of a map-collection entry that has been re-keyed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_key: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    pub fn new(id: impl Into<Id>, entity_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            properties: Vec::new(),
            version: 0,
            prior_key: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.set_property(property);
        self
    }

    pub fn find_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Single value of a property, or the first value of a multi-valued one
    pub fn value_of(&self, name: &str) -> Option<&serde_json::Value> {
        self.find_property(name).and_then(|p| p.value.first())
    }

    /// Insert or replace a property, keeping names unique and the original
    /// position of a replaced property.
    pub fn set_property(&mut self, property: Property) {
        match self.properties.iter_mut().find(|p| p.name == property.name) {
            Some(existing) => *existing = property,
            None => self.properties.push(property),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
    #[serde(flatten)]
    pub meta: PropertyMeta,
}

impl Property {
    pub fn new(name: impl Into<String>, value: serde_json::Value, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            value: PropertyValue::Single(value),
            meta: PropertyMeta {
                data_type,
                foreign_type: None,
            },
        }
    }

    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, serde_json::Value::String(value.into()), DataType::String)
    }

    pub fn reference(
        name: impl Into<String>,
        id: impl Into<String>,
        foreign_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: PropertyValue::Single(serde_json::Value::String(id.into())),
            meta: PropertyMeta {
                data_type: DataType::Id,
                foreign_type: Some(foreign_type.into()),
            },
        }
    }

    pub fn is_foreign_key(&self) -> bool {
        self.meta.foreign_type.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Multiple(Vec<serde_json::Value>),
    Single(serde_json::Value),
}

impl PropertyValue {
    pub fn first(&self) -> Option<&serde_json::Value> {
        match self {
            PropertyValue::Single(value) => Some(value),
            PropertyValue::Multiple(values) => values.first(),
        }
    }

    /// Every value held, one for single-valued properties
    pub fn values(&self) -> Vec<&serde_json::Value> {
        match self {
            PropertyValue::Single(value) => vec![value],
            PropertyValue::Multiple(values) => values.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMeta {
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_property_keeps_names_unique() {
        let mut entity = Entity::new("p1", "Product")
            .with_property(Property::string("name", "Chair"))
            .with_property(Property::string("status", "ACTIVE"));

        entity.set_property(Property::string("name", "Table"));

        assert_eq!(entity.properties.len(), 2);
        assert_eq!(entity.properties[0].name, "name");
        assert_eq!(entity.value_of("name"), Some(&json!("Table")));
    }

    #[test]
    fn test_property_value_serde_shapes() {
        let single: PropertyValue = serde_json::from_value(json!("x")).unwrap();
        assert_eq!(single, PropertyValue::Single(json!("x")));

        let multi: PropertyValue = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(multi.values().len(), 2);
        assert_eq!(multi.first(), Some(&json!("a")));
    }

    #[test]
    fn test_reference_property_is_foreign_key() {
        let prop = Property::reference("defaultSku", "sku-1", "Sku");
        assert!(prop.is_foreign_key());
        assert!(!Property::string("name", "x").is_foreign_key());
    }
}
