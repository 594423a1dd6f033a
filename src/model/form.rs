use crate::model::{Entity, Id, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Caller-supplied, editable representation of an entity used as input to
/// add and update operations. Unlike `Entity` it may carry field errors raised
/// by the form layer before it ever reaches the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    /// Concrete type being submitted, one of the ceiling type's polymorphic types
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Type the form was built for; defaults to `entity_type`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceiling_type: Option<String>,

    /// Submitted values in field order
    #[serde(default)]
    pub fields: Vec<FormField>,

    /// Version the entity was read at; checked on update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,

    /// Key of a map-collection entry before the caller edited it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_key: Option<String>,

    /// Field-level errors already detected by the form layer
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub value: PropertyValue,
}

impl EntityForm {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            id: None,
            entity_type: entity_type.into(),
            ceiling_type: None,
            fields: Vec::new(),
            version: None,
            prior_key: None,
            errors: BTreeMap::new(),
        }
    }

    /// Build an edit form from a persisted entity
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            id: Some(entity.id.clone()),
            entity_type: entity.entity_type.clone(),
            ceiling_type: None,
            fields: entity
                .properties
                .iter()
                .map(|p| FormField {
                    name: p.name.clone(),
                    value: p.value.clone(),
                })
                .collect(),
            version: Some(entity.version),
            prior_key: None,
            errors: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<Id>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_ceiling_type(mut self, ceiling_type: impl Into<String>) -> Self {
        self.ceiling_type = Some(ceiling_type.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.set_field(name, PropertyValue::Single(value));
        self
    }

    pub fn with_values(mut self, name: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        self.set_field(name, PropertyValue::Multiple(values));
        self
    }

    pub fn with_prior_key(mut self, prior_key: impl Into<String>) -> Self {
        self.prior_key = Some(prior_key.into());
        self
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: PropertyValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(FormField { name, value }),
        }
    }

    pub fn field(&self, name: &str) -> Option<&PropertyValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_default().push(message.into());
    }

    pub fn ceiling_type(&self) -> &str {
        self.ceiling_type.as_deref().unwrap_or(&self.entity_type)
    }

    /// Non-empty prior key, if the caller supplied one
    pub fn prior_key(&self) -> Option<&str> {
        self.prior_key.as_deref().filter(|k| !k.is_empty())
    }
}
