use crate::model::{CollectionKind, DataType, Entity, Property};
use serde::{Deserialize, Serialize};

/// Resolved structural description of a domain type as seen by one caller.
/// Immutable once resolved; shared through the metadata cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetadata {
    pub ceiling_type: String,
    /// Transitive subtypes of the ceiling type, empty when not polymorphic
    pub subtypes: Vec<String>,
    /// Properties of the ceiling type, its ancestors and its subtypes
    pub properties: Vec<PropertyMetadata>,
    /// Declared collections, including those of owned sub-objects under
    /// their owner's dotted path
    pub collections: Vec<CollectionMetadata>,
    pub owned_references: Vec<OwnedReferenceMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMetadata {
    pub name: String,
    pub data_type: DataType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_type: Option<String>,
    pub multi_valued: bool,
    pub declaring_type: String,
    /// Concrete types in this metadata that carry the property
    pub applies_to: Vec<String>,
}

impl PropertyMetadata {
    pub fn bind(&self, value: crate::model::PropertyValue) -> Property {
        Property {
            name: self.name.clone(),
            value,
            meta: crate::model::PropertyMeta {
                data_type: self.data_type,
                foreign_type: self.foreign_type.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    /// Property path, e.g. `attributes` or `defaultSku.skuMedia`
    pub name: String,
    /// Path of the owned sub-object holding the collection, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_path: Option<String>,
    /// Type that declares the collection (the parent items point back to)
    pub owner_type: String,
    pub target_type: String,
    /// `target_type` followed by its subtypes
    pub item_types: Vec<String>,
    pub foreign_key: String,
    pub kind: CollectionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cascade_delete: Option<bool>,
    pub applies_to: Vec<String>,
}

impl CollectionMetadata {
    pub fn key_property(&self) -> Option<&str> {
        match &self.kind {
            CollectionKind::Map { key_property } => Some(key_property),
            CollectionKind::List => None,
        }
    }

    pub fn accepts(&self, entity_type: &str) -> bool {
        self.item_types.iter().any(|t| t == entity_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedReferenceMetadata {
    /// Dotted path from the top-level entity, e.g. `defaultSku`
    pub path: String,
    pub target_type: String,
    /// Property of the top-level entity holding the owned object's id
    pub id_property: String,
    /// Property, collection and reference names of the owned type
    pub members: Vec<String>,
}

impl ClassMetadata {
    /// The ceiling type followed by its subtypes
    pub fn accepted_types(&self) -> Vec<String> {
        std::iter::once(self.ceiling_type.clone())
            .chain(self.subtypes.iter().cloned())
            .collect()
    }

    pub fn is_polymorphic(&self) -> bool {
        !self.subtypes.is_empty()
    }

    pub fn accepts(&self, entity_type: &str) -> bool {
        self.ceiling_type == entity_type || self.subtypes.iter().any(|t| t == entity_type)
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn find_collection(&self, name: &str) -> Option<&CollectionMetadata> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Properties carried by the given concrete type
    pub fn properties_for<'a>(&'a self, entity_type: &'a str) -> impl Iterator<Item = &'a PropertyMetadata> + 'a {
        self.properties
            .iter()
            .filter(move |p| p.applies_to.iter().any(|t| t == entity_type))
    }

    /// Collections directly owned by the given concrete type
    pub fn own_collections_for<'a>(
        &'a self,
        entity_type: &'a str,
    ) -> impl Iterator<Item = &'a CollectionMetadata> + 'a {
        self.collections.iter().filter(move |c| {
            c.owner_path.is_none() && c.applies_to.iter().any(|t| t == entity_type)
        })
    }

    /// Strip properties this metadata does not expose
    pub fn project(&self, mut entity: Entity) -> Entity {
        entity
            .properties
            .retain(|p| self.find_property(&p.name).is_some());
        entity
    }
}
