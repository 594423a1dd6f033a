use crate::model::DataType;
use anyhow::{bail, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Declared structure of one domain type. A registry of these is the
/// capability table every admin operation is driven by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Type identifier, also used as the polymorphic tag on entities
    pub name: String,

    /// Parent type in the polymorphic hierarchy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub properties: Vec<PropertyDef>,

    #[serde(default)]
    pub collections: Vec<CollectionDef>,

    #[serde(default)]
    pub owned_references: Vec<OwnedReferenceDef>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends: None,
            description: None,
            properties: Vec::new(),
            collections: Vec::new(),
            owned_references: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn collection(mut self, collection: CollectionDef) -> Self {
        self.collections.push(collection);
        self
    }

    pub fn owns(mut self, reference: OwnedReferenceDef) -> Self {
        self.owned_references.push(reference);
        self
    }

    pub fn get_property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn get_collection(&self, name: &str) -> Option<&CollectionDef> {
        self.collections.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Default value applied on add when a form omits the property
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Referenced type when this property holds another entity's identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_type: Option<String>,
    /// Role a caller must hold for the property to appear in resolved metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_to: Option<String>,
    #[serde(default)]
    pub multi_valued: bool,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            required: None,
            value: None,
            foreign_type: None,
            visible_to: None,
            multi_valued: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = Some(true);
        self
    }

    pub fn default_value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn references(mut self, type_name: impl Into<String>) -> Self {
        self.data_type = DataType::Id;
        self.foreign_type = Some(type_name.into());
        self
    }

    pub fn visible_to(mut self, role: impl Into<String>) -> Self {
        self.visible_to = Some(role.into());
        self
    }

    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CollectionKind {
    List,
    /// Items are addressed by the value of `key_property`
    Map { key_property: String },
}

/// A sub-collection owned by a type. Items are entities of `target_type`
/// (or one of its subtypes) whose `foreign_key` property holds the owner's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDef {
    pub name: String,
    pub target_type: String,
    pub foreign_key: String,
    pub kind: CollectionKind,
    /// Per-relationship removal policy; `None` defers to configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cascade_delete: Option<bool>,
}

impl CollectionDef {
    pub fn list(
        name: impl Into<String>,
        target_type: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
            foreign_key: foreign_key.into(),
            kind: CollectionKind::List,
            cascade_delete: None,
        }
    }

    pub fn map(
        name: impl Into<String>,
        target_type: impl Into<String>,
        foreign_key: impl Into<String>,
        key_property: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
            foreign_key: foreign_key.into(),
            kind: CollectionKind::Map {
                key_property: key_property.into(),
            },
            cascade_delete: None,
        }
    }

    pub fn cascade(mut self, cascade: bool) -> Self {
        self.cascade_delete = Some(cascade);
        self
    }
}

/// A single sub-object internally owned by its container, e.g. a product's
/// default sku. The owned object's id is held in the owner's property `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedReferenceDef {
    pub name: String,
    pub target_type: String,
}

impl OwnedReferenceDef {
    pub fn new(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
        }
    }
}

/// Immutable mapping from type identifier to its descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeRegistry {
    types: Vec<TypeDescriptor>,
}

impl TypeRegistry {
    /// Build a registry, rejecting descriptors that break the structural rules:
    /// unique names, known parents/targets, and collections whose foreign key
    /// exists on the item type so children can be traced back to their parent.
    pub fn new(types: Vec<TypeDescriptor>) -> Result<Self> {
        let registry = Self { types };
        registry.check()?;
        Ok(registry)
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn types(&self) -> &[TypeDescriptor] {
        &self.types
    }

    /// Ancestors of `name`, root first, excluding `name` itself
    pub fn ancestors_of(&self, name: &str) -> Vec<&TypeDescriptor> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(name.to_string());

        let mut current = self.get_type(name).and_then(|t| t.extends.as_deref());
        while let Some(parent) = current {
            if !seen.insert(parent.to_string()) {
                break;
            }
            match self.get_type(parent) {
                Some(descriptor) => {
                    chain.push(descriptor);
                    current = descriptor.extends.as_deref();
                }
                None => break,
            }
        }

        chain.reverse();
        chain
    }

    /// `name` followed by every transitive subtype, breadth first
    pub fn polymorphic_types_of(&self, name: &str) -> Vec<String> {
        let mut ordered = Vec::new();
        let mut queue = VecDeque::from([name.to_string()]);
        let mut seen = HashSet::new();

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            for child in self
                .types
                .iter()
                .filter(|t| t.extends.as_deref() == Some(current.as_str()))
            {
                queue.push_back(child.name.clone());
            }
            ordered.push(current);
        }

        ordered
    }

    /// Whether `candidate` is `base` or inherits from it
    pub fn is_assignable(&self, candidate: &str, base: &str) -> bool {
        candidate == base || self.ancestors_of(candidate).iter().any(|a| a.name == base)
    }

    /// Properties of `name` including inherited ones, root first
    pub fn all_properties_of(&self, name: &str) -> Vec<&PropertyDef> {
        let mut chain = self.ancestors_of(name);
        if let Some(own) = self.get_type(name) {
            chain.push(own);
        }
        let mut by_name: Vec<&PropertyDef> = Vec::new();
        for descriptor in chain {
            for prop in &descriptor.properties {
                match by_name.iter().position(|p| p.name == prop.name) {
                    Some(idx) => by_name[idx] = prop,
                    None => by_name.push(prop),
                }
            }
        }
        by_name
    }

    /// Topmost ancestor of `name`, or `name` itself
    fn root_of<'a>(&'a self, name: &'a str) -> &'a str {
        self.ancestors_of(name)
            .first()
            .copied()
            .map(|t| t.name.as_str())
            .unwrap_or(name)
    }

    /// Whether `a` and `b` sit in different branches under a common root
    fn are_siblings(&self, a: &str, b: &str) -> bool {
        !self.is_assignable(a, b) && !self.is_assignable(b, a) && self.root_of(a) == self.root_of(b)
    }

    fn has_cyclic_hierarchy(&self, name: &str) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(name);
        while let Some(type_name) = current {
            if !seen.insert(type_name) {
                return true;
            }
            current = self.get_type(type_name).and_then(|t| t.extends.as_deref());
        }
        false
    }

    fn check(&self) -> Result<()> {
        let mut names = HashSet::new();
        for descriptor in &self.types {
            if !names.insert(descriptor.name.as_str()) {
                bail!("Type '{}' is declared more than once", descriptor.name);
            }
        }

        for descriptor in &self.types {
            if let Some(parent) = &descriptor.extends {
                if !names.contains(parent.as_str()) {
                    bail!("Type '{}' extends unknown type '{}'", descriptor.name, parent);
                }
                if self.has_cyclic_hierarchy(&descriptor.name) {
                    bail!("Type '{}' has a cyclic hierarchy", descriptor.name);
                }
            }

            let mut member_names: HashMap<&str, &str> = HashMap::new();
            for prop in &descriptor.properties {
                if member_names.insert(&prop.name, "property").is_some() {
                    bail!("Property '{}' is declared twice on '{}'", prop.name, descriptor.name);
                }
            }
            for collection in &descriptor.collections {
                if let Some(existing) = member_names.insert(&collection.name, "collection") {
                    bail!(
                        "Collection '{}' on '{}' clashes with a {} of the same name",
                        collection.name,
                        descriptor.name,
                        existing
                    );
                }
                if !names.contains(collection.target_type.as_str()) {
                    bail!(
                        "Collection '{}.{}' targets unknown type '{}'",
                        descriptor.name,
                        collection.name,
                        collection.target_type
                    );
                }
                let item_props = self.all_properties_of(&collection.target_type);
                if !item_props.iter().any(|p| p.name == collection.foreign_key) {
                    bail!(
                        "Collection '{}.{}' uses foreign key '{}' which '{}' does not declare",
                        descriptor.name,
                        collection.name,
                        collection.foreign_key,
                        collection.target_type
                    );
                }
                if let CollectionKind::Map { key_property } = &collection.kind {
                    if !item_props.iter().any(|p| &p.name == key_property) {
                        bail!(
                            "Map collection '{}.{}' uses key '{}' which '{}' does not declare",
                            descriptor.name,
                            collection.name,
                            key_property,
                            collection.target_type
                        );
                    }
                }
            }
            for reference in &descriptor.owned_references {
                if !names.contains(reference.target_type.as_str()) {
                    bail!(
                        "Owned reference '{}.{}' targets unknown type '{}'",
                        descriptor.name,
                        reference.name,
                        reference.target_type
                    );
                }
                if !self
                    .all_properties_of(&descriptor.name)
                    .iter()
                    .any(|p| p.name == reference.name)
                {
                    bail!(
                        "Owned reference '{}.{}' needs a property of the same name holding its id",
                        descriptor.name,
                        reference.name
                    );
                }
            }
        }

        // sibling declarations are read as one member through the common root
        for (a, b) in self.types.iter().tuple_combinations() {
            if !self.are_siblings(&a.name, &b.name) {
                continue;
            }
            for prop in &a.properties {
                if b.get_property(&prop.name).is_some_and(|other| other != prop) {
                    bail!(
                        "Property '{}' is declared differently on '{}' and '{}'",
                        prop.name,
                        a.name,
                        b.name
                    );
                }
            }
            for collection in &a.collections {
                if b.get_collection(&collection.name).is_some_and(|other| other != collection) {
                    bail!(
                        "Collection '{}' is declared differently on '{}' and '{}'",
                        collection.name,
                        a.name,
                        b.name
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::new(vec![
            TypeDescriptor::new("Product")
                .property(PropertyDef::new("name", DataType::String).required())
                .property(PropertyDef::new("defaultSku", DataType::Id).references("Sku"))
                .owns(OwnedReferenceDef::new("defaultSku", "Sku")),
            TypeDescriptor::new("Bundle")
                .extends("Product")
                .property(PropertyDef::new("discount", DataType::Number)),
            TypeDescriptor::new("Kit").extends("Bundle"),
            TypeDescriptor::new("Sku").property(PropertyDef::new("name", DataType::String)),
        ])
        .unwrap()
    }

    #[test]
    fn test_polymorphic_types_breadth_first() {
        let registry = registry();
        assert_eq!(
            registry.polymorphic_types_of("Product"),
            vec!["Product", "Bundle", "Kit"]
        );
        assert_eq!(registry.polymorphic_types_of("Sku"), vec!["Sku"]);
    }

    #[test]
    fn test_ancestors_and_assignability() {
        let registry = registry();
        let ancestors: Vec<_> = registry.ancestors_of("Kit").iter().map(|t| t.name.clone()).collect();
        assert_eq!(ancestors, vec!["Product", "Bundle"]);
        assert!(registry.is_assignable("Kit", "Product"));
        assert!(!registry.is_assignable("Product", "Kit"));
        assert!(!registry.is_assignable("Sku", "Product"));
    }

    #[test]
    fn test_inherited_properties() {
        let registry = registry();
        let names: Vec<_> = registry
            .all_properties_of("Bundle")
            .iter()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(names, vec!["name", "defaultSku", "discount"]);
    }

    #[test]
    fn test_rejects_collection_without_foreign_key() {
        let result = TypeRegistry::new(vec![
            TypeDescriptor::new("Product")
                .collection(CollectionDef::list("media", "Media", "product")),
            TypeDescriptor::new("Media").property(PropertyDef::new("url", DataType::String)),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_parent_and_duplicates() {
        assert!(TypeRegistry::new(vec![TypeDescriptor::new("A").extends("Missing")]).is_err());
        assert!(TypeRegistry::new(vec![TypeDescriptor::new("A"), TypeDescriptor::new("A")]).is_err());
        assert!(TypeRegistry::new(vec![TypeDescriptor::new("A")
            .property(PropertyDef::new("x", DataType::String))
            .property(PropertyDef::new("x", DataType::Number))])
        .is_err());
    }

    #[test]
    fn test_sibling_declarations_must_agree() {
        let sibling = |name: &str, discount: PropertyDef| {
            TypeDescriptor::new(name).extends("Product").property(discount)
        };
        let agreeing = TypeRegistry::new(vec![
            TypeDescriptor::new("Product"),
            sibling("Bundle", PropertyDef::new("discount", DataType::Number)),
            sibling("Kit", PropertyDef::new("discount", DataType::Number)),
        ]);
        assert!(agreeing.is_ok());

        let conflicting = TypeRegistry::new(vec![
            TypeDescriptor::new("Product"),
            sibling("Bundle", PropertyDef::new("discount", DataType::Number)),
            sibling("Kit", PropertyDef::new("discount", DataType::String)),
        ]);
        assert!(conflicting.is_err());

        // unrelated roots may reuse a name freely
        let unrelated = TypeRegistry::new(vec![
            TypeDescriptor::new("Product").property(PropertyDef::new("code", DataType::Number)),
            TypeDescriptor::new("Sku").property(PropertyDef::new("code", DataType::String)),
        ]);
        assert!(unrelated.is_ok());
    }

    #[test]
    fn test_rejects_cyclic_hierarchy() {
        let result = TypeRegistry::new(vec![
            TypeDescriptor::new("A").extends("B"),
            TypeDescriptor::new("B").extends("A"),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_descriptor_deserializes_from_json() {
        let json = r#"{
            "name": "Product",
            "properties": [{"name": "name", "data_type": "String", "required": true}],
            "collections": [{
                "name": "attributes",
                "target_type": "ProductAttribute",
                "foreign_key": "product",
                "kind": {"kind": "map", "key_property": "name"}
            }]
        }"#;
        let descriptor: TypeDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.properties[0].data_type, DataType::String);
        assert!(descriptor.properties[0].is_required());
        assert_eq!(
            descriptor.collections[0].kind,
            CollectionKind::Map {
                key_property: "name".to_string()
            }
        );
        assert!(descriptor.owned_references.is_empty());
    }
}
