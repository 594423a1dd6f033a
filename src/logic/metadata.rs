use itertools::Itertools;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{AdminError, AdminResult};
use crate::model::{
    ClassMetadata, CollectionMetadata, OwnedReferenceMetadata, PersistencePackageRequest,
    PropertyMetadata, TypeDescriptor, TypeRegistry, UserContext,
};
use crate::security::{SecuredOperation, SecurityGate};
use crate::store::{MetadataCache, PersistenceStore};

/// Resolves `ClassMetadata` for a type from the declared type model and
/// memoizes the result per (type, caller visibility).
pub struct MetadataResolver<S, G> {
    store: Arc<S>,
    security: Arc<G>,
    cache: MetadataCache,
    cache_enabled: bool,
}

impl<S: PersistenceStore, G: SecurityGate> MetadataResolver<S, G> {
    pub fn new(store: Arc<S>, security: Arc<G>, cache_enabled: bool) -> Self {
        Self {
            store,
            security,
            cache: MetadataCache::new(),
            cache_enabled,
        }
    }

    /// Metadata for the request's ceiling type; requires inspect access.
    pub async fn get_class_metadata(
        &self,
        request: &PersistencePackageRequest,
    ) -> AdminResult<Arc<ClassMetadata>> {
        self.security
            .authorize(SecuredOperation::Inspect, &request.ceiling_type, &request.context)
            .await?;
        self.resolve(&request.ceiling_type, &request.context).await
    }

    /// Metadata for a type without an inspect check, for use by the other
    /// components once they have authorized their own operation.
    pub async fn resolve(&self, type_name: &str, ctx: &UserContext) -> AdminResult<Arc<ClassMetadata>> {
        let visibility = ctx.visibility_key();

        if self.cache_enabled {
            if let Some(hit) = self.cache.get(type_name, &visibility) {
                log::debug!("Metadata cache hit for '{}' [{}]", type_name, visibility);
                return Ok(hit);
            }
        }

        let generation = self.cache.generation();
        let types = self.store.list_types().await.map_err(AdminError::from_store)?;
        let registry = TypeRegistry::new(types).map_err(AdminError::Service)?;
        let metadata = build_class_metadata(&registry, type_name, ctx)?;

        if self.cache_enabled {
            log::debug!("Caching metadata for '{}' [{}]", type_name, visibility);
            Ok(self.cache.put(type_name, &visibility, generation, metadata))
        } else {
            Ok(Arc::new(metadata))
        }
    }

    /// Forget cached metadata that depends on `type_name`
    pub fn invalidate_type(&self, type_name: &str) {
        let dropped = self.cache.invalidate_type(type_name);
        log::info!("Invalidated {} metadata entries for '{}'", dropped, type_name);
    }

    pub fn invalidate_all(&self) {
        self.cache.clear();
        log::info!("Invalidated all metadata");
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

/// Derive the structural description of `type_name` as visible to `ctx`.
pub fn build_class_metadata(
    registry: &TypeRegistry,
    type_name: &str,
    ctx: &UserContext,
) -> AdminResult<ClassMetadata> {
    if registry.get_type(type_name).is_none() {
        return Err(AdminError::not_found(format!("type '{}'", type_name)));
    }

    let accepted = registry.polymorphic_types_of(type_name);
    let subtypes = accepted[1..].to_vec();

    // ancestors first so subtypes can override inherited declarations
    let mut chain: Vec<&TypeDescriptor> = registry.ancestors_of(type_name);
    chain.extend(accepted.iter().filter_map(|t| registry.get_type(t)));

    let applies_to = |declaring: &str| -> Vec<String> {
        accepted
            .iter()
            .filter(|t| registry.is_assignable(t, declaring))
            .cloned()
            .collect()
    };

    let mut properties: Vec<PropertyMetadata> = Vec::new();
    for descriptor in &chain {
        for prop in &descriptor.properties {
            if prop.visible_to.as_deref().is_some_and(|role| !ctx.has_role(role)) {
                continue;
            }
            let resolved = PropertyMetadata {
                name: prop.name.clone(),
                data_type: prop.data_type,
                required: prop.is_required(),
                default_value: prop.value.clone(),
                foreign_type: prop.foreign_type.clone(),
                multi_valued: prop.multi_valued,
                declaring_type: descriptor.name.clone(),
                applies_to: applies_to(&descriptor.name),
            };
            match properties.iter().position(|p| p.name == resolved.name) {
                Some(idx) => match redeclaration(&properties[idx].applies_to, &resolved.applies_to) {
                    Redeclaration::Sibling => properties[idx].applies_to.extend(resolved.applies_to),
                    Redeclaration::Wider => properties[idx] = resolved,
                    Redeclaration::Narrower => {}
                },
                None => properties.push(resolved),
            }
        }
    }

    let mut collections: Vec<CollectionMetadata> = Vec::new();
    let mut owned_references: Vec<OwnedReferenceMetadata> = Vec::new();
    for descriptor in &chain {
        let applies = applies_to(&descriptor.name);
        for collection in &descriptor.collections {
            push_unique_collection(
                &mut collections,
                CollectionMetadata {
                    name: collection.name.clone(),
                    owner_path: None,
                    owner_type: descriptor.name.clone(),
                    target_type: collection.target_type.clone(),
                    item_types: registry.polymorphic_types_of(&collection.target_type),
                    foreign_key: collection.foreign_key.clone(),
                    kind: collection.kind.clone(),
                    cascade_delete: collection.cascade_delete,
                    applies_to: applies.clone(),
                },
            );
        }

        let mut visiting = HashSet::from([descriptor.name.clone()]);
        flatten_owned(
            registry,
            descriptor,
            "",
            &applies,
            &mut visiting,
            &mut collections,
            &mut owned_references,
        );
    }

    Ok(ClassMetadata {
        ceiling_type: type_name.to_string(),
        subtypes,
        properties,
        collections,
        owned_references,
    })
}

/// How a member declared again further down the chain relates to the entry
/// already resolved under the same name
enum Redeclaration {
    /// Declared by an unrelated branch; both declarations agree (the
    /// registry rejects conflicting ones), so the entry covers both
    Sibling,
    /// Covers at least as many concrete types and replaces the entry
    Wider,
    /// A subtype redeclaring an inherited member; the inherited one stays
    Narrower,
}

fn redeclaration(existing: &[String], incoming: &[String]) -> Redeclaration {
    if incoming.iter().all(|t| !existing.contains(t)) {
        Redeclaration::Sibling
    } else if incoming.len() >= existing.len() {
        Redeclaration::Wider
    } else {
        Redeclaration::Narrower
    }
}

fn push_unique_collection(collections: &mut Vec<CollectionMetadata>, collection: CollectionMetadata) {
    match collections.iter().position(|c| c.name == collection.name) {
        Some(idx) => match redeclaration(&collections[idx].applies_to, &collection.applies_to) {
            Redeclaration::Sibling => collections[idx].applies_to.extend(collection.applies_to),
            Redeclaration::Wider => collections[idx] = collection,
            Redeclaration::Narrower => {}
        },
        None => collections.push(collection),
    }
}

/// Register the owned references of `owner` under `prefix`, together with
/// the collections and nested references their targets declare.
fn flatten_owned(
    registry: &TypeRegistry,
    owner: &TypeDescriptor,
    prefix: &str,
    applies: &[String],
    visiting: &mut HashSet<String>,
    collections: &mut Vec<CollectionMetadata>,
    owned_references: &mut Vec<OwnedReferenceMetadata>,
) {
    for reference in &owner.owned_references {
        let path = format!("{}{}", prefix, reference.name);
        let Some(target) = registry.get_type(&reference.target_type) else {
            continue;
        };
        if !visiting.insert(target.name.clone()) {
            log::warn!("Skipping cyclic owned reference '{}' on '{}'", path, owner.name);
            continue;
        }

        let mut target_chain = registry.ancestors_of(&target.name);
        target_chain.push(target);

        let members: Vec<String> = target_chain
            .iter()
            .flat_map(|d| {
                d.properties
                    .iter()
                    .map(|p| p.name.clone())
                    .chain(d.collections.iter().map(|c| c.name.clone()))
                    .chain(d.owned_references.iter().map(|o| o.name.clone()))
            })
            .unique()
            .collect();

        if !owned_references.iter().any(|o| o.path == path) {
            owned_references.push(OwnedReferenceMetadata {
                path: path.clone(),
                target_type: target.name.clone(),
                id_property: path.clone(),
                members,
            });
        }

        let nested_prefix = format!("{}.", path);
        for descriptor in &target_chain {
            for collection in &descriptor.collections {
                push_unique_collection(
                    collections,
                    CollectionMetadata {
                        name: format!("{}{}", nested_prefix, collection.name),
                        owner_path: Some(path.clone()),
                        owner_type: descriptor.name.clone(),
                        target_type: collection.target_type.clone(),
                        item_types: registry.polymorphic_types_of(&collection.target_type),
                        foreign_key: collection.foreign_key.clone(),
                        kind: collection.kind.clone(),
                        cascade_delete: collection.cascade_delete,
                        applies_to: applies.to_vec(),
                    },
                );
            }
            flatten_owned(
                registry,
                descriptor,
                &nested_prefix,
                applies,
                visiting,
                collections,
                owned_references,
            );
        }

        visiting.remove(&target.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::catalog_registry;

    fn admin() -> UserContext {
        UserContext::with_roles("admin", ["ROLE_ADMIN"])
    }

    #[test]
    fn test_polymorphic_metadata() {
        let registry = catalog_registry().unwrap();
        let metadata = build_class_metadata(&registry, "Product", &admin()).unwrap();

        assert_eq!(metadata.subtypes, vec!["Bundle"]);
        assert!(metadata.is_polymorphic());

        let discount = metadata.find_property("discount").unwrap();
        assert_eq!(discount.declaring_type, "Bundle");
        assert_eq!(discount.applies_to, vec!["Bundle"]);
        let name = metadata.find_property("name").unwrap();
        assert_eq!(name.applies_to, vec!["Product", "Bundle"]);

        let sku = build_class_metadata(&registry, "Sku", &admin()).unwrap();
        assert!(sku.subtypes.is_empty());
    }

    #[test]
    fn test_sibling_subtypes_share_a_declaration() {
        let mut types = crate::seed::catalog_types();
        types.push(
            TypeDescriptor::new("Kit")
                .extends("Product")
                .property(crate::model::PropertyDef::new("discount", crate::model::DataType::Number)),
        );
        let registry = TypeRegistry::new(types).unwrap();
        let metadata = build_class_metadata(&registry, "Product", &admin()).unwrap();

        assert_eq!(metadata.subtypes, vec!["Bundle", "Kit"]);
        let discount: Vec<_> = metadata.properties.iter().filter(|p| p.name == "discount").collect();
        assert_eq!(discount.len(), 1);
        assert_eq!(discount[0].applies_to, vec!["Bundle", "Kit"]);
        assert_eq!(metadata.properties_for("Bundle").filter(|p| p.name == "discount").count(), 1);
        assert_eq!(metadata.properties_for("Kit").filter(|p| p.name == "discount").count(), 1);
        assert!(metadata.properties_for("Product").all(|p| p.name != "discount"));
    }

    #[test]
    fn test_property_names_are_unique() {
        let registry = catalog_registry().unwrap();
        let metadata = build_class_metadata(&registry, "Product", &admin()).unwrap();
        let mut names: Vec<_> = metadata.properties.iter().map(|p| p.name.clone()).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_owned_collections_are_flattened() {
        let registry = catalog_registry().unwrap();
        let metadata = build_class_metadata(&registry, "Product", &admin()).unwrap();

        let sku_media = metadata.find_collection("defaultSku.skuMedia").unwrap();
        assert_eq!(sku_media.owner_path.as_deref(), Some("defaultSku"));
        assert_eq!(sku_media.owner_type, "Sku");
        assert_eq!(sku_media.foreign_key, "sku");

        let owned = &metadata.owned_references[0];
        assert_eq!(owned.path, "defaultSku");
        assert_eq!(owned.id_property, "defaultSku");
        assert!(owned.members.contains(&"skuMedia".to_string()));

        let attributes = metadata.find_collection("attributes").unwrap();
        assert_eq!(attributes.key_property(), Some("name"));
        assert!(attributes.owner_path.is_none());
    }

    #[test]
    fn test_hidden_properties_depend_on_roles() {
        let registry = catalog_registry().unwrap();
        let admin_view = build_class_metadata(&registry, "Product", &admin()).unwrap();
        let guest_view = build_class_metadata(&registry, "Product", &UserContext::new("guest")).unwrap();

        assert!(admin_view.find_property("cost").is_some());
        assert!(guest_view.find_property("cost").is_none());
    }

    #[test]
    fn test_unknown_type_is_not_found() {
        let err = build_class_metadata(&catalog_registry().unwrap(), "Unicorn", &admin()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }
}
