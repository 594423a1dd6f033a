use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;

use crate::error::{AdminError, AdminResult};
use crate::logic::{
    check_criteria_fields, CascadePlanner, ContextualIdResolver, FormValidator, MetadataResolver,
    ValidationErrorType, ValidationResult,
};
use crate::model::{
    ClassMetadata, CollectionItemKey, CollectionMetadata, Entity, EntityForm, FilterAndSortCriteria,
    Id, PersistencePackageRequest, PropertyValue, UserContext,
};
use crate::security::{SecuredOperation, SecurityGate};
use crate::store::{PersistenceStore, RecordQuery};

/// Reads and mutates the items of collections declared on a containing
/// entity, addressing each collection through its contextual parent id.
pub struct CollectionRelationshipManager<S, G> {
    store: Arc<S>,
    security: Arc<G>,
    metadata: Arc<MetadataResolver<S, G>>,
    cascade: Arc<CascadePlanner<S, G>>,
}

impl<S: PersistenceStore, G: SecurityGate> CollectionRelationshipManager<S, G> {
    pub fn new(
        store: Arc<S>,
        security: Arc<G>,
        metadata: Arc<MetadataResolver<S, G>>,
        cascade: Arc<CascadePlanner<S, G>>,
    ) -> Self {
        Self {
            store,
            security,
            metadata,
            cascade,
        }
    }

    pub async fn get_advanced_collection_record(
        &self,
        containing_metadata: &ClassMetadata,
        containing_entity: &Entity,
        collection_property: &str,
        item_id: &Id,
        ctx: &UserContext,
    ) -> AdminResult<Entity> {
        let collection = find_collection(containing_metadata, collection_property)?;
        self.authorize_read(containing_metadata, collection, ctx).await?;
        let parent_id = ContextualIdResolver::get_context_specific_relationship_id(
            containing_metadata,
            containing_entity,
            collection_property,
        )?;

        let item = self
            .locate(collection, &parent_id, &CollectionItemKey::new(item_id.clone()))
            .await?
            .ok_or_else(|| missing_item(collection, item_id))?;

        let item_metadata = self.metadata.resolve(&collection.target_type, ctx).await?;
        Ok(item_metadata.project(item))
    }

    pub async fn get_records_for_collection(
        &self,
        containing_metadata: &ClassMetadata,
        containing_entity: &Entity,
        collection_property: &str,
        criteria: &[FilterAndSortCriteria],
        ctx: &UserContext,
    ) -> AdminResult<Vec<Entity>> {
        let collection = find_collection(containing_metadata, collection_property)?;
        self.authorize_read(containing_metadata, collection, ctx).await?;
        let item_metadata = self.metadata.resolve(&collection.target_type, ctx).await?;
        check_criteria_fields(&item_metadata, criteria)?;

        let parent_id = ContextualIdResolver::get_context_specific_relationship_id(
            containing_metadata,
            containing_entity,
            collection_property,
        )?;
        let mut all_criteria = vec![parent_filter(collection, &parent_id)];
        all_criteria.extend(criteria.iter().cloned());

        let query = RecordQuery::new(collection.item_types.clone()).with_criteria(all_criteria);
        let items = self.store.query(&query).await.map_err(AdminError::from_store)?;
        Ok(items.into_iter().map(|e| item_metadata.project(e)).collect())
    }

    /// Items of every collection declared for the containing entity's type,
    /// read together. Any failing collection fails the whole call.
    pub async fn get_records_for_all_sub_collections(
        &self,
        request: &PersistencePackageRequest,
        containing_entity: &Entity,
    ) -> AdminResult<BTreeMap<String, Vec<Entity>>> {
        let ctx = &request.context;
        self.security
            .authorize(SecuredOperation::Fetch, &request.ceiling_type, ctx)
            .await?;
        let metadata = self.metadata.resolve(&request.ceiling_type, ctx).await?;
        if !metadata.accepts(&containing_entity.entity_type) {
            return Err(AdminError::validation(
                "type",
                format!(
                    "'{}' is not a kind of '{}'",
                    containing_entity.entity_type, metadata.ceiling_type
                ),
            ));
        }

        let collections: Vec<&CollectionMetadata> = metadata
            .collections
            .iter()
            .filter(|c| c.applies_to.iter().any(|t| t == &containing_entity.entity_type))
            .collect();

        let mut names = Vec::new();
        let mut queries = Vec::new();
        let mut item_metadata = Vec::new();
        let mut results: BTreeMap<String, Vec<Entity>> = BTreeMap::new();

        for collection in collections {
            let step = format!("collection '{}'", collection.name);
            self.security
                .authorize(SecuredOperation::Fetch, &collection.target_type, ctx)
                .await
                .map_err(|e| AdminError::from(e).within(step.clone()))?;

            // an absent owned sub-object has no items
            if let Some(owned) = ContextualIdResolver::owning_reference(&metadata, &collection.name) {
                if containing_entity.value_of(&owned.id_property).is_none() {
                    results.insert(collection.name.clone(), Vec::new());
                    continue;
                }
            }

            let parent_id = ContextualIdResolver::get_context_specific_relationship_id(
                &metadata,
                containing_entity,
                &collection.name,
            )
            .map_err(|e| e.within(step.clone()))?;
            let target_metadata = self
                .metadata
                .resolve(&collection.target_type, ctx)
                .await
                .map_err(|e| e.within(step.clone()))?;

            names.push(collection.name.clone());
            queries.push(
                RecordQuery::new(collection.item_types.clone())
                    .with_criteria(vec![parent_filter(collection, &parent_id)]),
            );
            item_metadata.push(target_metadata);
        }

        let batches = self
            .store
            .query_batch(&queries)
            .await
            .map_err(|e| AdminError::from_store(e).within(format!("sub-collections of '{}'", containing_entity.id)))?;
        if batches.len() != queries.len() {
            return Err(AdminError::Service(anyhow::anyhow!(
                "expected {} sub-collection results, store returned {}",
                queries.len(),
                batches.len()
            )));
        }

        for ((name, items), target_metadata) in names.into_iter().zip(batches).zip(item_metadata) {
            results.insert(name, items.into_iter().map(|e| target_metadata.project(e)).collect());
        }

        log::debug!(
            "Read {} sub-collection(s) of {} '{}'",
            results.len(),
            containing_entity.entity_type,
            containing_entity.id
        );
        Ok(results)
    }

    pub async fn add_sub_collection_entity(
        &self,
        form: &EntityForm,
        main_metadata: &ClassMetadata,
        field: &str,
        parent_entity: &Entity,
        ctx: &UserContext,
    ) -> AdminResult<Entity> {
        let collection = find_collection(main_metadata, field)?;
        check_item_type(collection, &form.entity_type)?;
        self.authorize_write(main_metadata, collection, SecuredOperation::Add, ctx)
            .await?;

        let parent_id =
            ContextualIdResolver::get_context_specific_relationship_id(main_metadata, parent_entity, field)?;
        let item_metadata = self.metadata.resolve(&collection.target_type, ctx).await?;

        let mut form = form.clone();
        form.set_field(collection.foreign_key.clone(), PropertyValue::Single(json!(parent_id)));
        let item = FormValidator::bind_new(&form, &item_metadata)?;

        if let Some(key_property) = collection.key_property() {
            let key = map_key(&item, key_property)?;
            if self.key_in_use(collection, &parent_id, key, None).await? {
                return Err(duplicate_key(collection, key_property, key));
            }
        }

        let created = self
            .store
            .create(item, &[])
            .await
            .map_err(AdminError::from_store)?;

        log::info!(
            "Added {} '{}' to '{}' of '{}'",
            created.entity_type,
            created.id,
            field,
            parent_id
        );
        Ok(item_metadata.project(created))
    }

    /// Update one item, found by `item_id` and, for map collections, by the
    /// form's prior key. A changed key records the old one on the item.
    pub async fn update_sub_collection_entity(
        &self,
        form: &EntityForm,
        main_metadata: &ClassMetadata,
        field: &str,
        parent_entity: &Entity,
        item_id: &Id,
        ctx: &UserContext,
    ) -> AdminResult<Entity> {
        let collection = find_collection(main_metadata, field)?;
        check_item_type(collection, &form.entity_type)?;
        self.authorize_write(main_metadata, collection, SecuredOperation::Update, ctx)
            .await?;

        let parent_id =
            ContextualIdResolver::get_context_specific_relationship_id(main_metadata, parent_entity, field)?;
        let item_metadata = self.metadata.resolve(&collection.target_type, ctx).await?;

        // the form's key is the target key, it only addresses the item when nothing else does
        let form_key = collection
            .key_property()
            .and_then(|k| form.field(k))
            .and_then(|v| v.first())
            .and_then(|v| v.as_str());
        let lookup = CollectionItemKey::new(item_id.clone())
            .with_prior_key(form.prior_key())
            .with_current_key(form_key);
        let existing = self
            .locate(collection, &parent_id, &lookup)
            .await?
            .ok_or_else(|| missing_item(collection, item_id))?;

        let mut form = form.clone();
        form.set_field(collection.foreign_key.clone(), PropertyValue::Single(json!(parent_id)));
        let mut item = FormValidator::bind_update(&existing, &form, &item_metadata)?;

        if let Some(key_property) = collection.key_property() {
            let new_key = map_key(&item, key_property)?.to_string();
            let old_key = existing
                .value_of(key_property)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            if new_key != old_key {
                if self
                    .key_in_use(collection, &parent_id, &new_key, Some(&existing.id))
                    .await?
                {
                    return Err(duplicate_key(collection, key_property, &new_key));
                }
                log::debug!("Re-keying '{}' entry '{}' to '{}'", field, old_key, new_key);
                item.prior_key = Some(old_key).filter(|k| !k.is_empty());
            }
        }

        let expected_version = form.version.unwrap_or(existing.version);
        let updated = self
            .store
            .update(item, expected_version, &[])
            .await
            .map_err(AdminError::from_store)?;
        Ok(item_metadata.project(updated))
    }

    /// Remove one item, found by `prior_key` for map collections and by
    /// `item_id`; when both resolve they must name the same item.
    pub async fn remove_sub_collection_entity(
        &self,
        main_metadata: &ClassMetadata,
        field: &str,
        parent_entity: &Entity,
        item_id: &Id,
        prior_key: Option<&str>,
        ctx: &UserContext,
    ) -> AdminResult<()> {
        let collection = find_collection(main_metadata, field)?;
        self.authorize_write(main_metadata, collection, SecuredOperation::Remove, ctx)
            .await?;

        let parent_id =
            ContextualIdResolver::get_context_specific_relationship_id(main_metadata, parent_entity, field)?;
        let lookup = CollectionItemKey::new(item_id.clone()).with_prior_key(prior_key);
        let existing = self
            .locate(collection, &parent_id, &lookup)
            .await?
            .ok_or_else(|| missing_item(collection, item_id))?;

        let plan = self.cascade.plan(&existing, ctx).await?;
        self.cascade.execute(&plan, &[], ctx).await?;

        log::info!(
            "Removed {} '{}' from '{}' of '{}'",
            existing.entity_type,
            existing.id,
            field,
            parent_id
        );
        Ok(())
    }

    /// Find an item of the collection under `parent_id`. Map items are tried
    /// by prior key and by item id, which must agree when both resolve; the
    /// current key is used only when neither is given. List items are found
    /// by id only.
    pub async fn locate(
        &self,
        collection: &CollectionMetadata,
        parent_id: &str,
        key: &CollectionItemKey,
    ) -> AdminResult<Option<Entity>> {
        let siblings = self.siblings(collection, parent_id).await?;
        let Some(key_property) = collection.key_property() else {
            return Ok(siblings.into_iter().find(|e| key.has_item_id() && e.id == key.item_id));
        };

        let by_key = |wanted: &str| {
            siblings
                .iter()
                .find(|e| e.value_of(key_property).and_then(|v| v.as_str()) == Some(wanted))
                .or_else(|| siblings.iter().find(|e| e.prior_key.as_deref() == Some(wanted)))
        };
        let by_prior = key.prior_key.as_deref().and_then(by_key);
        let by_id = siblings.iter().find(|e| key.has_item_id() && e.id == key.item_id);

        match (by_prior, by_id) {
            (Some(keyed), Some(identified)) if keyed.id != identified.id => Err(key_error(
                key_property,
                format!(
                    "prior key '{}' belongs to '{}', not '{}'",
                    key.prior_key.as_deref().unwrap_or_default(),
                    keyed.id,
                    identified.id
                ),
            )),
            (Some(found), _) | (None, Some(found)) => Ok(Some(found.clone())),
            (None, None) => Ok(key.fallback_key().and_then(by_key).cloned()),
        }
    }

    async fn siblings(&self, collection: &CollectionMetadata, parent_id: &str) -> AdminResult<Vec<Entity>> {
        let query = RecordQuery::new(collection.item_types.clone())
            .with_criteria(vec![parent_filter(collection, parent_id)]);
        self.store.query(&query).await.map_err(AdminError::from_store)
    }

    async fn key_in_use(
        &self,
        collection: &CollectionMetadata,
        parent_id: &str,
        key: &str,
        except: Option<&Id>,
    ) -> AdminResult<bool> {
        let Some(key_property) = collection.key_property() else {
            return Ok(false);
        };
        Ok(self.siblings(collection, parent_id).await?.iter().any(|e| {
            Some(&e.id) != except && e.value_of(key_property).and_then(|v| v.as_str()) == Some(key)
        }))
    }

    async fn authorize_read(
        &self,
        containing_metadata: &ClassMetadata,
        collection: &CollectionMetadata,
        ctx: &UserContext,
    ) -> AdminResult<()> {
        self.security
            .authorize(SecuredOperation::Fetch, &containing_metadata.ceiling_type, ctx)
            .await?;
        self.security
            .authorize(SecuredOperation::Fetch, &collection.target_type, ctx)
            .await?;
        Ok(())
    }

    /// Mutating an item updates its parent as well
    async fn authorize_write(
        &self,
        main_metadata: &ClassMetadata,
        collection: &CollectionMetadata,
        operation: SecuredOperation,
        ctx: &UserContext,
    ) -> AdminResult<()> {
        self.security
            .authorize(SecuredOperation::Update, &main_metadata.ceiling_type, ctx)
            .await?;
        self.security
            .authorize(operation, &collection.target_type, ctx)
            .await?;
        Ok(())
    }
}

fn find_collection<'a>(metadata: &'a ClassMetadata, name: &str) -> AdminResult<&'a CollectionMetadata> {
    metadata
        .find_collection(name)
        .ok_or_else(|| AdminError::not_found(format!("collection '{}' on '{}'", name, metadata.ceiling_type)))
}

fn check_item_type(collection: &CollectionMetadata, entity_type: &str) -> AdminResult<()> {
    if collection.accepts(entity_type) {
        Ok(())
    } else {
        Err(AdminError::TypeResolution {
            type_name: entity_type.to_string(),
            collection: collection.name.clone(),
        })
    }
}

fn parent_filter(collection: &CollectionMetadata, parent_id: &str) -> FilterAndSortCriteria {
    FilterAndSortCriteria::eq(collection.foreign_key.clone(), parent_id)
}

fn key_error(key_property: &str, message: impl Into<String>) -> AdminError {
    let mut result = ValidationResult::default();
    result.push(key_property, ValidationErrorType::InvalidKey, message);
    result.into_error()
}

fn map_key<'a>(item: &'a Entity, key_property: &str) -> AdminResult<&'a str> {
    item.value_of(key_property)
        .and_then(|v| v.as_str())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| key_error(key_property, "is required as the map key"))
}

fn duplicate_key(collection: &CollectionMetadata, key_property: &str, key: &str) -> AdminError {
    key_error(
        key_property,
        format!("'{}' is already used in '{}'", key, collection.name),
    )
}

fn missing_item(collection: &CollectionMetadata, item_id: &str) -> AdminError {
    AdminError::not_found(format!("item '{}' in collection '{}'", item_id, collection.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemovalPolicy;
    use crate::error::ErrorKind;
    use crate::security::PermitAll;
    use crate::seed::{catalog_registry, load_seed_data};
    use crate::store::{EntityStore, InMemoryStore};

    struct Fixture {
        store: Arc<InMemoryStore>,
        metadata: Arc<MetadataResolver<InMemoryStore, PermitAll>>,
        manager: CollectionRelationshipManager<InMemoryStore, PermitAll>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new(catalog_registry().unwrap()));
        load_seed_data(store.as_ref()).await.unwrap();
        let security = Arc::new(PermitAll);
        let metadata = Arc::new(MetadataResolver::new(store.clone(), security.clone(), true));
        let cascade = Arc::new(CascadePlanner::new(
            store.clone(),
            security.clone(),
            metadata.clone(),
            RemovalPolicy::Reject,
        ));
        let manager = CollectionRelationshipManager::new(store.clone(), security, metadata.clone(), cascade);
        Fixture {
            store,
            metadata,
            manager,
        }
    }

    impl Fixture {
        async fn product(&self) -> (Arc<ClassMetadata>, Entity) {
            let metadata = self.metadata.resolve("Product", &UserContext::system()).await.unwrap();
            let chair = self
                .store
                .get(&metadata.accepted_types(), &"prod-chair".to_string())
                .await
                .unwrap()
                .unwrap();
            (metadata, chair)
        }
    }

    #[tokio::test]
    async fn test_owned_collection_is_read_through_sku() {
        let fx = fixture().await;
        let (metadata, chair) = fx.product().await;
        let ctx = UserContext::system();

        let media = fx
            .manager
            .get_records_for_collection(&metadata, &chair, "defaultSku.skuMedia", &[], &ctx)
            .await
            .unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].id, "media-chair-front");

        let one = fx
            .manager
            .get_advanced_collection_record(&metadata, &chair, "defaultSku.skuMedia", &"media-chair-front".to_string(), &ctx)
            .await
            .unwrap();
        assert_eq!(one.value_of("title"), Some(&json!("Front")));
    }

    #[tokio::test]
    async fn test_add_rejects_unrelated_item_type() {
        let fx = fixture().await;
        let (metadata, chair) = fx.product().await;
        let form = EntityForm::new("Review").with_field("rating", json!(4));

        let err = fx
            .manager
            .add_sub_collection_entity(&form, &metadata, "defaultSku.skuMedia", &chair, &UserContext::system())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeResolution);
    }

    #[tokio::test]
    async fn test_add_polymorphic_item_sets_parent() {
        let fx = fixture().await;
        let (metadata, chair) = fx.product().await;
        let form = EntityForm::new("VideoMedia")
            .with_field("url", json!("https://cdn.example.com/chair.mp4"))
            .with_field("durationSeconds", json!(30));

        let video = fx
            .manager
            .add_sub_collection_entity(&form, &metadata, "defaultSku.skuMedia", &chair, &UserContext::system())
            .await
            .unwrap();
        assert_eq!(video.value_of("sku"), Some(&json!("sku-chair")));
    }

    #[tokio::test]
    async fn test_duplicate_map_key_is_rejected() {
        let fx = fixture().await;
        let (metadata, chair) = fx.product().await;
        let form = EntityForm::new("ProductAttribute")
            .with_field("name", json!("material"))
            .with_field("value", json!("pine"));

        let err = fx
            .manager
            .add_sub_collection_entity(&form, &metadata, "attributes", &chair, &UserContext::system())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_locate_by_prior_key_after_rename() {
        let fx = fixture().await;
        let (metadata, chair) = fx.product().await;
        let ctx = UserContext::system();

        let rename = EntityForm::new("ProductAttribute")
            .with_field("name", json!("finish"))
            .with_prior_key("material");
        let renamed = fx
            .manager
            .update_sub_collection_entity(&rename, &metadata, "attributes", &chair, &String::new(), &ctx)
            .await
            .unwrap();
        assert_eq!(renamed.id, "attr-chair-material");
        assert_eq!(renamed.prior_key.as_deref(), Some("material"));

        let attributes = metadata.find_collection("attributes").unwrap();
        let by_old_key = CollectionItemKey::new("").with_prior_key(Some("material"));
        let found = fx.manager.locate(attributes, "prod-chair", &by_old_key).await.unwrap();
        assert_eq!(found.map(|e| e.id), Some("attr-chair-material".to_string()));

        let nothing = CollectionItemKey::new("").with_prior_key(Some("colour"));
        assert!(fx.manager.locate(attributes, "prod-chair", &nothing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_by_id_cannot_take_a_sibling_key() {
        let fx = fixture().await;
        let (metadata, chair) = fx.product().await;
        let ctx = UserContext::system();

        let color = EntityForm::new("ProductAttribute")
            .with_field("name", json!("color"))
            .with_field("value", json!("red"));
        let color = fx
            .manager
            .add_sub_collection_entity(&color, &metadata, "attributes", &chair, &ctx)
            .await
            .unwrap();

        let rename = EntityForm::new("ProductAttribute").with_field("name", json!("material"));
        let err = fx
            .manager
            .update_sub_collection_entity(&rename, &metadata, "attributes", &chair, &color.id, &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let attributes = fx
            .manager
            .get_records_for_collection(&metadata, &chair, "attributes", &[], &ctx)
            .await
            .unwrap();
        let value_of = |id: &str| {
            attributes
                .iter()
                .find(|e| e.id == id)
                .map(|e| (e.value_of("name").cloned(), e.value_of("value").cloned()))
        };
        assert_eq!(value_of(&color.id), Some((Some(json!("color")), Some(json!("red")))));
        assert_eq!(
            value_of("attr-chair-material"),
            Some((Some(json!("material")), Some(json!("oak"))))
        );
    }

    #[tokio::test]
    async fn test_update_by_id_without_prior_key_renames_that_item() {
        let fx = fixture().await;
        let (metadata, chair) = fx.product().await;
        let ctx = UserContext::system();

        let rename = EntityForm::new("ProductAttribute").with_field("name", json!("wood"));
        let renamed = fx
            .manager
            .update_sub_collection_entity(&rename, &metadata, "attributes", &chair, &"attr-chair-material".to_string(), &ctx)
            .await
            .unwrap();
        assert_eq!(renamed.value_of("name"), Some(&json!("wood")));
        assert_eq!(renamed.prior_key.as_deref(), Some("material"));
    }

    #[tokio::test]
    async fn test_prior_key_and_id_must_name_the_same_item() {
        let fx = fixture().await;
        let (metadata, chair) = fx.product().await;
        let ctx = UserContext::system();

        let color = EntityForm::new("ProductAttribute")
            .with_field("name", json!("color"))
            .with_field("value", json!("red"));
        let color = fx
            .manager
            .add_sub_collection_entity(&color, &metadata, "attributes", &chair, &ctx)
            .await
            .unwrap();

        let err = fx
            .manager
            .remove_sub_collection_entity(&metadata, "attributes", &chair, &color.id, Some("material"), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let attributes = metadata.find_collection("attributes").unwrap();
        let by_current = CollectionItemKey::new("").with_current_key(Some("color"));
        let found = fx.manager.locate(attributes, "prod-chair", &by_current).await.unwrap();
        assert_eq!(found.map(|e| e.id), Some(color.id));
    }

    #[tokio::test]
    async fn test_sub_collections_of_unrelated_type_are_rejected() {
        let fx = fixture().await;
        let request = PersistencePackageRequest::new("Product", UserContext::system());
        let sku = fx
            .store
            .get(&["Sku".to_string()], &"sku-chair".to_string())
            .await
            .unwrap()
            .unwrap();

        let err = fx
            .manager
            .get_records_for_all_sub_collections(&request, &sku)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_all_sub_collections_keyed_by_name() {
        let fx = fixture().await;
        let request = PersistencePackageRequest::new("Product", UserContext::system());
        let (_, chair) = fx.product().await;

        let all = fx
            .manager
            .get_records_for_all_sub_collections(&request, &chair)
            .await
            .unwrap();
        assert_eq!(
            all.keys().cloned().collect::<Vec<_>>(),
            vec!["attributes", "defaultSku.skuMedia", "reviews"]
        );
        assert_eq!(all["attributes"].len(), 1);
        assert!(all["reviews"].is_empty());
    }
}
