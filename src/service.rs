use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::AdminConfig;
use crate::error::AdminResult;
use crate::logic::{
    CascadePlanner, CollectionRelationshipManager, ContextualIdResolver, EntityPersister,
    MetadataResolver, RecordQueryEngine,
};
use crate::model::{
    ClassMetadata, Entity, EntityForm, FilterAndSortCriteria, Id, PersistencePackageRequest,
    UserContext,
};
use crate::security::SecurityGate;
use crate::store::PersistenceStore;

/// Entry point for admin screens: metadata, record reads and writes, and
/// sub-collection management for any declared type.
pub struct AdminEntityService<S, G> {
    metadata: Arc<MetadataResolver<S, G>>,
    query: RecordQueryEngine<S, G>,
    persister: EntityPersister<S, G>,
    collections: CollectionRelationshipManager<S, G>,
}

impl<S: PersistenceStore, G: SecurityGate> AdminEntityService<S, G> {
    pub fn new(store: Arc<S>, security: Arc<G>, config: AdminConfig) -> Self {
        let metadata = Arc::new(MetadataResolver::new(
            store.clone(),
            security.clone(),
            config.metadata.cache_enabled,
        ));
        let cascade = Arc::new(CascadePlanner::new(
            store.clone(),
            security.clone(),
            metadata.clone(),
            config.removal.policy,
        ));

        Self {
            query: RecordQueryEngine::new(
                store.clone(),
                security.clone(),
                metadata.clone(),
                config.query.clone(),
            ),
            persister: EntityPersister::new(store.clone(), security.clone(), metadata.clone(), cascade.clone()),
            collections: CollectionRelationshipManager::new(store, security, metadata.clone(), cascade),
            metadata,
        }
    }

    pub async fn get_class_metadata(&self, request: &PersistencePackageRequest) -> AdminResult<Arc<ClassMetadata>> {
        self.metadata.get_class_metadata(request).await
    }

    pub async fn get_records(&self, request: &PersistencePackageRequest) -> AdminResult<Vec<Entity>> {
        self.query.get_records(request).await
    }

    pub async fn get_record(&self, request: &PersistencePackageRequest, id: &Id) -> AdminResult<Entity> {
        self.query.get_record(request, id).await
    }

    pub async fn add_entity(
        &self,
        form: &EntityForm,
        custom_criteria: &[String],
        ctx: &UserContext,
    ) -> AdminResult<Entity> {
        self.persister.add_entity(form, custom_criteria, ctx).await
    }

    pub async fn update_entity(
        &self,
        form: &EntityForm,
        custom_criteria: &[String],
        ctx: &UserContext,
    ) -> AdminResult<Entity> {
        self.persister.update_entity(form, custom_criteria, ctx).await
    }

    pub async fn remove_entity(&self, form: &EntityForm, custom_criteria: &[String], ctx: &UserContext) -> AdminResult<()> {
        self.persister.remove_entity(form, custom_criteria, ctx).await
    }

    pub fn get_context_specific_relationship_id(
        &self,
        metadata: &ClassMetadata,
        entity: &Entity,
        property_name: &str,
    ) -> AdminResult<Id> {
        ContextualIdResolver::get_context_specific_relationship_id(metadata, entity, property_name)
    }

    pub async fn get_advanced_collection_record(
        &self,
        containing_metadata: &ClassMetadata,
        containing_entity: &Entity,
        collection_property: &str,
        item_id: &Id,
        ctx: &UserContext,
    ) -> AdminResult<Entity> {
        self.collections
            .get_advanced_collection_record(containing_metadata, containing_entity, collection_property, item_id, ctx)
            .await
    }

    pub async fn get_records_for_collection(
        &self,
        containing_metadata: &ClassMetadata,
        containing_entity: &Entity,
        collection_property: &str,
        criteria: &[FilterAndSortCriteria],
        ctx: &UserContext,
    ) -> AdminResult<Vec<Entity>> {
        self.collections
            .get_records_for_collection(containing_metadata, containing_entity, collection_property, criteria, ctx)
            .await
    }

    pub async fn get_records_for_all_sub_collections(
        &self,
        request: &PersistencePackageRequest,
        containing_entity: &Entity,
    ) -> AdminResult<BTreeMap<String, Vec<Entity>>> {
        self.collections
            .get_records_for_all_sub_collections(request, containing_entity)
            .await
    }

    pub async fn add_sub_collection_entity(
        &self,
        form: &EntityForm,
        main_metadata: &ClassMetadata,
        field: &str,
        parent_entity: &Entity,
        ctx: &UserContext,
    ) -> AdminResult<Entity> {
        self.collections
            .add_sub_collection_entity(form, main_metadata, field, parent_entity, ctx)
            .await
    }

    pub async fn update_sub_collection_entity(
        &self,
        form: &EntityForm,
        main_metadata: &ClassMetadata,
        field: &str,
        parent_entity: &Entity,
        item_id: &Id,
        ctx: &UserContext,
    ) -> AdminResult<Entity> {
        self.collections
            .update_sub_collection_entity(form, main_metadata, field, parent_entity, item_id, ctx)
            .await
    }

    pub async fn remove_sub_collection_entity(
        &self,
        main_metadata: &ClassMetadata,
        field: &str,
        parent_entity: &Entity,
        item_id: &Id,
        prior_key: Option<&str>,
        ctx: &UserContext,
    ) -> AdminResult<()> {
        self.collections
            .remove_sub_collection_entity(main_metadata, field, parent_entity, item_id, prior_key, ctx)
            .await
    }

    /// Drop cached metadata depending on a type, e.g. after its declaration changed
    pub fn invalidate_metadata(&self, type_name: &str) {
        self.metadata.invalidate_type(type_name);
    }

    pub fn invalidate_all_metadata(&self) {
        self.metadata.invalidate_all();
    }

    pub fn cached_metadata_entries(&self) -> usize {
        self.metadata.cached_entries()
    }
}
