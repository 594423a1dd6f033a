use std::sync::Arc;

use crate::config::QueryConfig;
use crate::error::{AdminError, AdminResult};
use crate::logic::MetadataResolver;
use crate::model::{ClassMetadata, Entity, FilterAndSortCriteria, Id, PersistencePackageRequest};
use crate::security::{SecuredOperation, SecurityGate};
use crate::store::{PersistenceStore, RecordQuery};

/// Fields every record can be filtered and sorted on besides its properties
pub const RESERVED_FIELDS: [&str; 2] = ["id", "type"];

/// Reads top-level records of a ceiling type and its subtypes.
pub struct RecordQueryEngine<S, G> {
    store: Arc<S>,
    security: Arc<G>,
    metadata: Arc<MetadataResolver<S, G>>,
    config: QueryConfig,
}

impl<S: PersistenceStore, G: SecurityGate> RecordQueryEngine<S, G> {
    pub fn new(
        store: Arc<S>,
        security: Arc<G>,
        metadata: Arc<MetadataResolver<S, G>>,
        config: QueryConfig,
    ) -> Self {
        Self {
            store,
            security,
            metadata,
            config,
        }
    }

    pub async fn get_records(&self, request: &PersistencePackageRequest) -> AdminResult<Vec<Entity>> {
        self.security
            .authorize(SecuredOperation::Fetch, &request.ceiling_type, &request.context)
            .await?;
        let metadata = self
            .metadata
            .resolve(&request.ceiling_type, &request.context)
            .await?;
        check_criteria_fields(&metadata, &request.criteria)?;

        let query = RecordQuery {
            entity_types: metadata.accepted_types(),
            criteria: request.criteria.clone(),
            start_index: request.start_index,
            max_results: Some(self.config.page_size(request.max_results)),
            custom_criteria: request.custom_criteria.clone(),
        };
        let records = self.store.query(&query).await.map_err(AdminError::from_store)?;

        log::debug!(
            "Fetched {} {} record(s) from index {}",
            records.len(),
            request.ceiling_type,
            request.start_index
        );
        Ok(records.into_iter().map(|e| metadata.project(e)).collect())
    }

    pub async fn get_record(&self, request: &PersistencePackageRequest, id: &Id) -> AdminResult<Entity> {
        self.security
            .authorize(SecuredOperation::Fetch, &request.ceiling_type, &request.context)
            .await?;
        let metadata = self
            .metadata
            .resolve(&request.ceiling_type, &request.context)
            .await?;

        let record = self
            .store
            .get(&metadata.accepted_types(), id)
            .await
            .map_err(AdminError::from_store)?
            .ok_or_else(|| AdminError::not_found(format!("{} '{}'", request.ceiling_type, id)))?;

        Ok(metadata.project(record))
    }
}

/// Reject criteria naming fields the caller cannot see on this type
pub fn check_criteria_fields(metadata: &ClassMetadata, criteria: &[FilterAndSortCriteria]) -> AdminResult<()> {
    let unknown: Vec<&str> = criteria
        .iter()
        .map(|c| c.field.as_str())
        .filter(|f| !RESERVED_FIELDS.contains(f) && metadata.find_property(f).is_none())
        .collect();

    if unknown.is_empty() {
        return Ok(());
    }

    let mut errors = std::collections::BTreeMap::new();
    for field in unknown {
        errors.insert(
            field.to_string(),
            vec![format!("is not a property of '{}'", metadata.ceiling_type)],
        );
    }
    Err(AdminError::Validation { errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{SortDirection, UserContext};
    use crate::security::{PermitAll, RoleSecurityGate};
    use crate::seed::{catalog_registry, load_seed_data};
    use crate::store::InMemoryStore;
    use serde_json::json;

    async fn engine<G: SecurityGate>(security: G, config: QueryConfig) -> RecordQueryEngine<InMemoryStore, G> {
        let store = Arc::new(InMemoryStore::new(catalog_registry().unwrap()));
        load_seed_data(store.as_ref()).await.unwrap();
        let security = Arc::new(security);
        let metadata = Arc::new(MetadataResolver::new(store.clone(), security.clone(), true));
        RecordQueryEngine::new(store, security, metadata, config)
    }

    fn names(records: &[Entity]) -> Vec<String> {
        records
            .iter()
            .filter_map(|e| e.value_of("name").and_then(|v| v.as_str()).map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn test_polymorphic_fetch_and_sort() {
        let engine = engine(PermitAll, QueryConfig::default()).await;
        let request = PersistencePackageRequest::new("Product", UserContext::system())
            .with_criteria(FilterAndSortCriteria::sort_by("name", SortDirection::Asc));

        let records = engine.get_records(&request).await.unwrap();
        assert_eq!(names(&records), vec!["Chair", "Dining set"]);
        assert_eq!(records[1].entity_type, "Bundle");
    }

    #[tokio::test]
    async fn test_unknown_criteria_field_is_rejected() {
        let engine = engine(PermitAll, QueryConfig::default()).await;
        let request = PersistencePackageRequest::new("Product", UserContext::system())
            .with_criteria(FilterAndSortCriteria::eq("colour", json!("red")));

        let err = engine.get_records(&request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_page_size_is_clamped() {
        let config = QueryConfig {
            default_page_size: 1,
            max_page_size: 1,
        };
        let engine = engine(PermitAll, config).await;

        let request = PersistencePackageRequest::new("Product", UserContext::system());
        assert_eq!(engine.get_records(&request).await.unwrap().len(), 1);

        let request = request.page(1, 100);
        let second = engine.get_records(&request).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, "bundle-dining");
    }

    #[tokio::test]
    async fn test_get_record_hides_restricted_fields() {
        let gate = RoleSecurityGate::new().grant("ROLE_VIEWER", "*", &[SecuredOperation::Fetch]);
        let engine = engine(gate, QueryConfig::default()).await;
        let viewer = UserContext::with_roles("viewer", ["ROLE_VIEWER"]);
        let request = PersistencePackageRequest::new("Product", viewer);

        let chair = engine.get_record(&request, &"prod-chair".to_string()).await.unwrap();
        assert!(chair.find_property("cost").is_none());
        assert!(chair.find_property("price").is_some());

        let err = engine
            .get_record(&request, &"sku-chair".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_fetch_requires_permission() {
        let engine = engine(RoleSecurityGate::new(), QueryConfig::default()).await;
        let request = PersistencePackageRequest::new("Product", UserContext::new("anonymous"));
        assert!(engine.get_records(&request).await.unwrap_err().is_security());
    }
}
