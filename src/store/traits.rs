use crate::model::{Entity, FilterAndSortCriteria, Id, TypeDescriptor};
use anyhow::Result;

/// Source of the declared type model: properties, hierarchy, collections
/// and owned references of every type.
#[async_trait::async_trait]
pub trait SchemaSource: Send + Sync {
    async fn list_types(&self) -> Result<Vec<TypeDescriptor>>;
}

/// One query against the entity store
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    /// Concrete types to include, usually a ceiling type and its subtypes
    pub entity_types: Vec<String>,
    pub criteria: Vec<FilterAndSortCriteria>,
    pub start_index: usize,
    pub max_results: Option<usize>,
    pub custom_criteria: Vec<String>,
}

impl RecordQuery {
    pub fn new(entity_types: Vec<String>) -> Self {
        Self {
            entity_types,
            criteria: Vec::new(),
            start_index: 0,
            max_results: None,
            custom_criteria: Vec::new(),
        }
    }

    pub fn with_criteria(mut self, criteria: Vec<FilterAndSortCriteria>) -> Self {
        self.criteria = criteria;
        self
    }
}

/// Identifies one stored entity, optionally at the version it was read at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub entity_type: String,
    pub id: Id,
    pub expected_version: Option<u64>,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, id: impl Into<Id>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
            expected_version: None,
        }
    }

    /// Reference to `entity` as read, so a later change is detected
    pub fn of(entity: &Entity) -> Self {
        Self::new(entity.entity_type.clone(), entity.id.clone()).with_version(entity.version)
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        entity.id == self.id && entity.entity_type == self.entity_type
    }
}

/// A relationship checked again when records are deleted: apart from the
/// deleted records themselves, no record of `entity_types` may hold
/// `parent_id` in `foreign_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentGuard {
    pub entity_types: Vec<String>,
    pub foreign_key: String,
    pub parent_id: Id,
}

impl DependentGuard {
    pub fn new(entity_types: Vec<String>, foreign_key: impl Into<String>, parent_id: impl Into<Id>) -> Self {
        Self {
            entity_types,
            foreign_key: foreign_key.into(),
            parent_id: parent_id.into(),
        }
    }

    pub fn is_violated_by(&self, entity: &Entity) -> bool {
        self.entity_types.iter().any(|t| t == &entity.entity_type)
            && entity.value_of(&self.foreign_key).and_then(|v| v.as_str()) == Some(self.parent_id.as_str())
    }
}

/// Storage of entities of arbitrary declared types. Implementations report
/// version conflicts and missing records as `StoreError` values.
#[async_trait::async_trait]
pub trait EntityStore: Send + Sync {
    /// Records matching all criteria, in criteria sort order, paged
    async fn query(&self, query: &RecordQuery) -> Result<Vec<Entity>>;

    /// Run several queries as one read. Implementations that can should
    /// answer all of them from the same snapshot.
    async fn query_batch(&self, queries: &[RecordQuery]) -> Result<Vec<Vec<Entity>>> {
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            results.push(self.query(query).await?);
        }
        Ok(results)
    }

    /// Fetch a record whose type is one of `entity_types`
    async fn get(&self, entity_types: &[String], id: &Id) -> Result<Option<Entity>>;

    /// Persist a new record; an empty id is replaced by a generated one
    async fn create(&self, entity: Entity, custom_criteria: &[String]) -> Result<Entity>;

    /// Replace a record if its stored version equals `expected_version`
    async fn update(
        &self,
        entity: Entity,
        expected_version: u64,
        custom_criteria: &[String],
    ) -> Result<Entity>;

    /// Delete every referenced record, or none of them. Fails with
    /// `StoreError::VersionConflict` when a reference carries a version the
    /// record no longer has, and with `StoreError::DependentAdded` when a
    /// record outside `refs` violates one of `guards`.
    async fn delete_all(
        &self,
        refs: &[EntityRef],
        guards: &[DependentGuard],
        custom_criteria: &[String],
    ) -> Result<()>;
}

pub trait PersistenceStore: SchemaSource + EntityStore + Send + Sync {}
impl<T: SchemaSource + EntityStore + Send + Sync> PersistenceStore for T {}
