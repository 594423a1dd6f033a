use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::logic::CriteriaEvaluator;
use crate::model::{generate_id, Entity, Id, TypeDescriptor, TypeRegistry};
use crate::store::traits::{DependentGuard, EntityRef, EntityStore, RecordQuery, SchemaSource};

/// In-memory persistence collaborator.
///
/// Keeps records in insertion order behind a single lock, so batched reads
/// observe one snapshot and multi-record deletes are all-or-nothing.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    registry: RwLock<TypeRegistry>,
    records: RwLock<Vec<Entity>>,
}

impl InMemoryStore {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry: RwLock::new(registry),
            records: RwLock::new(Vec::new()),
        }
    }

    /// Swap the type model. Callers must invalidate any metadata cache.
    pub fn replace_registry(&self, registry: TypeRegistry) {
        *self.registry.write() = registry;
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn run_query(records: &[Entity], query: &RecordQuery) -> Vec<Entity> {
        if !query.custom_criteria.is_empty() {
            log::debug!("Ignoring custom criteria {:?}", query.custom_criteria);
        }
        let candidates = records
            .iter()
            .filter(|e| query.entity_types.iter().any(|t| t == &e.entity_type))
            .cloned()
            .collect();
        CriteriaEvaluator::apply(candidates, &query.criteria, query.start_index, query.max_results)
    }
}

#[async_trait::async_trait]
impl SchemaSource for InMemoryStore {
    async fn list_types(&self) -> Result<Vec<TypeDescriptor>> {
        Ok(self.registry.read().types().to_vec())
    }
}

#[async_trait::async_trait]
impl EntityStore for InMemoryStore {
    async fn query(&self, query: &RecordQuery) -> Result<Vec<Entity>> {
        let records = self.records.read();
        Ok(Self::run_query(&records, query))
    }

    async fn query_batch(&self, queries: &[RecordQuery]) -> Result<Vec<Vec<Entity>>> {
        let records = self.records.read();
        Ok(queries.iter().map(|q| Self::run_query(&records, q)).collect())
    }

    async fn get(&self, entity_types: &[String], id: &Id) -> Result<Option<Entity>> {
        let records = self.records.read();
        Ok(records
            .iter()
            .find(|e| &e.id == id && entity_types.iter().any(|t| t == &e.entity_type))
            .cloned())
    }

    async fn create(&self, mut entity: Entity, _custom_criteria: &[String]) -> Result<Entity> {
        let mut records = self.records.write();

        if entity.id.is_empty() {
            entity.id = generate_id();
        } else if records.iter().any(|e| e.id == entity.id) {
            return Err(StoreError::AlreadyExists {
                entity_type: entity.entity_type,
                id: entity.id,
            }
            .into());
        }

        let now = Utc::now();
        entity.version = 1;
        entity.created_at = now;
        entity.updated_at = now;
        records.push(entity.clone());
        Ok(entity)
    }

    async fn update(
        &self,
        mut entity: Entity,
        expected_version: u64,
        _custom_criteria: &[String],
    ) -> Result<Entity> {
        let mut records = self.records.write();
        let Some(stored) = records.iter_mut().find(|e| e.id == entity.id) else {
            return Err(StoreError::NotFound {
                entity_type: entity.entity_type,
                id: entity.id,
            }
            .into());
        };

        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                entity_type: stored.entity_type.clone(),
                id: stored.id.clone(),
                expected: expected_version,
                actual: stored.version,
            }
            .into());
        }

        entity.version = stored.version + 1;
        entity.created_at = stored.created_at;
        entity.updated_at = Utc::now();
        *stored = entity.clone();
        Ok(entity)
    }

    async fn delete_all(
        &self,
        refs: &[EntityRef],
        guards: &[DependentGuard],
        _custom_criteria: &[String],
    ) -> Result<()> {
        let mut records = self.records.write();

        for wanted in refs {
            let Some(stored) = records.iter().find(|e| wanted.matches(e)) else {
                return Err(StoreError::NotFound {
                    entity_type: wanted.entity_type.clone(),
                    id: wanted.id.clone(),
                }
                .into());
            };
            if let Some(expected) = wanted.expected_version.filter(|v| *v != stored.version) {
                return Err(StoreError::VersionConflict {
                    entity_type: stored.entity_type.clone(),
                    id: stored.id.clone(),
                    expected,
                    actual: stored.version,
                }
                .into());
            }
        }

        let remaining = records.iter().filter(|e| !refs.iter().any(|r| r.matches(e)));
        for record in remaining {
            if let Some(guard) = guards.iter().find(|g| g.is_violated_by(record)) {
                return Err(StoreError::DependentAdded {
                    entity_type: record.entity_type.clone(),
                    id: record.id.clone(),
                    foreign_key: guard.foreign_key.clone(),
                    parent_id: guard.parent_id.clone(),
                }
                .into());
            }
        }

        records.retain(|e| !refs.iter().any(|r| r.matches(e)));
        Ok(())
    }
}
