use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use crate::config::RemovalPolicy;
use crate::error::{AdminError, AdminResult};
use crate::logic::MetadataResolver;
use crate::model::{CollectionMetadata, Entity, FilterAndSortCriteria, UserContext};
use crate::security::{SecuredOperation, SecurityGate};
use crate::store::{DependentGuard, EntityRef, PersistenceStore, RecordQuery};

/// Everything removing one entity takes with it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemovalPlan {
    /// Root first, then dependents in discovery order, each at the version
    /// it was read at
    pub refs: Vec<EntityRef>,
    pub types: BTreeSet<String>,
    /// Every relationship examined; checked again by the store on delete
    pub guards: Vec<DependentGuard>,
}

impl RemovalPlan {
    fn push(&mut self, entity: &Entity) {
        self.refs.push(EntityRef::of(entity));
        self.types.insert(entity.entity_type.clone());
    }
}

/// Walks the own collections of an entity and decides, per relationship,
/// whether dependents are removed with it or block the removal.
pub struct CascadePlanner<S, G> {
    store: Arc<S>,
    security: Arc<G>,
    metadata: Arc<MetadataResolver<S, G>>,
    policy: RemovalPolicy,
}

impl<S: PersistenceStore, G: SecurityGate> CascadePlanner<S, G> {
    pub fn new(
        store: Arc<S>,
        security: Arc<G>,
        metadata: Arc<MetadataResolver<S, G>>,
        policy: RemovalPolicy,
    ) -> Self {
        Self {
            store,
            security,
            metadata,
            policy,
        }
    }

    fn cascades(&self, collection: &CollectionMetadata) -> bool {
        collection
            .cascade_delete
            .unwrap_or(self.policy == RemovalPolicy::Cascade)
    }

    /// Collect `root` and its cascading dependents. Fails with a validation
    /// error naming every non-empty collection that does not cascade.
    pub async fn plan(&self, root: &Entity, ctx: &UserContext) -> AdminResult<RemovalPlan> {
        let mut plan = RemovalPlan::default();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut blocked: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut pending = VecDeque::from([root.clone()]);

        while let Some(entity) = pending.pop_front() {
            if !seen.insert((entity.entity_type.clone(), entity.id.clone())) {
                continue;
            }
            let metadata = self.metadata.resolve(&entity.entity_type, ctx).await?;
            plan.push(&entity);

            for collection in metadata.own_collections_for(&entity.entity_type) {
                let query = RecordQuery::new(collection.item_types.clone()).with_criteria(vec![
                    FilterAndSortCriteria::eq(collection.foreign_key.clone(), entity.id.clone()),
                ]);
                let children = self
                    .store
                    .query(&query)
                    .await
                    .map_err(|e| AdminError::from_store(e).within(format!("collection '{}'", collection.name)))?;
                plan.guards.push(DependentGuard::new(
                    collection.item_types.clone(),
                    collection.foreign_key.clone(),
                    entity.id.clone(),
                ));

                if children.is_empty() {
                    continue;
                }
                if !self.cascades(collection) {
                    let field = if entity.id == root.id {
                        collection.name.clone()
                    } else {
                        format!("{}.{}", entity.entity_type, collection.name)
                    };
                    blocked.entry(field).or_default().push(format!(
                        "has {} dependent item(s); remove them first or enable cascading removal",
                        children.len()
                    ));
                    continue;
                }
                pending.extend(children);
            }
        }

        if !blocked.is_empty() {
            return Err(AdminError::Validation { errors: blocked });
        }

        log::debug!(
            "Removal of {} '{}' covers {} record(s) of {:?}",
            root.entity_type,
            root.id,
            plan.refs.len(),
            plan.types
        );
        Ok(plan)
    }

    /// Check remove access for every type in the plan, then delete it in
    /// one call. The store rejects the delete when a planned record changed
    /// or a new dependent appeared since planning.
    pub async fn execute(&self, plan: &RemovalPlan, custom_criteria: &[String], ctx: &UserContext) -> AdminResult<()> {
        for type_name in &plan.types {
            self.security
                .authorize(SecuredOperation::Remove, type_name, ctx)
                .await?;
        }
        self.store
            .delete_all(&plan.refs, &plan.guards, custom_criteria)
            .await
            .map_err(AdminError::from_store)
    }
}
