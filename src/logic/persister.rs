use std::sync::Arc;

use crate::error::{AdminError, AdminResult};
use crate::logic::{CascadePlanner, FormValidator, MetadataResolver};
use crate::model::{Entity, EntityForm, Id, UserContext};
use crate::security::{SecuredOperation, SecurityGate};
use crate::store::PersistenceStore;

/// Adds, updates and removes top-level entities described by forms.
pub struct EntityPersister<S, G> {
    store: Arc<S>,
    security: Arc<G>,
    metadata: Arc<MetadataResolver<S, G>>,
    cascade: Arc<CascadePlanner<S, G>>,
}

impl<S: PersistenceStore, G: SecurityGate> EntityPersister<S, G> {
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

    pub async fn add_entity(
        &self,
        form: &EntityForm,
        custom_criteria: &[String],
        ctx: &UserContext,
    ) -> AdminResult<Entity> {
        let ceiling = form.ceiling_type();
        self.security.authorize(SecuredOperation::Add, ceiling, ctx).await?;

        let metadata = self.metadata.resolve(ceiling, ctx).await?;
        if !metadata.accepts(&form.entity_type) {
            return Err(AdminError::validation(
                "type",
                format!("'{}' is not a kind of '{}'", form.entity_type, ceiling),
            ));
        }

        let entity = FormValidator::bind_new(form, &metadata)?;
        let created = self
            .store
            .create(entity, custom_criteria)
            .await
            .map_err(AdminError::from_store)?;

        log::info!("Added {} '{}'", created.entity_type, created.id);
        Ok(metadata.project(created))
    }

    pub async fn update_entity(
        &self,
        form: &EntityForm,
        custom_criteria: &[String],
        ctx: &UserContext,
    ) -> AdminResult<Entity> {
        let id = required_id(form)?;
        let ceiling = form.ceiling_type();
        self.security.authorize(SecuredOperation::Update, ceiling, ctx).await?;

        let metadata = self.metadata.resolve(ceiling, ctx).await?;
        let existing = self
            .store
            .get(&metadata.accepted_types(), id)
            .await
            .map_err(AdminError::from_store)?
            .ok_or_else(|| AdminError::not_found(format!("{} '{}'", ceiling, id)))?;

        let entity = FormValidator::bind_update(&existing, form, &metadata)?;
        let expected_version = form.version.unwrap_or(existing.version);
        let updated = self
            .store
            .update(entity, expected_version, custom_criteria)
            .await
            .map_err(AdminError::from_store)?;

        log::info!(
            "Updated {} '{}' to version {}",
            updated.entity_type,
            updated.id,
            updated.version
        );
        Ok(metadata.project(updated))
    }

    /// Remove the entity and, where relationships cascade, its dependents.
    /// Nothing is deleted when any dependent blocks the removal.
    pub async fn remove_entity(
        &self,
        form: &EntityForm,
        custom_criteria: &[String],
        ctx: &UserContext,
    ) -> AdminResult<()> {
        let id = required_id(form)?;
        let ceiling = form.ceiling_type();
        self.security.authorize(SecuredOperation::Remove, ceiling, ctx).await?;

        let metadata = self.metadata.resolve(ceiling, ctx).await?;
        let existing = self
            .store
            .get(&metadata.accepted_types(), id)
            .await
            .map_err(AdminError::from_store)?
            .ok_or_else(|| AdminError::not_found(format!("{} '{}'", ceiling, id)))?;

        if let Some(expected) = form.version {
            if expected != existing.version {
                return Err(AdminError::Conflict(format!(
                    "{} '{}' is at version {}, not {}",
                    existing.entity_type, existing.id, existing.version, expected
                )));
            }
        }

        let plan = self.cascade.plan(&existing, ctx).await?;
        self.cascade.execute(&plan, custom_criteria, ctx).await?;

        log::info!(
            "Removed {} '{}' with {} dependent record(s)",
            existing.entity_type,
            existing.id,
            plan.refs.len() - 1
        );
        Ok(())
    }
}

fn required_id(form: &EntityForm) -> AdminResult<&Id> {
    form.id
        .as_ref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AdminError::validation("id", "is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemovalPolicy;
    use crate::error::ErrorKind;
    use crate::security::{PermitAll, RoleSecurityGate};
    use crate::seed::catalog_registry;
    use crate::store::{EntityStore, InMemoryStore};
    use serde_json::json;

    fn persister<G: SecurityGate>(security: G) -> (Arc<InMemoryStore>, EntityPersister<InMemoryStore, G>) {
        let store = Arc::new(InMemoryStore::new(catalog_registry().unwrap()));
        let security = Arc::new(security);
        let metadata = Arc::new(MetadataResolver::new(store.clone(), security.clone(), true));
        let cascade = Arc::new(CascadePlanner::new(
            store.clone(),
            security.clone(),
            metadata.clone(),
            RemovalPolicy::Reject,
        ));
        (store.clone(), EntityPersister::new(store, security, metadata, cascade))
    }

    fn lamp() -> EntityForm {
        EntityForm::new("Product").with_field("name", json!("Lamp"))
    }

    #[tokio::test]
    async fn test_add_then_update_with_stale_version() {
        let (_, persister) = persister(PermitAll);
        let ctx = UserContext::system();
        let added = persister.add_entity(&lamp(), &[], &ctx).await.unwrap();
        assert_eq!(added.version, 1);

        let edit = EntityForm::from_entity(&added).with_field("price", json!(25));
        let updated = persister.update_entity(&edit, &[], &ctx).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.value_of("price"), Some(&json!(25)));

        // same form again was read at version 1
        let err = persister.update_entity(&edit, &[], &ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_add_rejects_type_outside_ceiling() {
        let (_, persister) = persister(PermitAll);
        let form = EntityForm::new("Sku")
            .with_ceiling_type("Product")
            .with_field("name", json!("x"));
        let err = persister.add_entity(&form, &[], &UserContext::system()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_and_remove_need_an_existing_id() {
        let (_, persister) = persister(PermitAll);
        let ctx = UserContext::system();

        let err = persister.update_entity(&lamp(), &[], &ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = persister
            .remove_entity(&lamp().with_id("missing"), &[], &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_denied_add_writes_nothing() {
        let gate = RoleSecurityGate::new().grant("ROLE_VIEWER", "*", &[SecuredOperation::Fetch]);
        let (store, persister) = persister(gate);
        let viewer = UserContext::with_roles("viewer", ["ROLE_VIEWER"]);

        let err = persister.add_entity(&lamp(), &[], &viewer).await.unwrap_err();
        assert!(err.is_security());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_remove_deletes_record() {
        let (store, persister) = persister(PermitAll);
        let ctx = UserContext::system();
        let added = persister.add_entity(&lamp(), &[], &ctx).await.unwrap();

        persister
            .remove_entity(&EntityForm::from_entity(&added), &[], &ctx)
            .await
            .unwrap();
        assert!(store
            .get(&["Product".to_string()], &added.id)
            .await
            .unwrap()
            .is_none());
    }
}
