use crate::error::{AdminError, AdminResult};
use crate::model::{value_as_id, ClassMetadata, Entity, Id, OwnedReferenceMetadata};

/// Works out which identifier addresses the data behind a property path.
///
/// A product screen may show `defaultSku.skuMedia`, but that media belongs
/// to the sku, so lookups must use the sku's id rather than the product's.
/// Only owned references declared in the metadata are followed, and the
/// entity is never reloaded: the owned object's id must already be carried
/// by the entity under the reference's id property.
pub struct ContextualIdResolver;

impl ContextualIdResolver {
    pub fn get_context_specific_relationship_id(
        metadata: &ClassMetadata,
        entity: &Entity,
        property_name: &str,
    ) -> AdminResult<Id> {
        let Some(owned) = Self::owning_reference(metadata, property_name) else {
            return Ok(entity.id.clone());
        };

        entity
            .value_of(&owned.id_property)
            .and_then(value_as_id)
            .ok_or_else(|| {
                AdminError::not_found(format!(
                    "'{}' of {} '{}' has no owned {} to address '{}'",
                    owned.path, entity.entity_type, entity.id, owned.target_type, property_name
                ))
            })
    }

    /// Deepest declared owned reference whose target holds the rest of the path
    pub fn owning_reference<'a>(
        metadata: &'a ClassMetadata,
        property_name: &str,
    ) -> Option<&'a OwnedReferenceMetadata> {
        metadata
            .owned_references
            .iter()
            .filter_map(|owned| {
                let suffix = property_name
                    .strip_prefix(owned.path.as_str())?
                    .strip_prefix('.')?;
                let head = suffix.split('.').next()?;
                owned
                    .members
                    .iter()
                    .any(|m| m == head)
                    .then_some(owned)
            })
            .max_by_key(|owned| owned.path.len())
    }
}
