use crate::model::ClassMetadata;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Cache key: type name plus the caller's visibility key
type CacheKey = (String, String);

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, Arc<ClassMetadata>>,
    /// Bumped by every invalidation
    generation: u64,
}

/// Process-wide store of resolved metadata.
///
/// Readers share the lock; an entry is written at most once per key (a
/// racing second resolution keeps the first entry). Invalidation takes the
/// write lock momentarily and starts a new generation: metadata resolved
/// before it is handed back to its caller but never cached.
#[derive(Debug, Default)]
pub struct MetadataCache {
    state: RwLock<CacheState>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, type_name: &str, visibility_key: &str) -> Option<Arc<ClassMetadata>> {
        self.state
            .read()
            .entries
            .get(&(type_name.to_string(), visibility_key.to_string()))
            .cloned()
    }

    /// Current generation, to be read before resolving metadata for `put`
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Insert unless already present or invalidated since `generation`;
    /// returns the entry that ends up cached, or the given metadata when it
    /// was resolved before the last invalidation.
    pub fn put(
        &self,
        type_name: &str,
        visibility_key: &str,
        generation: u64,
        metadata: ClassMetadata,
    ) -> Arc<ClassMetadata> {
        let mut state = self.state.write();
        if state.generation != generation {
            log::debug!(
                "Not caching metadata for '{}' resolved in generation {} (now {})",
                type_name,
                generation,
                state.generation
            );
            return Arc::new(metadata);
        }
        state
            .entries
            .entry((type_name.to_string(), visibility_key.to_string()))
            .or_insert_with(|| Arc::new(metadata))
            .clone()
    }

    /// Drop every entry whose metadata mentions `type_name` anywhere: as the
    /// ceiling, a subtype, or the target of a collection or owned reference.
    pub fn invalidate_type(&self, type_name: &str) -> usize {
        let mut state = self.state.write();
        state.generation += 1;
        let before = state.entries.len();
        state.entries.retain(|(ceiling, _), metadata| {
            ceiling != type_name
                && !metadata.subtypes.iter().any(|t| t == type_name)
                && !metadata.collections.iter().any(|c| {
                    c.owner_type == type_name || c.item_types.iter().any(|t| t == type_name)
                })
                && !metadata
                    .owned_references
                    .iter()
                    .any(|o| o.target_type == type_name)
        });
        before - state.entries.len()
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.generation += 1;
        state.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(ceiling: &str, subtypes: &[&str]) -> ClassMetadata {
        ClassMetadata {
            ceiling_type: ceiling.to_string(),
            subtypes: subtypes.iter().map(|s| s.to_string()).collect(),
            properties: Vec::new(),
            collections: Vec::new(),
            owned_references: Vec::new(),
        }
    }

    #[test]
    fn test_cache_basic_operations() {
        let cache = MetadataCache::new();
        assert!(cache.get("Product", "ROLE_ADMIN").is_none());

        cache.put("Product", "ROLE_ADMIN", 0, metadata("Product", &["Bundle"]));
        assert!(cache.get("Product", "ROLE_ADMIN").is_some());
        assert!(cache.get("Product", "").is_none());
    }

    #[test]
    fn test_first_entry_wins() {
        let cache = MetadataCache::new();
        let first = cache.put("Product", "", 0, metadata("Product", &[]));
        let second = cache.put("Product", "", 0, metadata("Product", &["Bundle"]));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.subtypes.is_empty());
    }

    #[test]
    fn test_invalidate_type_drops_dependent_entries() {
        let cache = MetadataCache::new();
        cache.put("Product", "", 0, metadata("Product", &["Bundle"]));
        cache.put("Product", "ROLE_ADMIN", 0, metadata("Product", &["Bundle"]));
        cache.put("Sku", "", 0, metadata("Sku", &[]));

        assert_eq!(cache.invalidate_type("Bundle"), 2);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_metadata_resolved_before_invalidation_is_not_cached() {
        let cache = MetadataCache::new();
        let before = cache.generation();

        // resolution in flight while the type is invalidated
        assert_eq!(cache.invalidate_type("Product"), 0);
        let stale = cache.put("Product", "", before, metadata("Product", &[]));
        assert!(stale.subtypes.is_empty());
        assert!(cache.get("Product", "").is_none());

        let fresh = cache.put("Product", "", cache.generation(), metadata("Product", &["Bundle"]));
        assert!(Arc::ptr_eq(&fresh, &cache.get("Product", "").unwrap()));

        let before_clear = cache.generation();
        cache.clear();
        cache.put("Sku", "", before_clear, metadata("Sku", &[]));
        assert!(cache.is_empty());
    }
}
