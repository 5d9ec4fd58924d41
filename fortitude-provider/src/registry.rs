//! Static provider catalog.
//!
//! Providers must be explicitly registered - no auto-discovery. The
//! catalog is loaded once at startup and read concurrently afterwards.

use crate::types::{ProviderMetadata, ResearchProvider};
use fortitude_core::{ProviderError, ProviderId};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of research providers, keyed by id.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn ResearchProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider under its metadata id.
    /// Replaces any previously registered provider with the same id.
    pub fn register(&mut self, provider: Arc<dyn ResearchProvider>) {
        let id = provider.metadata().id.clone();
        self.providers.insert(id, provider);
    }

    /// Get a provider by id.
    pub fn get(&self, id: &ProviderId) -> Result<Arc<dyn ResearchProvider>, ProviderError> {
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotRegistered {
                provider: id.to_string(),
            })
    }

    /// Metadata for a provider, if registered.
    pub fn metadata(&self, id: &ProviderId) -> Option<&ProviderMetadata> {
        self.providers.get(id).map(|p| p.metadata())
    }

    /// All registered ids, sorted for deterministic iteration.
    pub fn ids(&self) -> Vec<ProviderId> {
        let mut ids: Vec<_> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Metadata for every registered provider, in id order.
    pub fn all_metadata(&self) -> Vec<&ProviderMetadata> {
        let mut metadata: Vec<_> = self.providers.values().map(|p| p.metadata()).collect();
        metadata.sort_by(|a, b| a.id.cmp(&b.id));
        metadata
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::ScriptedProvider;

    #[test]
    fn test_empty_registry() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(&ProviderId::new("missing")).is_err());
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(ScriptedProvider::always_succeeding("alpha")));

        assert_eq!(registry.len(), 1);
        assert!(registry.get(&ProviderId::new("alpha")).is_ok());
        assert!(registry.metadata(&ProviderId::new("alpha")).is_some());
    }

    #[test]
    fn test_duplicate_id_replaces() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(ScriptedProvider::always_succeeding("alpha")));
        registry.register(Arc::new(ScriptedProvider::always_succeeding("alpha")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ids_sorted() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(ScriptedProvider::always_succeeding("zeta")));
        registry.register(Arc::new(ScriptedProvider::always_succeeding("alpha")));
        registry.register(Arc::new(ScriptedProvider::always_succeeding("mid")));

        let ids: Vec<_> = registry.ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_not_registered_error_names_provider() {
        let registry = ProviderRegistry::new();
        let err = registry.get(&ProviderId::new("ghost")).err().unwrap();
        assert!(matches!(err, ProviderError::NotRegistered { provider } if provider == "ghost"));
    }
}
