// Provider Registry
//
// Explicit, constructed map of provider kind to adapter, handed to the
// resolver instead of a global singleton.

use std::collections::HashMap;
use std::sync::Arc;

use super::AnimeProvider;
use crate::models::ProviderKind;

/// Provider registry
///
/// Registration order is remembered; the first registered provider is the
/// primary one used by catalogue endpoints that name none.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn AnimeProvider>>,
    order: Vec<ProviderKind>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own kind, replacing any previous one.
    pub fn register(&mut self, provider: Arc<dyn AnimeProvider>) {
        let kind = provider.kind();
        if self.providers.insert(kind, provider).is_none() {
            self.order.push(kind);
        }
    }

    #[must_use]
    pub fn with(mut self, provider: Arc<dyn AnimeProvider>) -> Self {
        self.register(provider);
        self
    }

    #[must_use]
    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn AnimeProvider>> {
        self.providers.get(&kind).cloned()
    }

    #[must_use]
    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    /// Registered kinds in registration order
    #[must_use]
    pub fn kinds(&self) -> &[ProviderKind] {
        &self.order
    }

    #[must_use]
    pub fn primary(&self) -> Option<Arc<dyn AnimeProvider>> {
        self.order.first().and_then(|k| self.get(*k))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockProvider;

    #[test]
    fn test_register_and_lookup() {
        let registry = ProviderRegistry::new()
            .with(Arc::new(MockProvider::new(ProviderKind::GoGoAnime)))
            .with(Arc::new(MockProvider::new(ProviderKind::OfficialApi)))
            .with(Arc::new(MockProvider::new(ProviderKind::GoGoAnime)));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.kinds(), &[ProviderKind::GoGoAnime, ProviderKind::OfficialApi]);
        assert_eq!(registry.primary().map(|p| p.kind()), Some(ProviderKind::GoGoAnime));
        assert!(registry.get(ProviderKind::Zoro).is_none());
        assert!(registry.contains(ProviderKind::OfficialApi));
    }
}
