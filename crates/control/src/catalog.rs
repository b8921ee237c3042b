//! Factory catalog keyed by [`DomainKind`].
//!
//! The catalog is the dispatch table the registry consults when creating a
//! session. It is populated once by the composition root and is read-only
//! afterwards, so it needs no internal synchronisation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use control::{DomainCatalog, DomainKind, FnFactory};
//!
//! let mut catalog = DomainCatalog::new();
//! catalog.register(FnFactory::new(DomainKind::Sat, |seed| Box::new(MySat::new(seed))));
//! assert!(catalog.contains(DomainKind::Sat));
//! ```

use std::collections::HashMap;

use crate::{DomainFactory, DomainKind, ProblemDomain, Seed};

/// Registry of [`DomainFactory`] instances, one per [`DomainKind`].
#[derive(Default)]
pub struct DomainCatalog {
    factories: HashMap<DomainKind, Box<dyn DomainFactory>>,
}

impl DomainCatalog {
    /// Create a new empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with the deterministic stand-in registered for every kind.
    #[cfg(any(test, feature = "stub"))]
    #[must_use]
    pub fn with_stub_domains() -> Self {
        let mut catalog = Self::new();
        for kind in DomainKind::ALL {
            catalog.register(crate::stub::StubFactory::new(kind));
        }
        catalog
    }

    /// Register a factory.
    ///
    /// If a factory for the same kind is already registered it is replaced and
    /// the old one returned.
    pub fn register(
        &mut self,
        factory: impl DomainFactory + 'static,
    ) -> Option<Box<dyn DomainFactory>> {
        let kind = factory.kind();
        self.factories.insert(kind, Box::new(factory))
    }

    /// Builds a fresh instance of `kind`, or `None` if no factory is registered.
    #[must_use]
    pub fn instantiate(&self, kind: DomainKind, seed: Seed) -> Option<Box<dyn ProblemDomain>> {
        self.factories.get(&kind).map(|factory| factory.create(seed))
    }

    /// Check if a factory for `kind` is registered.
    #[must_use]
    pub fn contains(&self, kind: DomainKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Returns the number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true if no factories are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<DomainKind> {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl std::fmt::Debug for DomainCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainCatalog")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubFactory;

    #[test]
    fn empty_catalog_instantiates_nothing() {
        let catalog = DomainCatalog::new();
        assert!(catalog.is_empty());
        assert!(catalog.instantiate(DomainKind::Sat, Seed::new(1)).is_none());
    }

    #[test]
    fn register_replaces_existing_factory() {
        let mut catalog = DomainCatalog::new();
        assert!(catalog.register(StubFactory::new(DomainKind::Tsp)).is_none());
        assert!(catalog.register(StubFactory::new(DomainKind::Tsp)).is_some());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.kinds(), vec![DomainKind::Tsp]);
    }

    #[test]
    fn stub_catalog_covers_every_kind() {
        let catalog = DomainCatalog::with_stub_domains();
        for kind in DomainKind::ALL {
            assert!(catalog.contains(kind), "missing {kind}");
            let domain = catalog
                .instantiate(kind, Seed::new(-3))
                .expect("factory registered");
            assert!(domain.describe().contains(kind.as_str()));
        }
    }
}
