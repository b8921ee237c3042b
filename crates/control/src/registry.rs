//! Process-wide session registry.
//!
//! The registry maps [`SessionId`] to a live [`Session`]. It is insert-only:
//! sessions live until the process exits. Creation is the only writer; every
//! other operation takes a read lock just long enough to clone an
//! `Arc<Session>` and then works on the session outside the registry lock.
//!
//! # Thread Safety
//!
//! The map sits behind a [`parking_lot::RwLock`]. A session is fully built
//! (capability instantiated, id generated) before the write lock is taken, so
//! readers never observe a partially constructed entry. Each session guards its
//! capability handle with its own mutex, which serialises concurrent operations
//! against the same session.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{
    ControlError, CreateOutcome, DomainCatalog, DomainKind, IdentityGenerator, ProblemDomain,
    Seed, SessionId, SessionSummary, Timestamp, UnknownDomainKind,
};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A named, live binding between an id and one capability instance.
///
/// `id`, `domain`, `seed` and `created_at` never change. All solver state
/// lives in the handle and is reached only through [`Session::with_handle`].
pub struct Session {
    id: SessionId,
    domain: DomainKind,
    seed: Seed,
    created_at: Timestamp,
    handle: Mutex<Box<dyn ProblemDomain>>,
}

impl Session {
    fn new(id: SessionId, domain: DomainKind, seed: Seed, handle: Box<dyn ProblemDomain>) -> Self {
        Self {
            id,
            domain,
            seed,
            created_at: Timestamp::now(),
            handle: Mutex::new(handle),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn domain(&self) -> DomainKind {
        self.domain
    }

    pub fn seed(&self) -> Seed {
        self.seed
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id.clone(),
            domain: self.domain,
            seed: self.seed,
            created_at: self.created_at,
        }
    }

    /// Runs `f` with exclusive access to the capability handle.
    ///
    /// Blocks while another operation on this session is in progress.
    pub fn with_handle<T>(&self, f: impl FnOnce(&mut dyn ProblemDomain) -> T) -> T {
        let mut handle = self.handle.lock();
        f(handle.as_mut())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("domain", &self.domain)
            .field("seed", &self.seed)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Single source of truth for which sessions exist.
pub struct SessionRegistry {
    catalog: DomainCatalog,
    identity: IdentityGenerator,
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(catalog: DomainCatalog, identity: IdentityGenerator) -> Self {
        Self {
            catalog,
            identity,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Creates and registers a session backed by the domain named `requested`.
    ///
    /// `requested` must be one of the wire names of [`DomainKind`] *and* have a
    /// factory in the catalog; otherwise nothing is registered and a
    /// [`CreateOutcome::Rejected`] carrying `Problem domain <requested> not
    /// known.` is returned.
    ///
    /// Should the generated id already be registered, the new session replaces
    /// the old one.
    pub fn create(&self, requested: &str, seed: Seed) -> CreateOutcome {
        let kind = match DomainKind::from_str(requested) {
            Ok(kind) => kind,
            Err(unknown) => return Self::reject(unknown),
        };
        let Some(handle) = self.catalog.instantiate(kind, seed) else {
            return Self::reject(UnknownDomainKind(requested.to_string()));
        };

        let id = self.identity.generate(kind, seed);
        let session = Arc::new(Session::new(id.clone(), kind, seed, handle));

        let previous = self.sessions.write().insert(id.clone(), session);
        if previous.is_some() {
            warn!(session_id = %id, domain = %kind, "session id collision; previous session replaced");
        }
        info!(session_id = %id, domain = %kind, seed = %seed, "session created");

        CreateOutcome::Created { session_id: id }
    }

    fn reject(unknown: UnknownDomainKind) -> CreateOutcome {
        debug!(requested = %unknown.0, "create rejected: unknown problem domain");
        CreateOutcome::Rejected {
            message: unknown.to_string(),
        }
    }

    /// Looks up a session.
    ///
    /// `operation` and `args` only label the [`ControlError::SessionNotFound`] error.
    pub fn get(
        &self,
        session_id: &str,
        operation: &str,
        args: &str,
    ) -> Result<Arc<Session>, ControlError> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| ControlError::SessionNotFound {
                session_id: session_id.to_string(),
                operation: operation.to_string(),
                args: args.to_string(),
            })
    }

    /// Check if a session is registered under `session_id`.
    #[must_use]
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Kinds that can currently be instantiated.
    pub fn available_domains(&self) -> Vec<DomainKind> {
        self.catalog.kinds()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("catalog", &self.catalog)
            .field("sessions", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use proptest::prelude::*;

    use super::*;
    use crate::identity::is_well_formed;
    use crate::stub::StubFactory;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(DomainCatalog::with_stub_domains(), IdentityGenerator::default())
    }

    #[test]
    fn created_session_resolves_with_matching_attributes() {
        let registry = registry();
        let outcome = registry.create("SAT", Seed::new(42));
        let id = outcome.session_id().expect("created").clone();

        let session = registry.get(id.as_str(), "test", "").expect("registered");
        assert_eq!(session.id(), &id);
        assert_eq!(session.domain(), DomainKind::Sat);
        assert_eq!(session.seed(), Seed::new(42));
    }

    #[test]
    fn unknown_domain_registers_nothing() {
        let registry = registry();
        let outcome = registry.create("NotARealDomain", Seed::new(1));

        assert_eq!(
            outcome,
            CreateOutcome::Rejected {
                message: "Problem domain NotARealDomain not known.".to_string()
            }
        );
        assert!(registry.is_empty());
        let err = registry.get(outcome.as_text(), "describe", "").unwrap_err();
        assert!(matches!(err, ControlError::SessionNotFound { .. }));
    }

    #[test]
    fn known_kind_without_factory_is_rejected() {
        let mut catalog = DomainCatalog::new();
        catalog.register(StubFactory::new(DomainKind::Tsp));
        let registry = SessionRegistry::new(catalog, IdentityGenerator::default());

        assert!(registry.create("VRP", Seed::new(3)).session_id().is_none());
        assert!(registry.create("TSP", Seed::new(3)).session_id().is_some());
        assert_eq!(registry.available_domains(), vec![DomainKind::Tsp]);
    }

    #[test]
    fn lookup_error_carries_id_and_operation() {
        let err = registry().get("missing", "copySolution", "1 0").unwrap_err();
        assert_eq!(
            err,
            ControlError::SessionNotFound {
                session_id: "missing".to_string(),
                operation: "copySolution".to_string(),
                args: "1 0".to_string(),
            }
        );
    }

    #[test]
    fn concurrent_creates_all_land() {
        let registry = Arc::new(registry());
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    (0..16)
                        .filter_map(|i| {
                            registry
                                .create("FlowShop", Seed::new(n * 100 + i))
                                .session_id()
                                .cloned()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: Vec<SessionId> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("creator thread"))
            .collect();
        assert_eq!(ids.len(), 128);
        assert_eq!(registry.len(), 128);
        assert!(ids.iter().all(|id| registry.contains(id.as_str())));
    }

    proptest! {
        #[test]
        fn any_kind_and_seed_creates_a_resolvable_session(
            seed in any::<i64>(),
            kind_index in 0usize..6,
        ) {
            let registry = registry();
            let kind = DomainKind::ALL[kind_index];
            let outcome = registry.create(kind.as_str(), Seed::new(seed));
            let id = outcome.session_id().expect("known kind is created").clone();
            prop_assert!(is_well_formed(id.as_str()));
            let session = registry.get(id.as_str(), "test", "").expect("registered session");
            prop_assert_eq!(session.domain(), kind);
            prop_assert_eq!(session.seed(), Seed::new(seed));
        }
    }
}
