//! Session identity generation.
//!
//! Ids are SHA-256 digests over the creation time, the domain kind, the seed,
//! a fixed salt, and a random UUIDv4 nonce, hex-encoded to 64 lowercase
//! characters. The nonce makes two creations in the same millisecond with the
//! same kind and seed produce different ids; without it they would collide.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{DomainKind, Seed, SessionId, Timestamp};

/// Salt mixed into every digest unless configured otherwise.
pub const DEFAULT_SALT: &str = "problemDomain";

/// Length of every generated id, in characters.
pub const SESSION_ID_LEN: usize = 64;

/// Produces opaque, non-enumerable session ids.
#[derive(Debug, Clone)]
pub struct IdentityGenerator {
    salt: String,
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SALT)
    }
}

impl IdentityGenerator {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    /// Generates a fresh id for a session of `kind` seeded with `seed`.
    pub fn generate(&self, kind: DomainKind, seed: Seed) -> SessionId {
        derive_session_id(Timestamp::now(), kind, seed, &self.salt, Some(Uuid::new_v4()))
    }
}

/// Deterministic core of [`IdentityGenerator::generate`].
///
/// With `nonce = None`, equal inputs yield equal ids.
pub fn derive_session_id(
    at: Timestamp,
    kind: DomainKind,
    seed: Seed,
    salt: &str,
    nonce: Option<Uuid>,
) -> SessionId {
    let mut hasher = Sha256::new();
    hasher.update(at.epoch_millis().to_string().as_bytes());
    hasher.update(kind.as_str().as_bytes());
    hasher.update(seed.as_i64().to_string().as_bytes());
    hasher.update(salt.as_bytes());
    if let Some(nonce) = nonce {
        hasher.update(nonce.as_bytes());
    }
    SessionId::from_digest(hex::encode(hasher.finalize()))
}

/// Returns `true` if `candidate` has the shape of a generated id.
pub fn is_well_formed(candidate: &str) -> bool {
    candidate.len() == SESSION_ID_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    use super::*;

    fn fixed_time() -> Timestamp {
        Timestamp::from_utc(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())
    }

    #[test]
    fn derivation_without_nonce_is_deterministic() {
        let a = derive_session_id(fixed_time(), DomainKind::Sat, Seed::new(42), DEFAULT_SALT, None);
        let b = derive_session_id(fixed_time(), DomainKind::Sat, Seed::new(42), DEFAULT_SALT, None);
        assert_eq!(a, b);
    }

    #[test]
    fn salt_changes_the_digest() {
        let a = derive_session_id(fixed_time(), DomainKind::Sat, Seed::new(42), "one", None);
        let b = derive_session_id(fixed_time(), DomainKind::Sat, Seed::new(42), "two", None);
        assert_ne!(a, b);
    }

    #[test]
    fn nonce_separates_same_tick_creations() {
        let a = derive_session_id(
            fixed_time(),
            DomainKind::Tsp,
            Seed::new(7),
            DEFAULT_SALT,
            Some(Uuid::new_v4()),
        );
        let b = derive_session_id(
            fixed_time(),
            DomainKind::Tsp,
            Seed::new(7),
            DEFAULT_SALT,
            Some(Uuid::new_v4()),
        );
        assert_ne!(a, b);
    }

    #[test]
    fn well_formed_rejects_foreign_strings() {
        assert!(!is_well_formed("Problem domain NotARealDomain not known."));
        assert!(!is_well_formed(&"A".repeat(SESSION_ID_LEN)));
    }

    proptest! {
        #[test]
        fn generated_ids_have_fixed_format(seed in any::<i64>(), kind_index in 0usize..6) {
            let kind = DomainKind::ALL[kind_index];
            let id = IdentityGenerator::default().generate(kind, Seed::new(seed));
            prop_assert!(is_well_formed(id.as_str()), "bad id {}", id);
        }
    }
}
