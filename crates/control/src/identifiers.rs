//! Newtype domain identifiers.
//!
//! Every addressable thing a caller names over the wire gets its own newtype so
//! that a [`SlotIndex`] can never be passed where a
//! [`HeuristicId`] is expected, even though both are `usize` under the hood.

use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for usize-wrapped newtypes (indices into capability-owned tables).
// Generates: struct (Copy), new(), as_usize(), Display, From<usize>.
// ---------------------------------------------------------------------------
macro_rules! index_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(usize);

        impl $name {
            /// Creates a new index from a raw integer.
            pub fn new(value: usize) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_usize(self) -> usize {
                self.0
            }
        }

        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

index_id! {
    /// Addresses one slot of a session's solution memory.
    ///
    /// Valid values are `0..memory_size`; the capability decides what happens
    /// outside that range.
    SlotIndex
}

index_id! {
    /// Identifies a heuristic within one problem domain (`0..number_of_heuristics`).
    HeuristicId
}

index_id! {
    /// Zero-based index of a bundled problem instance (`0..number_of_instances`).
    InstanceIndex
}

// ---------------------------------------------------------------------------
// Session identity
// ---------------------------------------------------------------------------

/// Opaque identifier of a live session.
///
/// Produced by [`crate::IdentityGenerator`] as a 64-character lowercase hex
/// digest. The registry never inspects the content; it only compares ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new identifier, returning `None` if the value is empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.is_empty() {
            None
        } else {
            Some(Self(v))
        }
    }

    // Digests are never empty.
    pub(crate) fn from_digest(digest: String) -> Self {
        Self(digest)
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Lets the registry map be queried with the raw `&str` that arrives from a
// transport without allocating a `SessionId` first.
impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------

/// Caller-supplied seed for a capability's internal randomness.
///
/// Any `i64` is accepted, negative values included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seed(i64);

impl Seed {
    /// Wraps a raw seed value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw seed value.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for Seed {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn session_id_rejects_empty_value() {
        assert!(SessionId::new("").is_none());
        assert_eq!(SessionId::new("abc").map(|id| id.to_string()), Some("abc".to_string()));
    }

    #[test]
    fn session_id_map_is_queryable_by_str() {
        let mut map = HashMap::new();
        let id = SessionId::new("deadbeef").expect("non-empty id");
        map.insert(id, 7);
        assert_eq!(map.get("deadbeef"), Some(&7));
        assert_eq!(map.get("cafebabe"), None);
    }

    #[test]
    fn index_newtypes_serialize_as_plain_integers() {
        let json = serde_json::to_string(&SlotIndex::new(3)).expect("serialize");
        assert_eq!(json, "3");
        let back: HeuristicId = serde_json::from_str("5").expect("deserialize");
        assert_eq!(back.as_usize(), 5);
    }
}
