//! Shared value types for the session control domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! closed vocabularies (domain kinds, heuristic categories) or composite values
//! exposed to callers.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Seed, SessionId};

// ---------------------------------------------------------------------------
// Domain kinds
// ---------------------------------------------------------------------------

/// Tag identifying which capability implementation backs a session.
///
/// The wire names are fixed (`"BinPacking"`, `"SAT"`, …) and are matched
/// exactly; see [`DomainKind::from_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DomainKind {
    /// One-dimensional bin packing.
    BinPacking,
    /// Permutation flow-shop scheduling.
    FlowShop,
    /// Personnel (nurse) rostering.
    PersonnelScheduling,
    /// Maximum satisfiability.
    #[serde(rename = "SAT")]
    Sat,
    /// Travelling salesman.
    #[serde(rename = "TSP")]
    Tsp,
    /// Vehicle routing with time windows.
    #[serde(rename = "VRP")]
    Vrp,
}

impl DomainKind {
    /// Every kind, in dispatch-table order.
    pub const ALL: [DomainKind; 6] = [
        DomainKind::BinPacking,
        DomainKind::FlowShop,
        DomainKind::PersonnelScheduling,
        DomainKind::Sat,
        DomainKind::Tsp,
        DomainKind::Vrp,
    ];

    /// Returns the wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            DomainKind::BinPacking => "BinPacking",
            DomainKind::FlowShop => "FlowShop",
            DomainKind::PersonnelScheduling => "PersonnelScheduling",
            DomainKind::Sat => "SAT",
            DomainKind::Tsp => "TSP",
            DomainKind::Vrp => "VRP",
        }
    }
}

impl std::fmt::Display for DomainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a [`DomainKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Problem domain {0} not known.")]
pub struct UnknownDomainKind(pub String);

impl FromStr for DomainKind {
    type Err = UnknownDomainKind;

    /// Case-sensitive: `"sat"` is not a domain kind.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DomainKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownDomainKind(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Heuristic categories
// ---------------------------------------------------------------------------

/// Category tag a capability assigns to each of its heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeuristicType {
    /// Perturbs a solution; strength governed by intensity of mutation.
    Mutation,
    /// Combines two parent solutions.
    Crossover,
    /// Destroys part of a solution and rebuilds it.
    RuinRecreate,
    /// Improves a solution; effort governed by depth of search.
    LocalSearch,
    /// Anything the domain does not classify.
    Other,
}

impl HeuristicType {
    /// Every tag in declaration order.
    pub const ALL: [HeuristicType; 5] = [
        HeuristicType::Mutation,
        HeuristicType::Crossover,
        HeuristicType::RuinRecreate,
        HeuristicType::LocalSearch,
        HeuristicType::Other,
    ];

    /// Returns the canonical tag (`"MUTATION"`, `"RUIN_RECREATE"`, …).
    pub fn as_str(self) -> &'static str {
        match self {
            HeuristicType::Mutation => "MUTATION",
            HeuristicType::Crossover => "CROSSOVER",
            HeuristicType::RuinRecreate => "RUIN_RECREATE",
            HeuristicType::LocalSearch => "LOCAL_SEARCH",
            HeuristicType::Other => "OTHER",
        }
    }

    /// Parses a tag leniently: case-insensitive, `-` and `_` interchangeable.
    ///
    /// Returns `None` for anything outside the fixed vocabulary.
    pub fn parse(tag: &str) -> Option<Self> {
        let normalized = tag.trim().to_ascii_uppercase().replace('-', "_");
        HeuristicType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
    }
}

impl std::fmt::Display for HeuristicType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Milliseconds since the Unix epoch.
    pub fn epoch_millis(self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Session-level results
// ---------------------------------------------------------------------------

/// Read-only view of a registered session's immutable attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub domain: DomainKind,
    pub seed: Seed,
    pub created_at: Timestamp,
}

/// Result of a create-session request.
///
/// An unrecognized domain kind is a *soft* rejection rather than an error: no
/// session is registered and the caller receives a descriptive message. The
/// tag lets callers tell the two apart without inspecting the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreateOutcome {
    /// A new session was registered under `session_id`.
    Created { session_id: SessionId },
    /// Nothing was registered. `message` reads `Problem domain <kind> not known.`
    Rejected { message: String },
}

impl CreateOutcome {
    /// Returns the new session id, or `None` for a rejection.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            CreateOutcome::Created { session_id } => Some(session_id),
            CreateOutcome::Rejected { .. } => None,
        }
    }

    /// The plain-text form of the outcome: the id on
    /// success, the message on rejection.
    pub fn as_text(&self) -> &str {
        match self {
            CreateOutcome::Created { session_id } => session_id.as_str(),
            CreateOutcome::Rejected { message } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_kind_parses_wire_names_exactly() {
        for kind in DomainKind::ALL {
            assert_eq!(kind.as_str().parse::<DomainKind>(), Ok(kind));
        }
        assert!("sat".parse::<DomainKind>().is_err());
        assert_eq!(
            "NotARealDomain".parse::<DomainKind>().map_err(|e| e.to_string()),
            Err("Problem domain NotARealDomain not known.".to_string())
        );
    }

    #[test]
    fn domain_kind_serde_matches_wire_names() {
        let json = serde_json::to_string(&DomainKind::Sat).expect("serialize");
        assert_eq!(json, "\"SAT\"");
        let kind: DomainKind = serde_json::from_str("\"PersonnelScheduling\"").expect("deserialize");
        assert_eq!(kind, DomainKind::PersonnelScheduling);
    }

    #[test]
    fn heuristic_type_parse_is_lenient() {
        assert_eq!(HeuristicType::parse("LOCAL_SEARCH"), Some(HeuristicType::LocalSearch));
        assert_eq!(HeuristicType::parse("local-search"), Some(HeuristicType::LocalSearch));
        assert_eq!(HeuristicType::parse("ruin_recreate"), Some(HeuristicType::RuinRecreate));
        assert_eq!(HeuristicType::parse("teleport"), None);
    }

    #[test]
    fn create_outcome_is_tagged_on_the_wire() {
        let outcome = CreateOutcome::Rejected {
            message: "Problem domain X not known.".to_string(),
        };
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["status"], "rejected");
        assert_eq!(outcome.as_text(), "Problem domain X not known.");
        assert!(outcome.session_id().is_none());
    }
}
