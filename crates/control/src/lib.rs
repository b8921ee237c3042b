//! Session control domain for Heurist.
//!
//! Heurist lets remote callers drive many independently seeded
//! hyper-heuristic search sessions through one request/response surface. This
//! crate holds everything that decides *what* happens to a request: session
//! identity, the registry, the dispatcher, and the error taxonomy. Problem
//! domains themselves are external collaborators reached through
//! [`ProblemDomain`].
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! The instrumentation log is reached through [`OperationLog`]; transports
//! implement or consume [`ControlPlane`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`SessionId`, `SlotIndex`, `HeuristicId`, …) |
//! | [`types`] | Value types (`DomainKind`, `HeuristicType`, `CreateOutcome`, …) |
//! | [`errors`] | `ControlError`, `CapabilityError`, `JournalError` |
//! | [`capability`] | The `ProblemDomain` contract and `DomainFactory` |
//! | [`catalog`] | Factory table keyed by `DomainKind` |
//! | [`identity`] | Session id generation |
//! | [`registry`] | `SessionRegistry` and `Session` |
//! | [`operation`] | `Operation` / `Outcome` request and result shapes |
//! | [`dispatcher`] | Validation, logging, and forwarding of every operation |
//! | [`ports`] | `OperationLog` and `ControlPlane` traits |
//! | `stub` | Deterministic stand-in domain (feature `stub`) |

pub mod capability;
pub mod catalog;
pub mod dispatcher;
pub mod errors;
pub mod identifiers;
pub mod identity;
pub mod operation;
pub mod ports;
pub mod registry;
#[cfg(any(test, feature = "stub"))]
pub mod stub;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use capability::{DomainFactory, FnFactory, ProblemDomain};
pub use catalog::DomainCatalog;
pub use dispatcher::Dispatcher;
pub use errors::{CapabilityError, ControlError, JournalError};
pub use identifiers::{HeuristicId, InstanceIndex, Seed, SessionId, SlotIndex};
pub use identity::IdentityGenerator;
pub use operation::{Operation, Outcome};
pub use ports::{ControlPlane, MemoryLog, OperationLog};
pub use registry::{Session, SessionRegistry};
pub use types::{
    CreateOutcome, DomainKind, HeuristicType, SessionSummary, Timestamp, UnknownDomainKind,
};
