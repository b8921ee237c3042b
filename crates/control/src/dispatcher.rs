//! Operation dispatcher.
//!
//! One entry point per capability operation, all following the same contract:
//!
//! 1. Record the attempt (`<operation> <session_id> <args…>`) in the
//!    [`OperationLog`]. A log failure is reported through `tracing` and never
//!    fails the operation.
//! 2. Resolve the session; an unknown id fails with
//!    [`ControlError::SessionNotFound`] and no capability call is made.
//! 3. Forward to the capability handle under the session's mutex and return
//!    its result unchanged, or wrap its error in [`ControlError::Capability`]
//!    without reinterpreting it.
//!
//! [`Dispatcher::execute`] routes a generic [`Operation`] to the matching
//! typed entry point.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    CapabilityError, ControlError, CreateOutcome, HeuristicId, HeuristicType, InstanceIndex,
    Operation, OperationLog, Outcome, ProblemDomain, Seed, SessionRegistry, SessionSummary,
    SlotIndex,
};

/// Log name of the create operation.
pub const CREATE_OPERATION: &str = "instantiateProblemDomain";

/// Log name of the session summary lookup.
pub const SUMMARY_OPERATION: &str = "getSession";

/// Routes operations to sessions and records each one.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    log: Arc<dyn OperationLog>,
}

impl Dispatcher {
    pub fn new(registry: Arc<SessionRegistry>, log: Arc<dyn OperationLog>) -> Self {
        Self { registry, log }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    fn record(&self, operation: &str, args: Vec<String>) {
        if let Err(error) = self.log.record(operation, &args) {
            warn!(operation, error = %error, "instrumentation log write failed");
        }
    }

    /// Steps 1–3 of the dispatch contract for one session-scoped operation.
    fn dispatch<T>(
        &self,
        session_id: &str,
        operation: &Operation,
        call: impl FnOnce(&mut dyn ProblemDomain) -> Result<T, CapabilityError>,
    ) -> Result<T, ControlError> {
        let name = operation.name();
        let args = operation.args();

        let mut logged = Vec::with_capacity(args.len() + 1);
        logged.push(session_id.to_string());
        logged.extend(args.iter().cloned());
        self.record(name, logged);

        let joined = args.join(" ");
        let session = self.registry.get(session_id, name, &joined)?;
        debug!(session_id, operation = name, domain = %session.domain(), "dispatching");

        session.with_handle(call).map_err(|source| {
            debug!(session_id, operation = name, error = %source, "capability rejected operation");
            ControlError::Capability {
                session_id: session_id.to_string(),
                operation: name.to_string(),
                args: joined,
                source,
            }
        })
    }

    // -----------------------------------------------------------------------
    // Process-level operations
    // -----------------------------------------------------------------------

    /// Creates a session. See [`SessionRegistry::create`].
    pub fn create_session(&self, domain: &str, seed: i64) -> CreateOutcome {
        self.record(CREATE_OPERATION, vec![domain.to_string(), seed.to_string()]);
        self.registry.create(domain, Seed::new(seed))
    }

    /// Returns the immutable attributes of a session.
    pub fn session_summary(&self, session_id: &str) -> Result<SessionSummary, ControlError> {
        self.record(SUMMARY_OPERATION, vec![session_id.to_string()]);
        self.registry
            .get(session_id, SUMMARY_OPERATION, "")
            .map(|session| session.summary())
    }

    /// Records a call whose raw arguments could not be decoded and returns
    /// the matching [`ControlError::InvalidArgument`].
    ///
    /// `raw` holds the values exactly as received, session id first for
    /// session-scoped operations.
    pub fn reject_arguments(
        &self,
        operation: &str,
        session_id: Option<&str>,
        raw: Vec<String>,
        message: String,
    ) -> ControlError {
        debug!(operation, ?raw, %message, "rejecting undecodable arguments");
        let args = raw.join(" ");
        self.record(operation, raw);
        ControlError::InvalidArgument {
            session_id: session_id.map(str::to_string),
            operation: operation.to_string(),
            args,
            message,
        }
    }

    /// Starts a new instrumentation-log epoch.
    pub fn rotate_log(&self) -> Result<u64, ControlError> {
        self.log.rotate().map_err(|error| ControlError::LogRotation {
            message: error.to_string(),
        })
    }

    // -----------------------------------------------------------------------
    // Instance and memory
    // -----------------------------------------------------------------------

    pub fn describe(&self, session_id: &str) -> Result<String, ControlError> {
        self.dispatch(session_id, &Operation::Describe, |domain| Ok(domain.describe()))
    }

    pub fn number_of_instances(&self, session_id: &str) -> Result<usize, ControlError> {
        self.dispatch(session_id, &Operation::NumberOfInstances, |domain| {
            Ok(domain.number_of_instances())
        })
    }

    pub fn load_instance(&self, session_id: &str, instance: InstanceIndex) -> Result<(), ControlError> {
        self.dispatch(session_id, &Operation::LoadInstance { instance }, |domain| {
            domain.load_instance(instance)
        })
    }

    pub fn set_memory_size(&self, session_id: &str, size: usize) -> Result<(), ControlError> {
        self.dispatch(session_id, &Operation::SetMemorySize { size }, |domain| {
            domain.set_memory_size(size)
        })
    }

    // -----------------------------------------------------------------------
    // Search parameters
    // -----------------------------------------------------------------------

    pub fn depth_of_search(&self, session_id: &str) -> Result<f64, ControlError> {
        self.dispatch(session_id, &Operation::GetDepthOfSearch, |domain| {
            Ok(domain.depth_of_search())
        })
    }

    /// No range check here; the capability decides what to do with `value`.
    pub fn set_depth_of_search(&self, session_id: &str, value: f64) -> Result<(), ControlError> {
        self.dispatch(session_id, &Operation::SetDepthOfSearch { value }, |domain| {
            domain.set_depth_of_search(value)
        })
    }

    pub fn intensity_of_mutation(&self, session_id: &str) -> Result<f64, ControlError> {
        self.dispatch(session_id, &Operation::GetIntensityOfMutation, |domain| {
            Ok(domain.intensity_of_mutation())
        })
    }

    pub fn set_intensity_of_mutation(&self, session_id: &str, value: f64) -> Result<(), ControlError> {
        self.dispatch(
            session_id,
            &Operation::SetIntensityOfMutation { value },
            |domain| domain.set_intensity_of_mutation(value),
        )
    }

    // -----------------------------------------------------------------------
    // Solutions
    // -----------------------------------------------------------------------

    pub fn initialise_solution(&self, session_id: &str, slot: SlotIndex) -> Result<(), ControlError> {
        self.dispatch(session_id, &Operation::InitialiseSolution { slot }, |domain| {
            domain.initialise_solution(slot)
        })
    }

    /// Applies `heuristic` to `source`, overwriting `destination`.
    pub fn apply_heuristic(
        &self,
        session_id: &str,
        heuristic: HeuristicId,
        source: SlotIndex,
        destination: SlotIndex,
    ) -> Result<f64, ControlError> {
        let operation = Operation::ApplyHeuristic {
            heuristic,
            source,
            destination,
        };
        self.dispatch(session_id, &operation, |domain| {
            domain.apply_heuristic(heuristic, source, destination)
        })
    }

    /// Applies a two-parent `heuristic` to `first` and `second`, overwriting `destination`.
    pub fn apply_heuristic_pair(
        &self,
        session_id: &str,
        heuristic: HeuristicId,
        first: SlotIndex,
        second: SlotIndex,
        destination: SlotIndex,
    ) -> Result<f64, ControlError> {
        let operation = Operation::ApplyHeuristicPair {
            heuristic,
            first,
            second,
            destination,
        };
        self.dispatch(session_id, &operation, |domain| {
            domain.apply_heuristic_pair(heuristic, first, second, destination)
        })
    }

    pub fn copy_solution(
        &self,
        session_id: &str,
        source: SlotIndex,
        destination: SlotIndex,
    ) -> Result<(), ControlError> {
        let operation = Operation::CopySolution {
            source,
            destination,
        };
        self.dispatch(session_id, &operation, |domain| {
            domain.copy_solution(source, destination)
        })
    }

    pub fn compare_solutions(
        &self,
        session_id: &str,
        first: SlotIndex,
        second: SlotIndex,
    ) -> Result<bool, ControlError> {
        self.dispatch(
            session_id,
            &Operation::CompareSolutions { first, second },
            |domain| domain.compare_solutions(first, second),
        )
    }

    pub fn solution_to_string(&self, session_id: &str, slot: SlotIndex) -> Result<String, ControlError> {
        self.dispatch(session_id, &Operation::SolutionToString { slot }, |domain| {
            domain.solution_to_string(slot)
        })
    }

    pub fn function_value(&self, session_id: &str, slot: SlotIndex) -> Result<f64, ControlError> {
        self.dispatch(session_id, &Operation::FunctionValue { slot }, |domain| {
            domain.function_value(slot)
        })
    }

    pub fn best_solution_to_string(&self, session_id: &str) -> Result<String, ControlError> {
        self.dispatch(session_id, &Operation::BestSolutionToString, |domain| {
            Ok(domain.best_solution_to_string())
        })
    }

    pub fn best_solution_value(&self, session_id: &str) -> Result<f64, ControlError> {
        self.dispatch(session_id, &Operation::BestSolutionValue, |domain| {
            Ok(domain.best_solution_value())
        })
    }

    // -----------------------------------------------------------------------
    // Heuristic metadata
    // -----------------------------------------------------------------------

    /// Heuristics tagged `heuristic_type`.
    ///
    /// An unrecognised tag, or a domain with no answer, yields an empty list.
    pub fn heuristics_of_type(
        &self,
        session_id: &str,
        heuristic_type: &str,
    ) -> Result<Vec<HeuristicId>, ControlError> {
        let operation = Operation::HeuristicsOfType {
            heuristic_type: heuristic_type.to_string(),
        };
        let parsed = HeuristicType::parse(heuristic_type);
        if parsed.is_none() {
            debug!(session_id, heuristic_type, "unknown heuristic type tag");
        }
        self.dispatch(session_id, &operation, |domain| {
            Ok(parsed
                .and_then(|t| domain.heuristics_of_type(t))
                .unwrap_or_default())
        })
    }

    pub fn heuristics_using_intensity_of_mutation(
        &self,
        session_id: &str,
    ) -> Result<Vec<HeuristicId>, ControlError> {
        self.dispatch(
            session_id,
            &Operation::HeuristicsUsingIntensityOfMutation,
            |domain| Ok(domain.heuristics_using_intensity_of_mutation().unwrap_or_default()),
        )
    }

    pub fn heuristics_using_depth_of_search(
        &self,
        session_id: &str,
    ) -> Result<Vec<HeuristicId>, ControlError> {
        self.dispatch(session_id, &Operation::HeuristicsUsingDepthOfSearch, |domain| {
            Ok(domain.heuristics_using_depth_of_search().unwrap_or_default())
        })
    }

    pub fn number_of_heuristics(&self, session_id: &str) -> Result<usize, ControlError> {
        self.dispatch(session_id, &Operation::NumberOfHeuristics, |domain| {
            Ok(domain.number_of_heuristics())
        })
    }

    pub fn heuristic_call_record(&self, session_id: &str) -> Result<Vec<u64>, ControlError> {
        self.dispatch(session_id, &Operation::HeuristicCallRecord, |domain| {
            Ok(domain.heuristic_call_record())
        })
    }

    pub fn heuristic_call_time_record(&self, session_id: &str) -> Result<Vec<u64>, ControlError> {
        self.dispatch(session_id, &Operation::HeuristicCallTimeRecord, |domain| {
            Ok(domain.heuristic_call_time_record())
        })
    }

    // -----------------------------------------------------------------------
    // Generic routing
    // -----------------------------------------------------------------------

    /// Routes `operation` to its typed entry point and wraps the result.
    pub fn execute(&self, session_id: &str, operation: Operation) -> Result<Outcome, ControlError> {
        let id = session_id;
        Ok(match operation {
            Operation::Describe => Outcome::Text(self.describe(id)?),
            Operation::NumberOfInstances => Outcome::Count(self.number_of_instances(id)?),
            Operation::LoadInstance { instance } => {
                self.load_instance(id, instance)?;
                Outcome::Done
            }
            Operation::SetMemorySize { size } => {
                self.set_memory_size(id, size)?;
                Outcome::Done
            }
            Operation::GetDepthOfSearch => Outcome::Number(self.depth_of_search(id)?),
            Operation::SetDepthOfSearch { value } => {
                self.set_depth_of_search(id, value)?;
                Outcome::Done
            }
            Operation::GetIntensityOfMutation => Outcome::Number(self.intensity_of_mutation(id)?),
            Operation::SetIntensityOfMutation { value } => {
                self.set_intensity_of_mutation(id, value)?;
                Outcome::Done
            }
            Operation::InitialiseSolution { slot } => {
                self.initialise_solution(id, slot)?;
                Outcome::Done
            }
            Operation::ApplyHeuristic {
                heuristic,
                source,
                destination,
            } => Outcome::Number(self.apply_heuristic(id, heuristic, source, destination)?),
            Operation::ApplyHeuristicPair {
                heuristic,
                first,
                second,
                destination,
            } => Outcome::Number(self.apply_heuristic_pair(id, heuristic, first, second, destination)?),
            Operation::CopySolution {
                source,
                destination,
            } => {
                self.copy_solution(id, source, destination)?;
                Outcome::Done
            }
            Operation::CompareSolutions { first, second } => {
                Outcome::Flag(self.compare_solutions(id, first, second)?)
            }
            Operation::SolutionToString { slot } => Outcome::Text(self.solution_to_string(id, slot)?),
            Operation::FunctionValue { slot } => Outcome::Number(self.function_value(id, slot)?),
            Operation::BestSolutionToString => Outcome::Text(self.best_solution_to_string(id)?),
            Operation::BestSolutionValue => Outcome::Number(self.best_solution_value(id)?),
            Operation::HeuristicsOfType { heuristic_type } => {
                Outcome::Heuristics(self.heuristics_of_type(id, &heuristic_type)?)
            }
            Operation::HeuristicsUsingIntensityOfMutation => {
                Outcome::Heuristics(self.heuristics_using_intensity_of_mutation(id)?)
            }
            Operation::HeuristicsUsingDepthOfSearch => {
                Outcome::Heuristics(self.heuristics_using_depth_of_search(id)?)
            }
            Operation::NumberOfHeuristics => Outcome::Count(self.number_of_heuristics(id)?),
            Operation::HeuristicCallRecord => Outcome::Counters(self.heuristic_call_record(id)?),
            Operation::HeuristicCallTimeRecord => {
                Outcome::Counters(self.heuristic_call_time_record(id)?)
            }
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("epoch", &self.log.epoch())
            .finish()
    }
}
