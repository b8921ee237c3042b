//! In-process [`ControlPlane`].
//!
//! Capability calls are synchronous and may be long-running, so every call is
//! moved onto tokio's blocking pool. The async executor only ever awaits the
//! join handle. A panic inside a capability call ends that call with
//! [`ControlError::Internal`]; the session stays registered.

use async_trait::async_trait;
use control::dispatcher::{CREATE_OPERATION, SUMMARY_OPERATION};
use control::{ControlError, ControlPlane, CreateOutcome, Dispatcher, Operation, Outcome, SessionSummary};
use tracing::error;

/// Log name used for rotation failures surfaced as [`ControlError::Internal`].
const ROTATE_OPERATION: &str = "changelog";

/// A [`ControlPlane`] that dispatches directly into this process.
#[derive(Debug, Clone)]
pub struct LocalControlPlane {
    dispatcher: Dispatcher,
}

impl LocalControlPlane {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Immutable attributes of a live session.
    pub async fn session_summary(&self, session_id: &str) -> Result<SessionSummary, ControlError> {
        let id = session_id.to_string();
        self.blocking(SUMMARY_OPERATION, Some(session_id), String::new(), move |dispatcher| {
            dispatcher.session_summary(&id)
        })
        .await
    }

    /// Records a call whose path arguments did not decode and returns the
    /// [`ControlError::InvalidArgument`] to send back.
    pub async fn reject_arguments(
        &self,
        operation: &'static str,
        session_id: Option<&str>,
        raw: Vec<String>,
        message: String,
    ) -> ControlError {
        let id = session_id.map(str::to_string);
        let args = raw.join(" ");
        let rejected = self
            .blocking(operation, session_id, args, move |dispatcher| {
                Ok(dispatcher.reject_arguments(operation, id.as_deref(), raw, message))
            })
            .await;
        match rejected {
            Ok(err) | Err(err) => err,
        }
    }

    async fn blocking<T, F>(
        &self,
        operation: &'static str,
        session_id: Option<&str>,
        args: String,
        call: F,
    ) -> Result<T, ControlError>
    where
        T: Send + 'static,
        F: FnOnce(Dispatcher) -> Result<T, ControlError> + Send + 'static,
    {
        let dispatcher = self.dispatcher.clone();
        match tokio::task::spawn_blocking(move || call(dispatcher)).await {
            Ok(result) => result,
            Err(join) => {
                error!(
                    operation,
                    session_id,
                    %args,
                    error = %join,
                    "capability call did not complete"
                );
                Err(ControlError::Internal {
                    session_id: session_id.map(str::to_string),
                    operation: operation.to_string(),
                    args,
                    message: join.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl ControlPlane for LocalControlPlane {
    async fn create_session(&self, domain: &str, seed: i64) -> Result<CreateOutcome, ControlError> {
        let args = format!("{domain} {seed}");
        let domain = domain.to_string();
        self.blocking(CREATE_OPERATION, None, args, move |dispatcher| {
            Ok(dispatcher.create_session(&domain, seed))
        })
        .await
    }

    async fn execute(&self, session_id: &str, operation: Operation) -> Result<Outcome, ControlError> {
        let id = session_id.to_string();
        let args = operation.args().join(" ");
        self.blocking(operation.name(), Some(session_id), args, move |dispatcher| {
            dispatcher.execute(&id, operation)
        })
        .await
    }

    async fn rotate_log(&self) -> Result<u64, ControlError> {
        self.blocking(ROTATE_OPERATION, None, String::new(), |dispatcher| {
            dispatcher.rotate_log()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use control::{
        CapabilityError, DomainCatalog, DomainKind, FnFactory, HeuristicId, HeuristicType,
        IdentityGenerator, InstanceIndex, MemoryLog, ProblemDomain, SessionRegistry, SlotIndex,
    };

    use super::*;

    fn plane_with(catalog: DomainCatalog) -> (LocalControlPlane, Arc<MemoryLog>) {
        let log = Arc::new(MemoryLog::new());
        let registry = Arc::new(SessionRegistry::new(catalog, IdentityGenerator::default()));
        let dispatcher = Dispatcher::new(registry, log.clone());
        (LocalControlPlane::new(dispatcher), log)
    }

    /// A domain whose solver crashes on every call that reaches it.
    struct Crashing;

    impl ProblemDomain for Crashing {
        fn set_memory_size(&mut self, _: usize) -> Result<(), CapabilityError> {
            panic!("solver crashed")
        }
        fn number_of_instances(&self) -> usize {
            panic!("solver crashed")
        }
        fn load_instance(&mut self, _: InstanceIndex) -> Result<(), CapabilityError> {
            panic!("solver crashed")
        }
        fn depth_of_search(&self) -> f64 {
            panic!("solver crashed")
        }
        fn set_depth_of_search(&mut self, _: f64) -> Result<(), CapabilityError> {
            panic!("solver crashed")
        }
        fn intensity_of_mutation(&self) -> f64 {
            panic!("solver crashed")
        }
        fn set_intensity_of_mutation(&mut self, _: f64) -> Result<(), CapabilityError> {
            panic!("solver crashed")
        }
        fn heuristic_call_record(&self) -> Vec<u64> {
            panic!("solver crashed")
        }
        fn heuristic_call_time_record(&self) -> Vec<u64> {
            panic!("solver crashed")
        }
        fn heuristics_of_type(&self, _: HeuristicType) -> Option<Vec<HeuristicId>> {
            panic!("solver crashed")
        }
        fn heuristics_using_intensity_of_mutation(&self) -> Option<Vec<HeuristicId>> {
            panic!("solver crashed")
        }
        fn heuristics_using_depth_of_search(&self) -> Option<Vec<HeuristicId>> {
            panic!("solver crashed")
        }
        fn number_of_heuristics(&self) -> usize {
            panic!("solver crashed")
        }
        fn apply_heuristic(
            &mut self,
            _: HeuristicId,
            _: SlotIndex,
            _: SlotIndex,
        ) -> Result<f64, CapabilityError> {
            panic!("solver crashed")
        }
        fn apply_heuristic_pair(
            &mut self,
            _: HeuristicId,
            _: SlotIndex,
            _: SlotIndex,
            _: SlotIndex,
        ) -> Result<f64, CapabilityError> {
            panic!("solver crashed")
        }
        fn initialise_solution(&mut self, _: SlotIndex) -> Result<(), CapabilityError> {
            panic!("solver crashed")
        }
        fn best_solution_to_string(&self) -> String {
            panic!("solver crashed")
        }
        fn best_solution_value(&self) -> f64 {
            panic!("solver crashed")
        }
        fn copy_solution(&mut self, _: SlotIndex, _: SlotIndex) -> Result<(), CapabilityError> {
            panic!("solver crashed")
        }
        fn solution_to_string(&self, _: SlotIndex) -> Result<String, CapabilityError> {
            panic!("solver crashed")
        }
        fn function_value(&self, _: SlotIndex) -> Result<f64, CapabilityError> {
            panic!("solver crashed")
        }
        fn compare_solutions(&self, _: SlotIndex, _: SlotIndex) -> Result<bool, CapabilityError> {
            panic!("solver crashed")
        }
        fn describe(&self) -> String {
            panic!("solver crashed")
        }
    }

    #[tokio::test]
    async fn test_create_and_execute_round_trip() {
        let (plane, log) = plane_with(DomainCatalog::with_stub_domains());

        let outcome = plane.create_session("SAT", 42).await.expect("create");
        let id = outcome.session_id().expect("created").clone();

        plane
            .execute(id.as_str(), Operation::SetMemorySize { size: 2 })
            .await
            .expect("memory size");
        plane
            .execute(id.as_str(), Operation::InitialiseSolution { slot: SlotIndex::new(0) })
            .await
            .expect("init");
        let value = plane
            .execute(id.as_str(), Operation::FunctionValue { slot: SlotIndex::new(0) })
            .await
            .expect("value");
        assert!(value.as_number().is_some());

        let summary = plane.session_summary(id.as_str()).await.expect("summary");
        assert_eq!(summary.domain, DomainKind::Sat);

        let lines = log.all_lines();
        assert_eq!(lines[0], "instantiateProblemDomain SAT 42");
        assert_eq!(lines[1], format!("setMemorySize {id} 2"));
    }

    #[tokio::test]
    async fn test_rejection_is_not_an_error() {
        let (plane, _) = plane_with(DomainCatalog::with_stub_domains());
        let outcome = plane.create_session("NotARealDomain", 1).await.expect("soft reject");
        assert_eq!(outcome.as_text(), "Problem domain NotARealDomain not known.");
    }

    #[tokio::test]
    async fn test_panicking_capability_becomes_internal_error() {
        let mut catalog = DomainCatalog::new();
        catalog.register(FnFactory::new(DomainKind::Tsp, |_| {
            Box::new(Crashing) as Box<dyn ProblemDomain>
        }));
        let (plane, _) = plane_with(catalog);
        let id = plane
            .create_session("TSP", 7)
            .await
            .expect("create")
            .session_id()
            .expect("created")
            .clone();

        let err = plane
            .execute(id.as_str(), Operation::Describe)
            .await
            .unwrap_err();
        match err {
            ControlError::Internal {
                session_id,
                operation,
                args,
                ..
            } => {
                assert_eq!(session_id.as_deref(), Some(id.as_str()));
                assert_eq!(operation, "toString");
                assert_eq!(args, "");
            }
            other => panic!("unexpected error {other:?}"),
        }

        let err = plane
            .execute(
                id.as_str(),
                Operation::CopySolution {
                    source: SlotIndex::new(1),
                    destination: SlotIndex::new(0),
                },
            )
            .await
            .unwrap_err();
        match err {
            ControlError::Internal {
                session_id,
                operation,
                args,
                ..
            } => {
                assert_eq!(session_id.as_deref(), Some(id.as_str()));
                assert_eq!(operation, "copySolution");
                assert_eq!(args, "1 0");
            }
            other => panic!("unexpected error {other:?}"),
        }

        // The session survives and its lock was released.
        assert!(plane.session_summary(id.as_str()).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_arguments_are_logged() {
        let (plane, log) = plane_with(DomainCatalog::with_stub_domains());
        let err = plane
            .reject_arguments(
                "setMemorySize",
                Some("abc"),
                vec!["abc".to_string(), "-1".to_string()],
                "bad size".to_string(),
            )
            .await;

        assert_eq!(
            err,
            ControlError::InvalidArgument {
                session_id: Some("abc".to_string()),
                operation: "setMemorySize".to_string(),
                args: "abc -1".to_string(),
                message: "bad size".to_string(),
            }
        );
        assert_eq!(log.all_lines(), vec!["setMemorySize abc -1"]);
    }

    #[tokio::test]
    async fn test_rotation_reports_new_epoch() {
        let (plane, _) = plane_with(DomainCatalog::with_stub_domains());
        assert_eq!(plane.rotate_log().await.expect("rotate"), 1);
        assert_eq!(plane.rotate_log().await.expect("rotate"), 2);
    }
}
