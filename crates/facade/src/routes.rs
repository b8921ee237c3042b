//! Route table.
//!
//! One route per control-plane operation. Path segments carry every argument;
//! successful responses are the serialised [`Outcome`] (or [`CreateOutcome`],
//! [`SessionSummary`], [`EpochResponse`] for the process-level routes).

use std::fmt::Display;
use std::str::FromStr;

use axum::async_trait;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use control::dispatcher::CREATE_OPERATION;
use control::{
    ControlError, ControlPlane, CreateOutcome, HeuristicId, InstanceIndex, Operation, Outcome,
    SessionSummary, SlotIndex,
};
use serde::{Deserialize, Serialize};

use crate::{ApiError, LocalControlPlane};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Body of a successful log rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochResponse {
    pub epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub sessions: usize,
}

/// Builds the facade router over `plane`.
pub fn router(plane: LocalControlPlane) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/instantiate/:problem_type/:seed", put(instantiate))
        .route("/sessions/:id", get(session_summary))
        .route("/changelog", get(rotate_log).post(rotate_log))
        .route("/memorySize/:id/:size", post(set_memory_size))
        .route("/toString/:id", get(describe))
        .route("/instances/:id", get(number_of_instances))
        .route("/instance/:id/:instance", post(load_instance))
        .route("/search/depth/:id", get(depth_of_search))
        .route("/search/depth/:id/:value", post(set_depth_of_search))
        .route("/mutationIntensity/:id", get(intensity_of_mutation))
        .route("/mutationIntensity/:id/:value", post(set_intensity_of_mutation))
        .route("/heuristic/record/call/:id", get(heuristic_call_record))
        .route("/heuristic/record/callTime/:id", get(heuristic_call_time_record))
        .route("/heuristic/type/:id", get(heuristics_of_type))
        .route("/heuristic/type/:id/:heuristic_type", get(heuristics_of_type))
        .route(
            "/heuristic/mutationIntensity/:id",
            get(heuristics_using_intensity_of_mutation),
        )
        .route("/heuristic/depth/:id", get(heuristics_using_depth_of_search))
        .route("/heuristic/num/:id", get(number_of_heuristics))
        .route("/heuristic/apply/:id/:heuristic/:a/:b", post(apply_heuristic))
        .route("/heuristic/apply/:id/:heuristic/:a/:b/:c", post(apply_heuristic_pair))
        .route("/solution/init/:id/:slot", put(initialise_solution))
        .route("/solution/best/toString/:id", get(best_solution_to_string))
        .route("/solution/best/value/:id", get(best_solution_value))
        .route("/solution/copy/:id/:source/:destination", post(copy_solution))
        .route("/solution/toString/:id/:slot", get(solution_to_string))
        .route("/solution/functionValue/:id/:slot", get(function_value))
        .route("/solution/compare/:id/:first/:second", get(compare_solutions))
        .with_state(plane)
}

/// Path parameters in route order, percent-decoded but not yet typed.
///
/// Typing happens in the handler so a value that does not decode can still be
/// written to the instrumentation log under the operation it was meant for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawArgs(Vec<String>);

impl RawArgs {
    /// The session id; every session-scoped route captures it first.
    fn id(&self) -> &str {
        self.raw(0)
    }

    fn raw(&self, index: usize) -> &str {
        self.0.get(index).map_or("", String::as_str)
    }

    fn parse<T>(&self, index: usize) -> Result<T, String>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.raw(index);
        raw.parse()
            .map_err(|err| format!("argument {index} ({raw:?}): {err}"))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RawArgs {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<Vec<(String, String)>>::from_request_parts(parts, state).await {
            Ok(Path(params)) => Ok(Self(params.into_iter().map(|(_, value)| value).collect())),
            // Only segments that are not valid UTF-8 after decoding land here;
            // there is no operation to log them under.
            Err(rejection) => Err(ApiError(ControlError::InvalidArgument {
                session_id: None,
                operation: parts.uri.path().to_string(),
                args: String::new(),
                message: rejection.body_text(),
            })),
        }
    }
}

async fn run(plane: &LocalControlPlane, session_id: &str, operation: Operation) -> ApiResult<Outcome> {
    Ok(Json(plane.execute(session_id, operation).await?))
}

/// Decodes the typed arguments of `operation` with `build`, then runs it.
/// A decode failure is logged and answered with
/// [`ControlError::InvalidArgument`].
async fn run_typed<F>(
    plane: &LocalControlPlane,
    operation: &'static str,
    args: RawArgs,
    build: F,
) -> ApiResult<Outcome>
where
    F: FnOnce(&RawArgs) -> Result<Operation, String>,
{
    match build(&args) {
        Ok(typed) => run(plane, args.id(), typed).await,
        Err(message) => {
            let id = args.id().to_string();
            Err(plane
                .reject_arguments(operation, Some(&id), args.0, message)
                .await
                .into())
        }
    }
}

// ---------------------------------------------------------------------------
// Process-level routes
// ---------------------------------------------------------------------------

async fn health(State(plane): State<LocalControlPlane>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: plane.dispatcher().registry().len(),
    })
}

async fn instantiate(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<CreateOutcome> {
    match args.parse::<i64>(1) {
        Ok(seed) => Ok(Json(plane.create_session(args.raw(0), seed).await?)),
        Err(message) => Err(plane
            .reject_arguments(CREATE_OPERATION, None, args.0, message)
            .await
            .into()),
    }
}

async fn session_summary(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<SessionSummary> {
    Ok(Json(plane.session_summary(args.id()).await?))
}

async fn rotate_log(State(plane): State<LocalControlPlane>) -> ApiResult<EpochResponse> {
    let epoch = plane.rotate_log().await?;
    Ok(Json(EpochResponse { epoch }))
}

// ---------------------------------------------------------------------------
// Instance, memory and search parameters
// ---------------------------------------------------------------------------

async fn set_memory_size(State(plane): State<LocalControlPlane>, args: RawArgs) -> ApiResult<Outcome> {
    run_typed(&plane, "setMemorySize", args, |a| {
        Ok(Operation::SetMemorySize { size: a.parse(1)? })
    })
    .await
}

async fn describe(State(plane): State<LocalControlPlane>, args: RawArgs) -> ApiResult<Outcome> {
    run(&plane, args.id(), Operation::Describe).await
}

async fn number_of_instances(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run(&plane, args.id(), Operation::NumberOfInstances).await
}

async fn load_instance(State(plane): State<LocalControlPlane>, args: RawArgs) -> ApiResult<Outcome> {
    run_typed(&plane, "loadInstance", args, |a| {
        Ok(Operation::LoadInstance {
            instance: InstanceIndex::new(a.parse(1)?),
        })
    })
    .await
}

async fn depth_of_search(State(plane): State<LocalControlPlane>, args: RawArgs) -> ApiResult<Outcome> {
    run(&plane, args.id(), Operation::GetDepthOfSearch).await
}

async fn set_depth_of_search(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run_typed(&plane, "setDepthOfSearch", args, |a| {
        Ok(Operation::SetDepthOfSearch { value: a.parse(1)? })
    })
    .await
}

async fn intensity_of_mutation(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run(&plane, args.id(), Operation::GetIntensityOfMutation).await
}

async fn set_intensity_of_mutation(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run_typed(&plane, "setIntensityOfMutation", args, |a| {
        Ok(Operation::SetIntensityOfMutation { value: a.parse(1)? })
    })
    .await
}

// ---------------------------------------------------------------------------
// Heuristics
// ---------------------------------------------------------------------------

async fn heuristic_call_record(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run(&plane, args.id(), Operation::HeuristicCallRecord).await
}

async fn heuristic_call_time_record(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run(&plane, args.id(), Operation::HeuristicCallTimeRecord).await
}

/// Serves both `/heuristic/type/{id}/{type}` and `/heuristic/type/{id}`; the
/// latter is an empty type tag.
async fn heuristics_of_type(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    let heuristic_type = args.raw(1).to_string();
    run(&plane, args.id(), Operation::HeuristicsOfType { heuristic_type }).await
}

async fn heuristics_using_intensity_of_mutation(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run(&plane, args.id(), Operation::HeuristicsUsingIntensityOfMutation).await
}

async fn heuristics_using_depth_of_search(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run(&plane, args.id(), Operation::HeuristicsUsingDepthOfSearch).await
}

async fn number_of_heuristics(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run(&plane, args.id(), Operation::NumberOfHeuristics).await
}

async fn apply_heuristic(State(plane): State<LocalControlPlane>, args: RawArgs) -> ApiResult<Outcome> {
    run_typed(&plane, "applyHeuristic", args, |a| {
        Ok(Operation::ApplyHeuristic {
            heuristic: HeuristicId::new(a.parse(1)?),
            source: SlotIndex::new(a.parse(2)?),
            destination: SlotIndex::new(a.parse(3)?),
        })
    })
    .await
}

async fn apply_heuristic_pair(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run_typed(&plane, "applyHeuristic", args, |a| {
        Ok(Operation::ApplyHeuristicPair {
            heuristic: HeuristicId::new(a.parse(1)?),
            first: SlotIndex::new(a.parse(2)?),
            second: SlotIndex::new(a.parse(3)?),
            destination: SlotIndex::new(a.parse(4)?),
        })
    })
    .await
}

// ---------------------------------------------------------------------------
// Solutions
// ---------------------------------------------------------------------------

async fn initialise_solution(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run_typed(&plane, "initialiseSolution", args, |a| {
        Ok(Operation::InitialiseSolution {
            slot: SlotIndex::new(a.parse(1)?),
        })
    })
    .await
}

async fn best_solution_to_string(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run(&plane, args.id(), Operation::BestSolutionToString).await
}

async fn best_solution_value(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run(&plane, args.id(), Operation::BestSolutionValue).await
}

async fn copy_solution(State(plane): State<LocalControlPlane>, args: RawArgs) -> ApiResult<Outcome> {
    run_typed(&plane, "copySolution", args, |a| {
        Ok(Operation::CopySolution {
            source: SlotIndex::new(a.parse(1)?),
            destination: SlotIndex::new(a.parse(2)?),
        })
    })
    .await
}

async fn solution_to_string(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run_typed(&plane, "getSolutionToString", args, |a| {
        Ok(Operation::SolutionToString {
            slot: SlotIndex::new(a.parse(1)?),
        })
    })
    .await
}

async fn function_value(State(plane): State<LocalControlPlane>, args: RawArgs) -> ApiResult<Outcome> {
    run_typed(&plane, "getFunctionValue", args, |a| {
        Ok(Operation::FunctionValue {
            slot: SlotIndex::new(a.parse(1)?),
        })
    })
    .await
}

async fn compare_solutions(
    State(plane): State<LocalControlPlane>,
    args: RawArgs,
) -> ApiResult<Outcome> {
    run_typed(&plane, "compareSolutions", args, |a| {
        Ok(Operation::CompareSolutions {
            first: SlotIndex::new(a.parse(1)?),
            second: SlotIndex::new(a.parse(2)?),
        })
    })
    .await
}
