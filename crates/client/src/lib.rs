//! Remote control plane for Heurist.
//!
//! [`HttpControlPlane`] implements [`control::ControlPlane`] against a running
//! facade, so code written against the trait drives a remote process exactly
//! as it would drive an in-process one.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport and response decoding live here.
//! Server-side failures arrive as serialised [`ControlError`] bodies and are
//! returned unchanged; anything that is not a control-plane response becomes
//! [`ControlError::Unavailable`].

use std::time::Duration;

use async_trait::async_trait;
use control::{ControlError, ControlPlane, CreateOutcome, Operation, Outcome, SessionSummary};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Failures constructing a client. Request-time failures are [`ControlError`]s.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid control plane URL {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("HTTP client could not be initialised: {0}")]
    Http(#[from] reqwest::Error),
}

/// Liveness report of a remote control plane.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Health {
    pub status: String,
    pub sessions: usize,
}

#[derive(Deserialize)]
struct Epoch {
    epoch: u64,
}

/// A [`ControlPlane`] reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    base: Url,
    http: reqwest::Client,
}

impl HttpControlPlane {
    /// Creates a client for the facade rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error when `base_url` is not an absolute `http(s)` URL or the
    /// HTTP client cannot be initialised.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let invalid = |message: String| ClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            message,
        };
        let base = Url::parse(base_url).map_err(|error| invalid(error.to_string()))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("expected an http or https URL".to_string()));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(base, http))
    }

    /// Uses a preconfigured [`reqwest::Client`].
    pub fn with_client(base: Url, http: reqwest::Client) -> Self {
        Self { base, http }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Immutable attributes of a live session.
    pub async fn session_summary(&self, session_id: &str) -> Result<SessionSummary, ControlError> {
        self.send(Method::GET, &["sessions".to_string(), session_id.to_string()])
            .await
    }

    pub async fn health(&self) -> Result<Health, ControlError> {
        self.send(Method::GET, &["health".to_string()]).await
    }

    fn url(&self, segments: &[String]) -> Result<Url, ControlError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ControlError::Unavailable {
                message: format!("{} cannot carry a path", self.base),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[String],
    ) -> Result<T, ControlError> {
        let url = self.url(segments)?;
        debug!(%method, %url, "control plane request");

        let response = self
            .http
            .request(method, url)
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        let body = response.bytes().await.map_err(unavailable)?;
        if status.is_success() {
            return serde_json::from_slice(&body).map_err(|error| ControlError::Unavailable {
                message: format!("undecodable response ({status}): {error}"),
            });
        }

        match serde_json::from_slice::<ControlError>(&body) {
            Ok(error) => Err(error),
            Err(_) => Err(ControlError::Unavailable {
                message: format!("HTTP {status}: {}", String::from_utf8_lossy(&body)),
            }),
        }
    }
}

fn unavailable(error: reqwest::Error) -> ControlError {
    ControlError::Unavailable {
        message: error.to_string(),
    }
}

/// Method and path segments of the facade route serving `operation`.
///
/// Every session route is a fixed prefix, the session id, then the
/// operation's arguments in declaration order.
fn route(session_id: &str, operation: &Operation) -> (Method, Vec<String>) {
    let (method, prefix): (Method, &[&str]) = match operation {
        Operation::Describe => (Method::GET, &["toString"]),
        Operation::NumberOfInstances => (Method::GET, &["instances"]),
        Operation::LoadInstance { .. } => (Method::POST, &["instance"]),
        Operation::SetMemorySize { .. } => (Method::POST, &["memorySize"]),
        Operation::GetDepthOfSearch => (Method::GET, &["search", "depth"]),
        Operation::SetDepthOfSearch { .. } => (Method::POST, &["search", "depth"]),
        Operation::GetIntensityOfMutation => (Method::GET, &["mutationIntensity"]),
        Operation::SetIntensityOfMutation { .. } => (Method::POST, &["mutationIntensity"]),
        Operation::InitialiseSolution { .. } => (Method::PUT, &["solution", "init"]),
        Operation::ApplyHeuristic { .. } | Operation::ApplyHeuristicPair { .. } => {
            (Method::POST, &["heuristic", "apply"])
        }
        Operation::CopySolution { .. } => (Method::POST, &["solution", "copy"]),
        Operation::CompareSolutions { .. } => (Method::GET, &["solution", "compare"]),
        Operation::SolutionToString { .. } => (Method::GET, &["solution", "toString"]),
        Operation::FunctionValue { .. } => (Method::GET, &["solution", "functionValue"]),
        Operation::BestSolutionToString => (Method::GET, &["solution", "best", "toString"]),
        Operation::BestSolutionValue => (Method::GET, &["solution", "best", "value"]),
        Operation::HeuristicsOfType { .. } => (Method::GET, &["heuristic", "type"]),
        Operation::HeuristicsUsingIntensityOfMutation => {
            (Method::GET, &["heuristic", "mutationIntensity"])
        }
        Operation::HeuristicsUsingDepthOfSearch => (Method::GET, &["heuristic", "depth"]),
        Operation::NumberOfHeuristics => (Method::GET, &["heuristic", "num"]),
        Operation::HeuristicCallRecord => (Method::GET, &["heuristic", "record", "call"]),
        Operation::HeuristicCallTimeRecord => (Method::GET, &["heuristic", "record", "callTime"]),
    };

    // An empty argument (only ever a heuristic type tag) is left off; the
    // facade reads the shorter `/heuristic/type/{id}` route as an empty tag.
    let segments = prefix
        .iter()
        .map(|part| (*part).to_string())
        .chain(std::iter::once(session_id.to_string()))
        .chain(operation.args().into_iter().filter(|arg| !arg.is_empty()))
        .collect();
    (method, segments)
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn create_session(&self, domain: &str, seed: i64) -> Result<CreateOutcome, ControlError> {
        let segments = ["instantiate".to_string(), domain.to_string(), seed.to_string()];
        self.send(Method::PUT, &segments).await
    }

    async fn execute(&self, session_id: &str, operation: Operation) -> Result<Outcome, ControlError> {
        let (method, segments) = route(session_id, &operation);
        self.send(method, &segments).await
    }

    async fn rotate_log(&self) -> Result<u64, ControlError> {
        let epoch: Epoch = self.send(Method::POST, &["changelog".to_string()]).await?;
        Ok(epoch.epoch)
    }
}
