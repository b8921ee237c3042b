//! HTTP service facade for Heurist.
//!
//! Exposes every control-plane operation as one HTTP route so that clients in
//! any language can drive sessions remotely. Requests are turned into
//! [`control::Operation`] values and handed to a [`LocalControlPlane`], which
//! runs the capability call on the blocking thread pool.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Implements [`control::ControlPlane`] in-process and
//! translates [`control::ControlError`] into HTTP status codes. Holds no
//! business rules of its own.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`error`] | `ApiError`: error → status mapping and JSON body |
//! | [`plane`] | `LocalControlPlane`: `ControlPlane` over a `Dispatcher` |
//! | [`routes`] | The axum `Router` and one handler per route |

pub mod error;
pub mod plane;
pub mod routes;

pub use error::ApiError;
pub use plane::LocalControlPlane;
pub use routes::{router, EpochResponse, HealthResponse};

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

/// Serves `app` on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish before this returns.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "control plane listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!(%addr, "control plane stopped");
    Ok(())
}
