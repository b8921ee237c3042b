//! Heurist CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: flags with `HEURIST_*` environment fallbacks
//!    (see [`config`]).
//! 2. **Wire observability**: `tracing-subscriber` with a text or JSON layer
//!    and an optional OpenTelemetry OTLP exporter (see [`telemetry`]).
//! 3. **Construct infrastructure**: the file journal, the domain catalog, the
//!    session registry and dispatcher, and the HTTP facade.
//! 4. **Run the selected subcommand**: `serve` hosts the control plane until
//!    Ctrl+C or SIGTERM; `create`, `rotate` and `health` drive a running one
//!    through [`client::HttpControlPlane`].

mod config;
mod telemetry;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use client::HttpControlPlane;
use control::{
    ControlPlane, CreateOutcome, Dispatcher, DomainCatalog, IdentityGenerator, SessionRegistry,
};
use facade::LocalControlPlane;
use journal::FileJournal;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::config::{Cli, Command, CreateArgs, RemoteArgs, ServeArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _telemetry = telemetry::init(&cli.logging)?;

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Create(args) => create(args).await,
        Command::Rotate(args) => rotate(args).await,
        Command::Health(args) => health(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let journal = Arc::new(
        FileJournal::open(args.journal_config()).context("failed to open instrumentation log")?,
    );

    let catalog = if args.stub_domains {
        DomainCatalog::with_stub_domains()
    } else {
        DomainCatalog::new()
    };
    if catalog.is_empty() {
        warn!("no problem domains registered; every create request will be rejected");
    } else {
        info!(domains = ?catalog.kinds(), "problem domains registered");
    }

    let registry = Arc::new(SessionRegistry::new(
        catalog,
        IdentityGenerator::new(args.id_salt.clone()),
    ));
    let plane = LocalControlPlane::new(Dispatcher::new(registry, journal.clone()));

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    facade::serve(listener, facade::router(plane), shutdown_signal())
        .await
        .context("control plane server failed")?;

    journal
        .close()
        .context("failed to close instrumentation log")?;
    Ok(())
}

async fn create(args: CreateArgs) -> Result<()> {
    let plane = remote(&args.remote)?;
    match plane.create_session(&args.kind, args.seed).await? {
        CreateOutcome::Created { session_id } => {
            println!("{session_id}");
            Ok(())
        }
        CreateOutcome::Rejected { message } => bail!(message),
    }
}

async fn rotate(args: RemoteArgs) -> Result<()> {
    let epoch = remote(&args)?.rotate_log().await?;
    println!("{epoch}");
    Ok(())
}

async fn health(args: RemoteArgs) -> Result<()> {
    let health = remote(&args)?.health().await?;
    println!("{} ({} sessions)", health.status, health.sessions);
    Ok(())
}

fn remote(args: &RemoteArgs) -> Result<HttpControlPlane> {
    HttpControlPlane::new(&args.url).context("failed to construct control plane client")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(error = %error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                warn!(error = %error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, draining in-flight requests");
}
