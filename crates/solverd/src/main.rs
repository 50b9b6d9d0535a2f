//! solverd — the solver controller daemon.
//!
//! Assembles the controller:
//! - Solver directory client (metadata enrichment)
//! - Reconciler against the cluster (or in memory with `--dry-run`)
//! - Dispatcher + AMQP consume loop on the control queue
//! - HTTP API (health, version, status, metrics)
//!
//! # Usage
//!
//! ```text
//! solverd run --http-port 8080          # settings from the environment
//! solverd render --solver-id 42 --vcpus 4 --image registry/chuffed:1.2 --name chuffed
//! ```

mod args;
mod render;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use solver_api::{ServiceInfo, build_router};
use solver_core::{SolverMetadata, WorkerIdentity};
use solver_dispatch::{AmqpConnector, ControlConsumer, DispatchStats, Dispatcher};
use solver_metadata::HttpSolverDirectory;
use solver_reconcile::{InMemoryResourceApi, KubeResourceApi, Reconciler, ResourceApi};

use crate::args::ControllerArgs;

const DEFAULT_FILTER: &str = "info,solverd=debug,solver=debug";

#[derive(Parser)]
#[command(name = "solverd", version, about = "Solver controller daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    /// Debug logging when RUST_LOG is unset.
    #[arg(long, env = "DEBUG", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Consume the control queue and route requests to workers.
    Run {
        #[command(flatten)]
        controller: ControllerArgs,

        /// Port for the HTTP API.
        #[arg(long, env = "HTTP_PORT", default_value = "8080")]
        http_port: u16,

        /// Keep created resources in memory instead of the cluster.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the deployment and scaled object for one worker as JSON.
    Render {
        #[command(flatten)]
        controller: ControllerArgs,

        #[arg(long)]
        solver_id: u64,

        #[arg(long)]
        vcpus: u32,

        /// Worker image reference.
        #[arg(long)]
        image: String,

        /// Solver display name.
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json, cli.debug);

    match cli.command {
        Command::Run {
            controller,
            http_port,
            dry_run,
        } => run(controller, http_port, dry_run).await,
        Command::Render {
            controller,
            solver_id,
            vcpus,
            image,
            name,
        } => {
            anyhow::ensure!(vcpus > 0, "--vcpus must be at least 1");
            let config = controller.into_config().context("invalid configuration")?;
            let identity = WorkerIdentity { solver_id, vcpus };
            let solver = SolverMetadata {
                name,
                image_ref: image,
            };
            let list = render::render_manifests(&config, identity, &solver)?;
            println!("{}", serde_json::to_string_pretty(&list)?);
            Ok(())
        }
    }
}

fn init_tracing(json: bool, debug: bool) {
    let default = if debug { "debug" } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(controller: ControllerArgs, http_port: u16, dry_run: bool) -> anyhow::Result<()> {
    let config = controller.into_config().context("invalid configuration")?;
    info!(
        tenant = %config.tenant,
        namespace = %config.namespace,
        control_queue = %config.control_queue,
        broker = ?config.broker,
        "solver controller starting"
    );

    // ── Components ─────────────────────────────────────────────

    let stats = Arc::new(DispatchStats::new());

    let directory = HttpSolverDirectory::from_config(&config)?;
    info!(url = %config.solver_directory_url, "solver directory client ready");

    let api: Arc<dyn ResourceApi> = if dry_run {
        warn!("dry run: resources are kept in memory, nothing is created in the cluster");
        Arc::new(InMemoryResourceApi::new())
    } else {
        let kube = KubeResourceApi::try_default()
            .await
            .context("failed to connect to the cluster")?;
        info!(namespace = %config.namespace, "cluster client ready");
        Arc::new(kube)
    };

    let dispatcher = Dispatcher::new(
        &config,
        Arc::new(directory),
        Reconciler::new(api),
        stats.clone(),
    )?;
    let connector = AmqpConnector::new(&config)?;
    let consumer = ControlConsumer::new(Arc::new(connector), &config, stats.clone());

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Background tasks ───────────────────────────────────────

    let consumer_shutdown = shutdown_rx.clone();
    let consumer_handle = tokio::spawn(async move {
        consumer.run(&dispatcher, consumer_shutdown).await;
    });

    let router = build_router(
        ServiceInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            tenant: config.tenant.clone(),
            control_queue: config.control_queue.clone(),
        },
        stats,
    );
    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "API server starting");

    let mut server_shutdown = shutdown_rx.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .await
    });

    let server_result = tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received");
            None
        }
        result = &mut server => Some(result),
    };

    let _ = shutdown_tx.send(true);
    let _ = consumer_handle.await;

    match server_result {
        Some(result) => {
            let outcome = result.context("API server task failed")?;
            if let Err(e) = &outcome {
                error!(error = %e, "API server stopped");
            }
            outcome?;
        }
        None => server.await??,
    }

    info!("solver controller stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
