// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use futures::StreamExt;
use kube::runtime::{reflector, watcher};
use kube::Client;
use kube_lease_manager::LeaseManagerBuilder;
use tracing::{error, info, warn};

use xrm_engine::constants::{
    METRICS_SERVER_BIND_ADDRESS, METRICS_SERVER_PATH, METRICS_SERVER_PORT, TOKIO_WORKER_THREADS,
};
use xrm_engine::context::{Context, Metrics, Stores};
use xrm_engine::crd::{Composition, CompositionRevision, Function};
use xrm_engine::manager::{self, EngineConfig};
use xrm_engine::metrics;

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("xrm-engine")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Respects `RUST_LOG` for verbosity and `RUST_LOG_FORMAT=json|text` for
/// output shape, matching the teacher's logging setup.
fn initialize_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("starting composition reconciliation engine");
}

/// Start reflector tasks for the engine's own CRDs (Composition,
/// CompositionRevision, Function) and build the shared [`Context`]
/// (spec.md §4.2/§4.6: the Composition Resolver and Function Runner read
/// from in-memory stores rather than hitting the API server every tick).
async fn initialize_shared_context(client: Client) -> Result<Arc<Context>> {
    let compositions_api = kube::Api::<Composition>::all(client.clone());
    let revisions_api = kube::Api::<CompositionRevision>::all(client.clone());
    let functions_api = kube::Api::<Function>::all(client.clone());

    let (compositions_store, compositions_writer) = reflector::store();
    let (revisions_store, revisions_writer) = reflector::store();
    let (functions_store, functions_writer) = reflector::store();

    tokio::spawn(async move {
        let stream = watcher(compositions_api, watcher::Config::default());
        reflector(compositions_writer, stream).for_each(|_| futures::future::ready(())).await;
        warn!("Composition reflector stream ended");
    });

    tokio::spawn(async move {
        let stream = watcher(revisions_api, watcher::Config::default());
        reflector(revisions_writer, stream).for_each(|_| futures::future::ready(())).await;
        warn!("CompositionRevision reflector stream ended");
    });

    tokio::spawn(async move {
        let stream = watcher(functions_api, watcher::Config::default());
        reflector(functions_writer, stream).for_each(|_| futures::future::ready(())).await;
        warn!("Function reflector stream ended");
    });

    Ok(Arc::new(Context {
        client,
        stores: Stores {
            compositions: compositions_store,
            composition_revisions: revisions_store,
            functions: functions_store,
        },
        metrics: Metrics::default(),
    }))
}

fn start_metrics_server() -> tokio::task::JoinHandle<()> {
    info!(
        bind_address = METRICS_SERVER_BIND_ADDRESS,
        port = METRICS_SERVER_PORT,
        path = METRICS_SERVER_PATH,
        "starting Prometheus metrics HTTP server"
    );

    tokio::spawn(async move {
        async fn metrics_handler() -> String {
            match metrics::gather_metrics() {
                Ok(text) => text,
                Err(e) => {
                    error!("failed to gather metrics: {e}");
                    String::from("# error gathering metrics\n")
                }
            }
        }

        let app = Router::new().route(METRICS_SERVER_PATH, get(metrics_handler));
        let bind_addr = format!("{METRICS_SERVER_BIND_ADDRESS}:{METRICS_SERVER_PORT}");
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("failed to bind metrics server to {bind_addr}: {e}");
                return;
            }
        };

        info!("metrics server listening on http://{bind_addr}{METRICS_SERVER_PATH}");
        if let Err(e) = axum::serve(listener, app).await {
            error!("metrics server error: {e}");
        }
    })
}

/// Wait for `ctrl_c` or SIGTERM, whichever comes first.
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            info!("received SIGINT, initiating graceful shutdown");
            result.map_err(anyhow::Error::from)
        }
        result = async {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut sigterm = signal(SignalKind::terminate())?;
                sigterm.recv().await;
                Ok::<(), anyhow::Error>(())
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
                Ok::<(), anyhow::Error>(())
            }
        } => {
            info!("received SIGTERM, initiating graceful shutdown");
            result
        }
    }
}

/// Run every registered controller, stopping on the first shutdown signal
/// (spec.md §4.1: "a lease loss terminates in-flight reconciles
/// cooperatively"; dropping the controller future set here is the
/// coarse-grained equivalent when running without leader election).
async fn run_until_shutdown(engine: Arc<Context>, config: &EngineConfig) -> Result<()> {
    tokio::select! {
        result = wait_for_shutdown_signal() => result,
        result = manager::run_all_controllers(engine, &config.registrations) => {
            result?;
            anyhow::bail!("controller set exited unexpectedly without error")
        }
    }
}

async fn async_main() -> Result<()> {
    initialize_logging();

    let config = EngineConfig::from_env()?;
    info!(registrations = config.registrations.len(), "loaded engine configuration");

    let kube_config = kube::Config::infer().await?;
    let client = Client::try_from(kube_config)?;

    let engine = initialize_shared_context(client.clone()).await?;
    let _metrics_handle = start_metrics_server();

    if config.leader_election.enabled {
        info!(
            lease_name = %config.leader_election.lease_name,
            lease_namespace = %config.leader_election.lease_namespace,
            identity = %config.leader_election.identity,
            "leader election enabled, waiting to acquire leadership"
        );

        let lease_manager = LeaseManagerBuilder::new(client.clone(), &config.leader_election.lease_name)
            .with_namespace(&config.leader_election.lease_namespace)
            .with_identity(&config.leader_election.identity)
            .with_duration(config.leader_election.lease_duration_secs)
            .with_grace(config.leader_election.retry_period_secs)
            .build()
            .await?;

        let (leader_rx, _lease_handle) = lease_manager.watch().await;

        let mut rx = leader_rx.clone();
        while !*rx.borrow_and_update() {
            rx.changed().await?;
        }
        metrics::record_leader_elected(&config.leader_election.identity);
        info!("leadership acquired, starting controllers");

        let mut leadership_rx = leader_rx.clone();
        tokio::select! {
            result = run_until_shutdown(engine, &config) => result?,
            result = async {
                loop {
                    leadership_rx.changed().await?;
                    if !*leadership_rx.borrow() {
                        return Ok::<(), anyhow::Error>(());
                    }
                }
            } => {
                result?;
                metrics::record_leader_lost(&config.leader_election.identity);
                warn!("leadership lost, stepping down");
            }
        }
    } else {
        warn!("leader election disabled, running without high availability");
        run_until_shutdown(engine, &config).await?;
    }

    info!("graceful shutdown complete");
    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
