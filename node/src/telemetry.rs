// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::sync::OnceLock;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "consent_node=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => tracing::error!("Failed to install Prometheus recorder: {}", e),
    }

    metrics::describe_counter!("consent_blocks_appended_total", "Blocks appended to local chains");
    metrics::describe_counter!("consent_submissions_rejected_total", "Consent submissions rejected before any block was created");
    metrics::describe_counter!("consent_resolution_rounds_total", "Consensus rounds by outcome");
    metrics::describe_counter!("consent_chain_replacements_total", "Local chains replaced by a longer valid peer chain");
    metrics::describe_counter!("consent_peer_fetch_failures_total", "Peer chain fetches that failed or timed out");
    metrics::describe_histogram!("consent_resolution_duration_seconds", "Duration of a consensus round");

    metrics::gauge!("consent_node_up", 1.0);
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
