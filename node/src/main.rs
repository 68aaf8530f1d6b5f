// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;
use std::time::Duration;

use consent_node::config::NodeConfig;
use consent_node::engine::Engine;
use consent_node::server::{build_router, SharedEngine};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    consent_node::telemetry::init_telemetry();

    let cfg = NodeConfig::from_env()?;
    tracing::info!("Initializing Consent Node with config: {:?}", cfg);

    let engine: SharedEngine = Arc::new(Engine::new(&cfg)?);
    tracing::info!("Node id: {}", engine.node_id());

    if !cfg.peers.is_empty() {
        let nodes = engine.register_nodes(&cfg.peers).await?;
        tracing::info!("Registered {} configured peers", nodes.len());
    }

    // Spawn Liveness Probe Task
    if let Some(secs) = cfg.probe_interval_secs {
        let engine = engine.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(secs));
            loop {
                interval.tick().await;
                let nodes = engine.resolve_nodes().await;
                let resolved = nodes.iter().filter(|n| n.resolved).count();
                tracing::debug!("Probed {} nodes, {} resolved", nodes.len(), resolved);
            }
        });
    }

    // Spawn Consensus Task
    if let Some(secs) = cfg.resolve_interval_secs {
        let engine = engine.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(secs));
            // First tick fires immediately; give peers a chance to come up.
            interval.tick().await;
            loop {
                interval.tick().await;
                match engine.resolve_all_chains().await {
                    Ok(reports) => {
                        let replaced = reports.iter().filter(|r| r.replaced).count();
                        tracing::debug!("Resolved {} chains, {} replaced", reports.len(), replaced);
                    }
                    Err(e) => tracing::error!("Periodic resolution failed: {}", e),
                }
            }
        });
    }

    let app = build_router(engine, cfg.auth_token.clone());

    let addr = cfg.bind_addr;
    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
