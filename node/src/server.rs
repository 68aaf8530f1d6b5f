// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use axum::extract::{Path, Query, Request as AxumRequest, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use consent_ledger::types::{BlockRef, BlockSummary, ChainId};
use consent_ledger::LedgerError;
use tower_http::trace::TraceLayer;

use crate::api::*;
use crate::consensus::ResolutionReport;
use crate::engine::{Engine, ResolvePolicy};
use crate::errors::NodeError;

pub type SharedEngine = Arc<Engine>;

async fn auth_guard(
    State(token): State<Arc<String>>,
    req: AxumRequest,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.strip_prefix("Bearer "));

    match provided {
        Some(provided) if provided == token.as_str() => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

pub fn build_router(state: SharedEngine, auth_token: Option<String>) -> Router {
    let mut app = Router::new()
        .route("/", get(identity))
        .route("/nodes", get(list_nodes).post(register_nodes))
        .route("/nodes/resolve", post(resolve_nodes))
        .route("/chains", get(list_chains).post(create_chain))
        .route("/chains/:id", get(get_chain))
        .route("/chains/:id/blocks", get(get_blocks))
        .route("/chains/:id/blocks/:block", get(get_block))
        .route("/chains/:id/consents", get(get_consents).post(submit_consent))
        .route("/chains/:id/consents/verify", post(verify_consents))
        .route("/chains/:id/resolve", post(resolve_chain))
        .route("/blocks/:id", get(find_block))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    if let Some(token) = auth_token {
        tracing::info!("Auth Enabled: Bearer token required");
        app = app.layer(from_fn_with_state(Arc::new(token), auth_guard));
    } else {
        tracing::warn!("Auth Disabled: No token configured");
    }

    app.layer(TraceLayer::new_for_http())
}

fn chain_id(raw: String) -> Result<ChainId, NodeError> {
    Ok(ChainId::new(raw)?)
}

async fn identity(State(engine): State<SharedEngine>) -> Json<NodeIdentity> {
    Json(engine.identity())
}

async fn list_nodes(State(engine): State<SharedEngine>) -> Json<NodesResponse> {
    let nodes = engine.nodes().await;
    Json(NodesResponse {
        total: nodes.len(),
        nodes,
    })
}

async fn register_nodes(
    State(engine): State<SharedEngine>,
    Json(req): Json<RegisterNodesRequest>,
) -> Result<(StatusCode, Json<NodesResponse>), NodeError> {
    if req.nodes.is_empty() {
        return Err(NodeError::InvalidInput("supply a non-empty list of nodes".into()));
    }
    engine.register_nodes(&req.nodes).await?;
    let nodes = engine.nodes().await;
    Ok((
        StatusCode::CREATED,
        Json(NodesResponse {
            total: nodes.len(),
            nodes,
        }),
    ))
}

async fn resolve_nodes(State(engine): State<SharedEngine>) -> Json<NodesResponse> {
    let nodes = engine.resolve_nodes().await;
    Json(NodesResponse {
        total: nodes.len(),
        nodes,
    })
}

async fn list_chains(State(engine): State<SharedEngine>) -> Result<Json<ChainsResponse>, NodeError> {
    let chains = engine.chains().await?;
    Ok(Json(ChainsResponse {
        total: chains.len(),
        chains,
    }))
}

async fn create_chain(
    State(engine): State<SharedEngine>,
    body: Option<Json<CreateChainRequest>>,
) -> Result<(StatusCode, Json<ChainSummary>), NodeError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let ledger = engine.create_chain(req.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ChainSummary {
            chain_id: ledger.chain_id().clone(),
            length: ledger.len(),
            head: ledger.last_block().map(BlockSummary::from),
        }),
    ))
}

async fn get_chain(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<ChainSummary>, NodeError> {
    let chain_id = chain_id(id)?;
    let ledger = engine
        .ledger(&chain_id, ResolvePolicy::from_flag(query.resolve))
        .await?;
    Ok(Json(ChainSummary {
        chain_id,
        length: ledger.len(),
        head: ledger.last_block().map(BlockSummary::from),
    }))
}

async fn get_blocks(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Query(query): Query<BlocksQuery>,
) -> Result<Json<ChainBlocksResponse>, NodeError> {
    let chain_id = chain_id(id)?;
    let ledger = engine.ledger(&chain_id, ResolvePolicy::LocalOnly).await?;
    let length = ledger.len();
    let blocks = if query.detail {
        BlockEntries::Full(ledger.into_blocks())
    } else {
        BlockEntries::Summary(ledger.blocks().iter().map(BlockSummary::from).collect())
    };
    Ok(Json(ChainBlocksResponse {
        chain_id,
        length,
        blocks,
    }))
}

async fn get_block(
    State(engine): State<SharedEngine>,
    Path((id, block)): Path<(String, String)>,
) -> Result<Json<BlockLookupResponse>, NodeError> {
    let chain_id = chain_id(id)?;
    let reference: BlockRef = block.parse()?;
    let block = engine
        .block(&chain_id, reference, ResolvePolicy::LocalOnly)
        .await?;
    Ok(Json(BlockLookupResponse { chain_id, block }))
}

async fn find_block(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
) -> Result<Json<BlockLookupResponse>, NodeError> {
    let block_id = match id.parse::<BlockRef>()? {
        BlockRef::Id(block_id) => block_id,
        BlockRef::Index(_) => return Err(LedgerError::InvalidBlockRef(id).into()),
    };
    let (chain_id, block) = engine.find_block(block_id).await?;
    Ok(Json(BlockLookupResponse { chain_id, block }))
}

async fn get_consents(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<ConsentsResponse>, NodeError> {
    let chain_id = chain_id(id)?;
    let (ledger, resolution) = engine
        .consents(&chain_id, None, ResolvePolicy::from_flag(query.resolve))
        .await?;
    Ok(Json(ConsentsResponse {
        chain_id,
        length: ledger.len(),
        resolution,
    }))
}

async fn verify_consents(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Json(req): Json<VerifyConsentsRequest>,
) -> Result<Json<ConsentsResponse>, NodeError> {
    let chain_id = chain_id(id)?;
    let originals = req.into_originals()?;
    let (ledger, resolution) = engine
        .consents(&chain_id, Some(&originals), ResolvePolicy::LocalOnly)
        .await?;
    Ok(Json(ConsentsResponse {
        chain_id,
        length: ledger.len(),
        resolution,
    }))
}

async fn submit_consent(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Json(req): Json<SubmitConsentRequest>,
) -> Result<(StatusCode, Json<SubmitConsentResponse>), NodeError> {
    let chain_id = chain_id(id)?;
    let parts = req
        .parts
        .into_iter()
        .map(DataPartPayload::into_part)
        .collect::<Result<Vec<_>, _>>()?;
    let block = engine
        .submit_consent(&chain_id, req.consent, parts, ResolvePolicy::ResolveOrMint)
        .await?;
    Ok((StatusCode::CREATED, Json(SubmitConsentResponse { chain_id, block })))
}

async fn resolve_chain(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
) -> Result<Json<ResolutionReport>, NodeError> {
    let chain_id = chain_id(id)?;
    Ok(Json(engine.resolve_chain(&chain_id, false).await?))
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}
