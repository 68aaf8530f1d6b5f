// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use consent_ledger::types::ChainId;
use consent_ledger::{LedgerError, SubmissionError};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// A peer could not supply a usable answer. Never fatal to a resolution round.
#[derive(Error, Debug, Clone)]
pub enum PeerError {
    #[error("peer {url} unreachable: {reason}")]
    Unreachable { url: String, reason: String },
    #[error("peer {url} timed out")]
    Timeout { url: String },
    #[error("peer {url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("peer {url} sent an unreadable response: {reason}")]
    Malformed { url: String, reason: String },
}

#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Peer(#[from] PeerError),
    #[error("chain '{0}' already exists")]
    AlreadyExists(ChainId),
    #[error("block '{0}' not found")]
    BlockNotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<SubmissionError> for NodeError {
    fn from(e: SubmissionError) -> Self {
        NodeError::Ledger(LedgerError::Submission(e))
    }
}

impl NodeError {
    pub fn status(&self) -> StatusCode {
        match self {
            NodeError::Ledger(e) => match e {
                LedgerError::Integrity(_) => StatusCode::CONFLICT,
                LedgerError::Submission(_) => StatusCode::BAD_REQUEST,
                LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::InvalidChainId(_) | LedgerError::InvalidBlockRef(_) => {
                    StatusCode::BAD_REQUEST
                }
            },
            NodeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            NodeError::Peer(_) => StatusCode::BAD_GATEWAY,
            NodeError::AlreadyExists(_) => StatusCode::CONFLICT,
            NodeError::BlockNotFound(_) => StatusCode::NOT_FOUND,
            NodeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
