// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Consent submission preparation.
//!
//! A submission is one consent record plus zero or more out-of-band data
//! parts. Parts are matched to `subsystems[].data_id` by correlation id and
//! reduced to keyed digests; the payloads themselves never enter the ledger.
//! Either every declared `data_id` pairs with exactly one part and every part
//! is claimed, or the whole submission is rejected.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::digest::LedgerSecret;
use crate::error::SubmissionError;
use crate::types::consent::{Consent, ConsentAction, Subsystem};
use crate::types::time::Timestamp;

const TEXT_MEDIA_TYPE: &str = "text/plain";
const BINARY_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Clone, Debug, Deserialize)]
pub struct ConsentSubmission {
    pub action: ConsentAction,
    pub consent: bool,
    #[serde(default)]
    pub expire: Option<Timestamp>,
    #[serde(default)]
    pub subsystems: Vec<SubsystemSubmission>,
}

/// Subsystem as submitted: everything but the digest, which is derived here.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubsystemSubmission {
    #[serde(default)]
    pub data_id: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub data_provider: Option<String>,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub data_description: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Out-of-band payload correlated to a subsystem by `id`.
#[derive(Clone, Debug)]
pub struct DataPart {
    pub id: String,
    pub media_type: Option<String>,
    pub data: Vec<u8>,
}

impl DataPart {
    pub fn new(id: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            media_type: None,
            data: data.into(),
        }
    }
}

/// Validate a submission against its parts and build the consent record.
pub fn prepare_consent(
    submission: ConsentSubmission,
    parts: Vec<DataPart>,
    secret: &LedgerSecret,
    now: Timestamp,
) -> Result<Consent, SubmissionError> {
    if let Some(expire) = submission.expire {
        if expire <= now {
            return Err(SubmissionError::Malformed(format!(
                "expire [{expire}] is not after creation [{now}]"
            )));
        }
    }

    let mut by_id: BTreeMap<String, DataPart> = BTreeMap::new();
    for part in parts {
        if part.id.is_empty() {
            return Err(SubmissionError::Malformed("data part without correlation id".into()));
        }
        if by_id.contains_key(&part.id) {
            return Err(SubmissionError::DuplicatePart(part.id));
        }
        by_id.insert(part.id.clone(), part);
    }

    let mut declared = BTreeSet::new();
    for sub in &submission.subsystems {
        if let Some(data_id) = &sub.data_id {
            if !declared.insert(data_id.clone()) {
                return Err(SubmissionError::DuplicateDataId(data_id.clone()));
            }
            if !by_id.contains_key(data_id) {
                return Err(SubmissionError::UnmatchedDataId(data_id.clone()));
            }
        }
    }
    if let Some(orphan) = by_id.keys().find(|id| !declared.contains(*id)) {
        return Err(SubmissionError::UnmatchedPart(orphan.clone()));
    }

    let subsystems = submission
        .subsystems
        .into_iter()
        .map(|sub| {
            let part = sub.data_id.as_ref().and_then(|id| by_id.get(id));
            let media_type = sub
                .media_type
                .or_else(|| part.and_then(|p| p.media_type.clone()))
                .or_else(|| part.map(|p| sniff_media_type(&p.data).to_string()));
            Subsystem {
                data_id: sub.data_id,
                data_type: sub.data_type,
                data_provider: sub.data_provider,
                data_source: sub.data_source,
                media_type,
                data_description: sub.data_description,
                metadata: sub.metadata,
                digest: part.map(|p| secret.data_digest(&p.data)),
            }
        })
        .collect();

    Ok(Consent {
        action: submission.action,
        consent: submission.consent,
        created: now,
        expire: submission.expire,
        subsystems,
    })
}

fn sniff_media_type(data: &[u8]) -> &'static str {
    if std::str::from_utf8(data).is_ok() {
        TEXT_MEDIA_TYPE
    } else {
        BINARY_MEDIA_TYPE
    }
}
