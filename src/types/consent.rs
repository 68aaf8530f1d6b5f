// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Consent records and the subsystem metadata they reference.

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::SubmissionError;
use crate::types::time::Timestamp;

/// Permission class a consent applies to.
///
/// Known actions are listed explicitly so that the resolution engine can
/// report the ones that were never granted. Any other hyphen-case identifier
/// is accepted as [`ConsentAction::Other`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ConsentAction {
    FirstNameRead,
    FirstNameWrite,
    LastNameRead,
    LastNameWrite,
    EmailRead,
    EmailWrite,
    Other(String),
}

impl ConsentAction {
    pub const KNOWN: [ConsentAction; 6] = [
        ConsentAction::FirstNameRead,
        ConsentAction::FirstNameWrite,
        ConsentAction::LastNameRead,
        ConsentAction::LastNameWrite,
        ConsentAction::EmailRead,
        ConsentAction::EmailWrite,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ConsentAction::FirstNameRead => "first-name-read",
            ConsentAction::FirstNameWrite => "first-name-write",
            ConsentAction::LastNameRead => "last-name-read",
            ConsentAction::LastNameWrite => "last-name-write",
            ConsentAction::EmailRead => "email-read",
            ConsentAction::EmailWrite => "email-write",
            ConsentAction::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ConsentAction::Other(_))
    }
}

impl fmt::Display for ConsentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsentAction {
    type Err = SubmissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        if let Some(known) = Self::KNOWN.iter().find(|a| a.as_str() == normalized) {
            return Ok(known.clone());
        }
        let valid = !normalized.is_empty()
            && !normalized.starts_with('-')
            && !normalized.ends_with('-')
            && normalized
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(SubmissionError::Malformed(format!("invalid consent action '{s}'")));
        }
        Ok(ConsentAction::Other(normalized))
    }
}

impl TryFrom<String> for ConsentAction {
    type Error = SubmissionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConsentAction> for String {
    fn from(action: ConsentAction) -> Self {
        action.as_str().to_string()
    }
}

/// Descriptive and integrity metadata for externally held data a consent covers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsystem {
    /// Correlation key of the data part supplied at submission time.
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
    /// Keyed digest of the data payload, absent for metadata-only entries.
    #[serde(default)]
    pub digest: Option<Digest>,
}

/// A single grant or revocation. Immutable once embedded in a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consent {
    pub action: ConsentAction,
    pub consent: bool,
    pub created: Timestamp,
    #[serde(default)]
    pub expire: Option<Timestamp>,
    #[serde(default)]
    pub subsystems: Vec<Subsystem>,
}

impl Consent {
    pub fn new(action: ConsentAction, consent: bool, created: Timestamp) -> Self {
        Self {
            action,
            consent,
            created,
            expire: None,
            subsystems: Vec::new(),
        }
    }

    pub fn with_expire(mut self, expire: Timestamp) -> Self {
        self.expire = Some(expire);
        self
    }

    pub fn with_subsystems(mut self, subsystems: Vec<Subsystem>) -> Self {
        self.subsystems = subsystems;
        self
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expire.map_or(false, |expire| expire <= now)
    }

    /// Whether the permission is in force at `now`.
    pub fn is_effective(&self, now: Timestamp) -> bool {
        self.consent && !self.is_expired(now)
    }

    /// Same grant, expiry and subsystems, ignoring authoring time.
    pub fn same_terms(&self, other: &Consent) -> bool {
        self.action == other.action
            && self.consent == other.consent
            && self.expire == other.expire
            && self.subsystems == other.subsystems
    }
}

impl fmt::Display for Consent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] from [{}]", self.action, u8::from(self.consent), self.created)?;
        match self.expire {
            Some(expire) => write!(f, " until [{expire}]"),
            None => f.write_str(" forever"),
        }
    }
}
