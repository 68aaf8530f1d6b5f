// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Consent State Replay.
//!
//! Resolution is a pure fold over the blocks in index order, consents in
//! insertion order. It never touches the ledger, and every input that could
//! vary between calls (`now`, the supplied originals) is a parameter, so the
//! same inputs serialize to the same bytes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::digest::LedgerSecret;
use crate::ledger::Ledger;
use crate::types::consent::{Consent, ConsentAction, Subsystem};
use crate::types::time::Timestamp;

/// Original payloads supplied at query time, keyed by `data_id`.
pub type DataOriginals = BTreeMap<String, Vec<u8>>;

/// How the entry shown for an action came to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModificationType {
    Created,
    Updated,
    /// Computed for a known action with no record. Carries no timestamps.
    Virtual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Initial,
    Updated,
    Unchanged,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedConsent {
    pub action: ConsentAction,
    /// Flag as recorded.
    pub consent: bool,
    /// Granted, and not expired at resolution time.
    pub effective: bool,
    pub expired: bool,
    pub created: Option<Timestamp>,
    pub expire: Option<Timestamp>,
    pub subsystems: Vec<Subsystem>,
    /// Index of the block holding the record.
    pub block: Option<u64>,
    #[serde(rename = "type")]
    pub modification: ModificationType,
}

impl ResolvedConsent {
    fn virtual_for(action: ConsentAction) -> Self {
        Self {
            action,
            consent: false,
            effective: false,
            expired: false,
            created: None,
            expire: None,
            subsystems: Vec::new(),
            block: None,
            modification: ModificationType::Virtual,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Change {
    pub status: ChangeStatus,
    pub action: ConsentAction,
    pub consent: bool,
    pub created: Timestamp,
    pub expire: Option<Timestamp>,
    pub block: u64,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionHistory {
    pub action: ConsentAction,
    pub changes: Vec<Change>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckResult {
    Matched,
    Mismatched,
    Unchecked,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntegrityCheck {
    pub action: ConsentAction,
    pub data_id: Option<String>,
    pub block: u64,
    pub result: CheckResult,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityStatus {
    /// Every digest in the latest state was checked and matched.
    Verified,
    /// At least one digest no longer matches its supplied original.
    Outdated,
    /// Nothing mismatched, but some digests had no original to compare.
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub status: IntegrityStatus,
    pub outdated: bool,
    pub verified: bool,
    pub checks: Vec<IntegrityCheck>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConsentResolution {
    /// Last record per action, sorted by action.
    pub latest: Vec<ResolvedConsent>,
    /// Virtual entries for known actions that were never recorded.
    pub defaults: Vec<ResolvedConsent>,
    pub history: Vec<ActionHistory>,
    /// Every record in ledger order.
    pub changes: Vec<Change>,
    pub summary: Vec<String>,
    pub integrity: IntegrityReport,
}

impl ConsentResolution {
    /// Latest state followed by the virtual defaults, for presentation.
    pub fn rendered(&self) -> Vec<&ResolvedConsent> {
        self.latest.iter().chain(self.defaults.iter()).collect()
    }

    pub fn latest_for(&self, action: &ConsentAction) -> Option<&ResolvedConsent> {
        self.latest.iter().find(|c| &c.action == action)
    }

    pub fn history_for(&self, action: &ConsentAction) -> &[Change] {
        self.history
            .iter()
            .find(|h| &h.action == action)
            .map(|h| h.changes.as_slice())
            .unwrap_or(&[])
    }
}

struct Latest<'a> {
    consent: &'a Consent,
    block: u64,
    records: usize,
}

/// Replay every consent of `ledger` into its current state.
pub fn resolve_consents(
    ledger: &Ledger,
    now: Timestamp,
    originals: Option<&DataOriginals>,
    secret: &LedgerSecret,
) -> ConsentResolution {
    let mut latest: BTreeMap<&str, Latest<'_>> = BTreeMap::new();
    let mut history: BTreeMap<&str, Vec<Change>> = BTreeMap::new();
    let mut changes = Vec::new();

    for block in ledger.blocks() {
        for consent in &block.consents {
            let key = consent.action.as_str();
            let status = match latest.get(key) {
                None => ChangeStatus::Initial,
                Some(prev) if prev.consent.same_terms(consent) => ChangeStatus::Unchanged,
                Some(_) => ChangeStatus::Updated,
            };

            let change = Change {
                status,
                action: consent.action.clone(),
                consent: consent.consent,
                created: consent.created,
                expire: consent.expire,
                block: block.index,
                detail: describe(status, consent),
            };
            history.entry(key).or_default().push(change.clone());
            changes.push(change);

            let records = latest.get(key).map_or(0, |l| l.records) + 1;
            latest.insert(
                key,
                Latest {
                    consent,
                    block: block.index,
                    records,
                },
            );
        }
    }

    let latest_state: Vec<ResolvedConsent> = latest
        .values()
        .map(|l| ResolvedConsent {
            action: l.consent.action.clone(),
            consent: l.consent.consent,
            effective: l.consent.is_effective(now),
            expired: l.consent.is_expired(now),
            created: Some(l.consent.created),
            expire: l.consent.expire,
            subsystems: l.consent.subsystems.clone(),
            block: Some(l.block),
            modification: if l.records == 1 {
                ModificationType::Created
            } else {
                ModificationType::Updated
            },
        })
        .collect();

    let defaults = ConsentAction::KNOWN
        .iter()
        .filter(|action| !latest.contains_key(action.as_str()))
        .cloned()
        .map(ResolvedConsent::virtual_for)
        .collect();

    let integrity = check_integrity(latest.values(), originals, secret);

    let mut summary: Vec<String> = changes.iter().map(|c: &Change| c.detail.clone()).collect();
    if summary.is_empty() {
        summary.push("[initial] => (no consents)".to_string());
    }

    let history = history
        .into_values()
        .filter_map(|changes| {
            let action = changes.first()?.action.clone();
            Some(ActionHistory { action, changes })
        })
        .collect();

    ConsentResolution {
        latest: latest_state,
        defaults,
        history,
        changes,
        summary,
        integrity,
    }
}

fn check_integrity<'a, 'b: 'a>(
    latest: impl Iterator<Item = &'a Latest<'b>>,
    originals: Option<&DataOriginals>,
    secret: &LedgerSecret,
) -> IntegrityReport {
    let mut checks = Vec::new();

    for entry in latest {
        for subsystem in &entry.consent.subsystems {
            let Some(anchored) = subsystem.digest else {
                continue;
            };
            let original = subsystem
                .data_id
                .as_ref()
                .and_then(|id| originals.and_then(|o| o.get(id)));
            let result = match original {
                Some(data) if secret.data_digest(data) == anchored => CheckResult::Matched,
                Some(_) => CheckResult::Mismatched,
                None => CheckResult::Unchecked,
            };
            checks.push(IntegrityCheck {
                action: entry.consent.action.clone(),
                data_id: subsystem.data_id.clone(),
                block: entry.block,
                result,
            });
        }
    }

    let outdated = checks.iter().any(|c| c.result == CheckResult::Mismatched);
    let verified = checks.iter().all(|c| c.result == CheckResult::Matched);
    let status = if outdated {
        IntegrityStatus::Outdated
    } else if verified {
        IntegrityStatus::Verified
    } else {
        IntegrityStatus::Unknown
    };

    IntegrityReport {
        status,
        outdated,
        verified,
        checks,
    }
}

fn describe(status: ChangeStatus, consent: &Consent) -> String {
    match status {
        ChangeStatus::Initial => format!("[initial] => {consent}"),
        ChangeStatus::Updated => format!("[updated] => {consent}"),
        ChangeStatus::Unchanged => format!("[unchanged] =>> {consent}"),
    }
}
