//! # Ledger Seam
//!
//! AlgoCred never talks to a chain itself. Issuance produces a [`MintRequest`]
//! for an external service to submit, and verification reads back already
//! confirmed assets through the [`AssetLedger`] trait.
//!
//! [`InMemoryLedger`] is the reference implementation used by tests and the
//! local CLI. Like the real thing it is append-only: an asset's metadata hash
//! and note are fixed the moment it is recorded.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;

use crate::config::HASH_OUTPUT_LENGTH;

/// Ledger-assigned asset identifier.
pub type AssetId = u64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Every id up to `u64::MAX` has been handed out.
    #[error("asset id space exhausted")]
    IdSpaceExhausted,
}

/// Everything an issuer hands to the submission service for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
    pub asset_name: String,
    pub unit_name: String,
    /// Fingerprint bytes for the token's metadata-hash slot.
    pub metadata_hash: [u8; HASH_OUTPUT_LENGTH],
    /// Note envelope bytes, if the token carries a sealed payload.
    pub note: Option<Vec<u8>>,
}

/// A confirmed asset as read back from a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAsset {
    pub id: AssetId,
    pub creator: String,
    pub asset_name: String,
    pub unit_name: String,
    pub metadata_hash: Option<[u8; HASH_OUTPUT_LENGTH]>,
    pub note: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

/// Read access to confirmed assets.
pub trait AssetLedger: Send + Sync {
    fn asset(&self, id: AssetId) -> Option<LedgerAsset>;
}

#[derive(Debug)]
struct LedgerState {
    assets: BTreeMap<AssetId, LedgerAsset>,
    /// Next id `record` will try. `None` once `u64::MAX` is taken.
    next_id: Option<AssetId>,
}

/// Append-only in-process ledger.
///
/// Id allocation and insertion happen under one write lock, so a concurrent
/// `import` can never land between the two.
#[derive(Debug)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState {
                assets: BTreeMap::new(),
                next_id: Some(1),
            }),
        }
    }

    /// Records a mint request as a new asset and returns its id.
    pub fn record(&self, creator: &str, request: MintRequest) -> Result<AssetId, LedgerError> {
        let mut state = self.state.write();
        let id = loop {
            let candidate = state.next_id.ok_or(LedgerError::IdSpaceExhausted)?;
            state.next_id = candidate.checked_add(1);
            if !state.assets.contains_key(&candidate) {
                break candidate;
            }
        };

        let asset = LedgerAsset {
            id,
            creator: creator.to_string(),
            asset_name: request.asset_name,
            unit_name: request.unit_name,
            metadata_hash: Some(request.metadata_hash),
            note: request.note,
            created_at: Utc::now(),
        };
        tracing::debug!(asset_id = id, asset_name = %asset.asset_name, "asset recorded");
        state.assets.insert(id, asset);
        Ok(id)
    }

    /// Inserts an asset exactly as given, e.g. one imported from an indexer
    /// dump. Existing ids are never overwritten; returns false if taken.
    pub fn import(&self, asset: LedgerAsset) -> bool {
        let mut state = self.state.write();
        if state.assets.contains_key(&asset.id) {
            return false;
        }
        state.next_id = match (state.next_id, asset.id.checked_add(1)) {
            (Some(next), Some(after)) => Some(next.max(after)),
            _ => None,
        };
        state.assets.insert(asset.id, asset);
        true
    }

    pub fn len(&self) -> usize {
        self.state.read().assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().assets.is_empty()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLedger for InMemoryLedger {
    fn asset(&self, id: AssetId) -> Option<LedgerAsset> {
        self.state.read().assets.get(&id).cloned()
    }
}
