//! One-time test-token faucet.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::executor::TransactionExecutor;
use crate::instructions::claim_request;
use crate::reader::BalanceAllowanceReader;
use crate::state::TxKind;
use crate::wallet::WalletSession;

/// Map a faucet revert reason onto the claim error variants.
pub fn classify_claim_revert(reason: &str) -> Error {
    let lower = reason.to_ascii_lowercase();
    if lower.contains("already claimed") {
        Error::AlreadyClaimed
    } else if lower.contains("insufficient") {
        Error::InsufficientFaucetBalance
    } else {
        Error::ClaimFailed(reason.to_string())
    }
}

// ─── FaucetClaimer ────────────────────────────────────────────────────────────

pub struct FaucetClaimer<'a> {
    session: &'a WalletSession,
    faucet:  Address,
}

impl<'a> FaucetClaimer<'a> {
    pub fn new(session: &'a WalletSession, faucet: Address) -> Self {
        Self { session, faucet }
    }

    pub async fn has_claimed(&self) -> Result<bool> {
        BalanceAllowanceReader::new(self.session)
            .has_claimed(self.faucet, self.session.account())
            .await
    }

    pub async fn claim_amount(&self) -> Result<U256> {
        BalanceAllowanceReader::new(self.session)
            .claim_amount(self.faucet)
            .await
    }

    pub async fn submit(&self) -> Result<B256> {
        let tx = claim_request(self.session.account(), self.faucet);
        TransactionExecutor::new(self.session).submit(TxKind::Claim, tx).await
    }

    pub async fn confirm(&self, hash: B256) -> Result<()> {
        TransactionExecutor::new(self.session).confirm(TxKind::Claim, hash).await
    }
}

// ─── ClaimLedger ──────────────────────────────────────────────────────────────

/// One claim: `account` drew from `faucet` on `chain_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimKey {
    pub chain_id: u64,
    pub faucet:   Address,
    pub account:  Address,
}

/// Claims known to have happened, optionally persisted as a JSON array.
///
/// Outlives wallet sessions: a disconnect does not forget a claim. Entries
/// for other chains or faucets never match.
#[derive(Debug, Default)]
pub struct ClaimLedger {
    path:    Option<PathBuf>,
    claimed: Mutex<HashSet<ClaimKey>>,
}

impl ClaimLedger {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the ledger at `path`, or start empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let claimed: HashSet<ClaimKey> = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<Vec<ClaimKey>>(&raw)?.into_iter().collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), entries = claimed.len(), "claim ledger loaded");
        Ok(Self { path: Some(path), claimed: Mutex::new(claimed) })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn contains(&self, key: &ClaimKey) -> bool {
        self.lock().contains(key)
    }

    /// Record a claim, writing through to disk when new.
    ///
    /// The lock is held across the write so files land in insertion order.
    pub fn mark(&self, key: ClaimKey) -> Result<()> {
        let mut claimed = self.lock();
        if !claimed.insert(key) {
            return Ok(());
        }
        info!(account = %key.account, chain_id = key.chain_id, "faucet claim recorded");

        if let Some(path) = &self.path {
            let mut entries: Vec<ClaimKey> = claimed.iter().copied().collect();
            entries.sort();
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(&entries)?)?;
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<ClaimKey>> {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
