//! Submit a transaction and wait for it to land.
//!
//! Wallet failures are mapped onto the SDK taxonomy per transaction kind:
//! claims get the faucet-specific variants, everything else the generic
//! submission/confirmation ones.

use alloy::{primitives::B256, rpc::types::TransactionRequest};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::faucet::classify_claim_revert;
use crate::state::TxKind;
use crate::wallet::{WalletError, WalletSession};

pub struct TransactionExecutor<'a> {
    session: &'a WalletSession,
}

impl<'a> TransactionExecutor<'a> {
    pub fn new(session: &'a WalletSession) -> Self {
        Self { session }
    }

    /// Verify the network, then hand `tx` to the wallet. Resolves with the
    /// hash once the network has accepted it.
    pub async fn submit(&self, kind: TxKind, tx: TransactionRequest) -> Result<B256> {
        self.session.ensure_network().await?;
        debug!(kind = kind.label(), "submitting transaction");
        let hash = self
            .session
            .provider()
            .send_transaction(tx)
            .await
            .map_err(|e| submission_error(kind, e))?;
        info!(kind = kind.label(), %hash, "transaction accepted");
        Ok(hash)
    }

    /// Wait for inclusion; a reverted receipt is a failure.
    pub async fn confirm(&self, kind: TxKind, hash: B256) -> Result<()> {
        match self.session.provider().wait_for_receipt(hash).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(confirmation_error(kind, "transaction reverted".into())),
            Err(e) => Err(confirmation_error(kind, e.to_string())),
        }
    }
}

fn submission_error(kind: TxKind, err: WalletError) -> Error {
    match (kind, err) {
        (_, WalletError::UserRejected) => Error::UserRejected,
        (TxKind::Claim, WalletError::Reverted(reason) | WalletError::Rpc(reason)) => {
            classify_claim_revert(&reason)
        }
        (TxKind::Claim, other) => Error::ClaimFailed(other.to_string()),
        (TxKind::Approval | TxKind::Swap, other) => Error::SubmissionFailed(other.to_string()),
    }
}

fn confirmation_error(kind: TxKind, reason: String) -> Error {
    match kind {
        TxKind::Claim => Error::ClaimFailed(reason),
        TxKind::Approval | TxKind::Swap => Error::ConfirmationFailed(reason),
    }
}
