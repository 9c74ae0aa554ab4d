//! Wallet session: one connected account on one verified network.
//!
//! The wallet itself is reached through [`WalletProvider`]; concrete backends
//! live in [`crate::provider`]. A [`WalletSession`] is created by
//! [`WalletSession::connect`] and must call [`WalletSession::ensure_network`]
//! before every read or submission.

use std::fmt;
use std::sync::Arc;

use alloy::{
    primitives::{Address, Bytes, B256},
    rpc::types::TransactionRequest,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::ChainDescriptor;
use crate::error::{Error, Result};

// ─── Provider seam ────────────────────────────────────────────────────────────

/// Failure reported by a wallet backend, before mapping to [`Error`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("no wallet available")]
    Unavailable,
    #[error("user rejected the request")]
    UserRejected,
    #[error("chain {0} is not registered in the wallet")]
    UnknownChain(u64),
    #[error("execution reverted: {0}")]
    Reverted(String),
    #[error("{0}")]
    Rpc(String),
}

/// Everything the engine needs from a wallet.
///
/// Implementations must be cheap to share; the engine holds them behind an
/// `Arc` for the lifetime of the client.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask for the account to act as. May prompt the user.
    async fn request_account(&self) -> std::result::Result<Address, WalletError>;

    /// Chain id the wallet is currently operating on.
    async fn chain_id(&self) -> std::result::Result<u64, WalletError>;

    /// Move the wallet onto `chain_id`. Returns
    /// [`WalletError::UnknownChain`] when the wallet has never seen it.
    async fn switch_chain(&self, chain_id: u64) -> std::result::Result<(), WalletError>;

    /// Register a network with the wallet.
    async fn add_chain(&self, chain: &ChainDescriptor) -> std::result::Result<(), WalletError>;

    /// Read-only `eth_call`.
    async fn call(&self, tx: TransactionRequest) -> std::result::Result<Bytes, WalletError>;

    /// Sign and broadcast; resolves once the network has accepted it.
    async fn send_transaction(&self, tx: TransactionRequest)
        -> std::result::Result<B256, WalletError>;

    /// Wait for inclusion. `Ok(false)` means the transaction reverted.
    async fn wait_for_receipt(&self, hash: B256) -> std::result::Result<bool, WalletError>;
}

// ─── Session ──────────────────────────────────────────────────────────────────

/// The live account/channel pair for the current connection.
#[derive(Clone)]
pub struct WalletSession {
    provider: Arc<dyn WalletProvider>,
    account:  Address,
    chain:    ChainDescriptor,
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("account", &self.account)
            .field("chain_id", &self.chain.chain_id)
            .finish_non_exhaustive()
    }
}

impl WalletSession {
    /// Acquire an account and verify the network.
    pub async fn connect(
        provider: Arc<dyn WalletProvider>,
        chain:    ChainDescriptor,
    ) -> Result<Self> {
        let account = provider.request_account().await.map_err(|e| match e {
            WalletError::Unavailable => Error::NoProviderAvailable,
            WalletError::UserRejected => Error::UserRejected,
            other => {
                warn!(error = %other, "account request failed");
                Error::NoProviderAvailable
            }
        })?;

        let session = Self { provider, account, chain };
        session.ensure_network().await?;
        info!(%account, chain_id = session.chain.chain_id, "wallet session established");
        Ok(session)
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn chain(&self) -> &ChainDescriptor {
        &self.chain
    }

    pub fn provider(&self) -> &dyn WalletProvider {
        self.provider.as_ref()
    }

    /// Make sure the wallet is on the configured chain.
    ///
    /// Switches if needed; an unknown chain is registered from the fixed
    /// descriptor and the switch retried once. Any failure is `WrongNetwork`.
    pub async fn ensure_network(&self) -> Result<()> {
        let expected = self.chain.chain_id;
        let wrong = |reason: String| Error::WrongNetwork { expected, reason };

        let active = self.provider.chain_id().await.map_err(|e| wrong(e.to_string()))?;
        if active == expected {
            return Ok(());
        }
        info!(active, expected, "requesting network switch");

        match self.provider.switch_chain(expected).await {
            Ok(()) => {}
            Err(WalletError::UnknownChain(_)) => {
                debug!(chain = %self.chain.name, "registering network with wallet");
                self.provider
                    .add_chain(&self.chain)
                    .await
                    .map_err(|e| wrong(format!("could not register network: {e}")))?;
                self.provider
                    .switch_chain(expected)
                    .await
                    .map_err(|e| wrong(format!("switch after registration failed: {e}")))?;
            }
            Err(e) => return Err(wrong(e.to_string())),
        }

        let active = self.provider.chain_id().await.map_err(|e| wrong(e.to_string()))?;
        if active != expected {
            return Err(wrong(format!("wallet is still on chain {active}")));
        }
        Ok(())
    }
}
