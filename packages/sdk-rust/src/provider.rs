//! Concrete [`WalletProvider`] backends.
//!
//! - [`LocalWallet`]: embedded wallet. A local private key signs; an HTTP
//!   JSON-RPC endpoint carries reads and broadcasts.
//! - [`InjectedWallet`]: forwards EIP-1193 requests to an external wallet's
//!   JSON-RPC endpoint, which holds the keys and prompts the user.

use std::collections::HashMap;
use std::str::FromStr;

use alloy::{
    network::{EthereumWallet, ReceiptResponse},
    primitives::{Address, Bytes, B256},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder, RootProvider},
    rpc::{json_rpc::RpcError, types::TransactionRequest},
    signers::local::PrivateKeySigner,
    sol_types::decode_revert_reason,
    transports::TransportErrorKind,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::config::ChainDescriptor;
use crate::error::{Error, Result};
use crate::wallet::{WalletError, WalletProvider};

// ─── EIP-1193 error codes ─────────────────────────────────────────────────────

const USER_REJECTED_CODE: i64 = 4001;
const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

type WalletResult<T> = std::result::Result<T, WalletError>;

/// Map a JSON-RPC failure onto the wallet taxonomy.
///
/// Reverts are recognised by their ABI-encoded `Error(string)` payload first,
/// then by the node's message text.
fn classify(err: RpcError<TransportErrorKind>) -> WalletError {
    let Some(payload) = err.as_error_resp() else {
        return WalletError::Rpc(err.to_string());
    };
    if payload.code == USER_REJECTED_CODE {
        return WalletError::UserRejected;
    }
    if let Some(reason) = payload.as_revert_data().and_then(|data| decode_revert_reason(&data)) {
        return WalletError::Reverted(reason);
    }
    if payload.message.contains("revert") {
        return WalletError::Reverted(payload.message.to_string());
    }
    WalletError::Rpc(payload.message.to_string())
}

/// `wallet_switchEthereumChain` failures: 4902 means the wallet has never
/// seen `chain_id` and it must be registered first.
fn classify_switch(err: RpcError<TransportErrorKind>, chain_id: u64) -> WalletError {
    if err.as_error_resp().is_some_and(|p| p.code == UNRECOGNIZED_CHAIN_CODE) {
        return WalletError::UnknownChain(chain_id);
    }
    classify(err)
}

async fn confirm(root: &RootProvider, hash: B256) -> WalletResult<bool> {
    let receipt = PendingTransactionBuilder::new(root.clone(), hash)
        .get_receipt()
        .await
        .map_err(|e| WalletError::Rpc(e.to_string()))?;
    Ok(receipt.status())
}

// ─── LocalWallet ──────────────────────────────────────────────────────────────

/// Private-key wallet over HTTP JSON-RPC.
///
/// "Registering" a chain records its RPC endpoint; "switching" reconnects to
/// that endpoint and checks the chain id it reports.
pub struct LocalWallet {
    signer: PrivateKeySigner,
    chains: RwLock<HashMap<u64, Url>>,
    active: RwLock<DynProvider>,
}

impl LocalWallet {
    /// Start on `rpc_url`. No chain is registered until
    /// [`WalletProvider::add_chain`] is called.
    pub fn new(signer: PrivateKeySigner, rpc_url: Url) -> Self {
        let active = Self::connect(&signer, rpc_url);
        Self {
            signer,
            chains: RwLock::new(HashMap::new()),
            active: RwLock::new(active),
        }
    }

    /// Parse a hex private key (with or without `0x`).
    pub fn from_private_key(key: &str, rpc_url: Url) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(key.trim())
            .map_err(|e| Error::Config(format!("invalid private key: {e}")))?;
        Ok(Self::new(signer, rpc_url))
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    fn connect(signer: &PrivateKeySigner, rpc_url: Url) -> DynProvider {
        ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer.clone()))
            .connect_http(rpc_url)
            .erased()
    }

    async fn provider(&self) -> DynProvider {
        self.active.read().await.clone()
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn request_account(&self) -> WalletResult<Address> {
        Ok(self.signer.address())
    }

    async fn chain_id(&self) -> WalletResult<u64> {
        self.provider().await.get_chain_id().await.map_err(classify)
    }

    async fn switch_chain(&self, chain_id: u64) -> WalletResult<()> {
        let url = self
            .chains
            .read()
            .await
            .get(&chain_id)
            .cloned()
            .ok_or(WalletError::UnknownChain(chain_id))?;

        let candidate = Self::connect(&self.signer, url.clone());
        let reported = candidate.get_chain_id().await.map_err(classify)?;
        if reported != chain_id {
            return Err(WalletError::Rpc(format!(
                "endpoint {url} reports chain {reported}, not {chain_id}"
            )));
        }
        debug!(chain_id, %url, "switched rpc endpoint");
        *self.active.write().await = candidate;
        Ok(())
    }

    async fn add_chain(&self, chain: &ChainDescriptor) -> WalletResult<()> {
        self.chains
            .write()
            .await
            .insert(chain.chain_id, chain.rpc_url.clone());
        Ok(())
    }

    async fn call(&self, tx: TransactionRequest) -> WalletResult<Bytes> {
        self.provider().await.call(tx).await.map_err(classify)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> WalletResult<B256> {
        let pending = self
            .provider()
            .await
            .send_transaction(tx)
            .await
            .map_err(classify)?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, hash: B256) -> WalletResult<bool> {
        let provider = self.provider().await;
        confirm(provider.root(), hash).await
    }
}

// ─── InjectedWallet ───────────────────────────────────────────────────────────

/// External wallet reached over its EIP-1193 JSON-RPC bridge.
pub struct InjectedWallet {
    provider: RootProvider,
}

impl InjectedWallet {
    pub fn new(endpoint: Url) -> Self {
        Self { provider: RootProvider::new_http(endpoint) }
    }

    async fn request(&self, method: &'static str, params: Value) -> WalletResult<Value> {
        self.provider
            .raw_request::<_, Value>(method.into(), params)
            .await
            .map_err(classify)
    }
}

#[async_trait]
impl WalletProvider for InjectedWallet {
    async fn request_account(&self) -> WalletResult<Address> {
        let accounts: Vec<Address> = self
            .provider
            .raw_request("eth_requestAccounts".into(), json!([]))
            .await
            .map_err(|e| match classify(e) {
                WalletError::UserRejected => WalletError::UserRejected,
                _ => WalletError::Unavailable,
            })?;
        accounts.into_iter().next().ok_or(WalletError::Unavailable)
    }

    async fn chain_id(&self) -> WalletResult<u64> {
        self.provider.get_chain_id().await.map_err(classify)
    }

    async fn switch_chain(&self, chain_id: u64) -> WalletResult<()> {
        let params = json!([{ "chainId": format!("{chain_id:#x}") }]);
        self.provider
            .raw_request::<_, Value>("wallet_switchEthereumChain".into(), params)
            .await
            .map(|_| ())
            .map_err(|e| classify_switch(e, chain_id))
    }

    async fn add_chain(&self, chain: &ChainDescriptor) -> WalletResult<()> {
        let params = json!([{
            "chainId":   format!("{:#x}", chain.chain_id),
            "chainName": chain.name,
            "nativeCurrency": {
                "name":     chain.native_currency.name,
                "symbol":   chain.native_currency.symbol,
                "decimals": chain.native_currency.decimals,
            },
            "rpcUrls":           [chain.rpc_url.as_str()],
            "blockExplorerUrls": [chain.explorer_url.as_str()],
        }]);
        self.request("wallet_addEthereumChain", params).await.map(|_| ())
    }

    async fn call(&self, tx: TransactionRequest) -> WalletResult<Bytes> {
        self.provider.call(tx).await.map_err(classify)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> WalletResult<B256> {
        self.provider
            .raw_request("eth_sendTransaction".into(), (tx,))
            .await
            .map_err(classify)
    }

    async fn wait_for_receipt(&self, hash: B256) -> WalletResult<bool> {
        confirm(&self.provider, hash).await
    }
}
