//! Read-only chain queries: balances, router allowances and faucet status.
//!
//! Every read goes through the session's wallet channel as an `eth_call`.
//! Failures come back as [`Error::ReadFailed`]; the caller decides whether to
//! keep its cached value.

use alloy::{
    primitives::{Address, U256},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};
use tracing::warn;

use crate::abi::{IFaucet, IERC20};
use crate::error::{Error, Result};
use crate::instructions::{
    allowance_request, balance_of_request, claim_amount_request, has_claimed_request,
};
use crate::wallet::WalletSession;

/// Stateless reader over one wallet session.
#[derive(Debug, Clone, Copy)]
pub struct BalanceAllowanceReader<'a> {
    session: &'a WalletSession,
}

impl<'a> BalanceAllowanceReader<'a> {
    pub fn new(session: &'a WalletSession) -> Self {
        Self { session }
    }

    async fn call<C: SolCall>(&self, tx: TransactionRequest) -> Result<C::Return> {
        let raw = self
            .session
            .provider()
            .call(tx)
            .await
            .map_err(|e| Error::ReadFailed(e.to_string()))?;
        C::abi_decode_returns(&raw).map_err(|e| Error::ReadFailed(format!("decode: {e}")))
    }

    pub async fn balance_of(&self, token: Address, account: Address) -> Result<U256> {
        self.call::<IERC20::balanceOfCall>(balance_of_request(token, account)).await
    }

    pub async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        self.call::<IERC20::allowanceCall>(allowance_request(token, owner, spender))
            .await
    }

    /// Both balances, read concurrently. Each result stands on its own.
    pub async fn read_balances(
        &self,
        account: Address,
        token_a: Address,
        token_b: Address,
    ) -> (Result<U256>, Result<U256>) {
        let (a, b) = tokio::join!(
            self.balance_of(token_a, account),
            self.balance_of(token_b, account),
        );
        for (token, result) in [(token_a, &a), (token_b, &b)] {
            if let Err(e) = result {
                warn!(%token, %account, error = %e, "balance read failed");
            }
        }
        (a, b)
    }

    /// Allowance `owner` granted to `spender` on both tokens, read concurrently.
    pub async fn read_allowances(
        &self,
        owner:   Address,
        spender: Address,
        token_a: Address,
        token_b: Address,
    ) -> (Result<U256>, Result<U256>) {
        let (a, b) = tokio::join!(
            self.allowance(token_a, owner, spender),
            self.allowance(token_b, owner, spender),
        );
        for (token, result) in [(token_a, &a), (token_b, &b)] {
            if let Err(e) = result {
                warn!(%token, %owner, error = %e, "allowance read failed");
            }
        }
        (a, b)
    }

    pub async fn has_claimed(&self, faucet: Address, user: Address) -> Result<bool> {
        self.call::<IFaucet::hasClaimedCall>(has_claimed_request(faucet, user)).await
    }

    pub async fn claim_amount(&self, faucet: Address) -> Result<U256> {
        self.call::<IFaucet::CLAIM_AMOUNTCall>(claim_amount_request(faucet)).await
    }
}
