//! In-memory wallet simulating the token, router and faucet contracts.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use alloy::{
    primitives::{address, Address, Bytes, B256, U256},
    rpc::types::TransactionRequest,
    sol_types::{SolCall, SolValue},
};
use async_trait::async_trait;
use brens_swap_sdk::{
    abi::{IFaucet, ISimpleSwapRouter, IERC20},
    config::ChainDescriptor,
    SwapClient, SwapConfig, WalletError, WalletProvider,
};
use tokio::sync::Notify;

pub const USER: Address = address!("0x00000000000000000000000000000000000000aa");
pub const ONE: u128 = 1_000_000_000_000_000_000;

pub fn units(whole: u128) -> U256 {
    U256::from(whole * ONE)
}

// ─── Chain model ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Chain {
    pub chain_id:        u64,
    pub known_chains:    HashSet<u64>,
    pub balances:        HashMap<(Address, Address), U256>,
    pub allowances:      HashMap<(Address, Address, Address), U256>,
    pub claimed:         HashSet<Address>,
    pub claim_amount:    U256,
    pub faucet_reserve:  U256,

    // Failure injection
    pub unavailable:          bool,
    pub reject_connect:       bool,
    pub reject_switch:        bool,
    pub reject_add:           bool,
    pub ignore_switch:        bool,
    pub reject_next_send:     bool,
    pub revert_next_receipt:  bool,
    pub failing_reads:        HashSet<Address>,

    // Counters
    pub calls:           usize,
    pub sends:           usize,
    pub switch_requests: usize,
    pub add_requests:    usize,

    receipts: HashMap<B256, bool>,
}

/// Mock wallet backed by [`Chain`].
pub struct MockWallet {
    pub config:   SwapConfig,
    pub account:  Address,
    chain:        Mutex<Chain>,
    hold_sends:   AtomicBool,
    hold:         AtomicBool,
    gate:         Notify,
}

impl MockWallet {
    pub fn new(config: &SwapConfig) -> Arc<Self> {
        let chain = Chain {
            chain_id:       config.chain.chain_id,
            known_chains:   HashSet::from([config.chain.chain_id]),
            claim_amount:   units(1_000),
            faucet_reserve: units(1_000_000),
            ..Chain::default()
        };
        Arc::new(Self {
            config:  config.clone(),
            account: USER,
            chain:      Mutex::new(chain),
            hold_sends: AtomicBool::new(false),
            hold:       AtomicBool::new(false),
            gate:    Notify::new(),
        })
    }

    /// Inspect or mutate the simulated chain.
    pub fn with<R>(&self, f: impl FnOnce(&mut Chain) -> R) -> R {
        f(&mut self.chain.lock().unwrap())
    }

    pub fn token_a(&self) -> Address {
        self.config.token_a.address
    }

    pub fn token_b(&self) -> Address {
        self.config.token_b.address
    }

    pub fn set_balance(&self, token: Address, amount: U256) {
        self.with(|c| c.balances.insert((token, self.account), amount));
    }

    pub fn balance(&self, token: Address) -> U256 {
        self.with(|c| c.balances.get(&(token, self.account)).copied().unwrap_or_default())
    }

    pub fn set_allowance(&self, token: Address, amount: U256) {
        let router = self.config.contracts.router;
        self.with(|c| c.allowances.insert((token, self.account, router), amount));
    }

    pub fn sends(&self) -> usize {
        self.with(|c| c.sends)
    }

    pub fn calls(&self) -> usize {
        self.with(|c| c.calls)
    }

    /// Make `send_transaction` block until [`release_sends`](Self::release_sends),
    /// as if the wallet prompt were still open.
    pub fn hold_sends(&self) {
        self.hold_sends.store(true, Ordering::SeqCst);
    }

    pub fn release_sends(&self) {
        self.hold_sends.store(false, Ordering::SeqCst);
        self.gate.notify_waiters();
    }

    /// Make `wait_for_receipt` block until [`release`](Self::release).
    pub fn hold_receipts(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.hold.store(false, Ordering::SeqCst);
        self.gate.notify_waiters();
    }

    async fn pass(&self, held: &AtomicBool) {
        loop {
            let notified = self.gate.notified();
            if !held.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }

    fn next_hash(chain: &mut Chain) -> B256 {
        B256::with_last_byte(chain.sends as u8)
    }

    fn execute(&self, chain: &mut Chain, to: Address, input: &[u8]) -> Result<(), WalletError> {
        let router = self.config.contracts.router;
        let faucet = self.config.contracts.faucet;
        let revert = |reason: &str| Err(WalletError::Reverted(reason.to_string()));

        if to == self.token_a() || to == self.token_b() {
            let call = IERC20::approveCall::abi_decode(input)
                .map_err(|e| WalletError::Rpc(e.to_string()))?;
            chain.allowances.insert((to, self.account, call.spender), call.amount);
            return Ok(());
        }

        if to == router {
            let call = ISimpleSwapRouter::swapCall::abi_decode(input)
                .map_err(|e| WalletError::Rpc(e.to_string()))?;
            let (input_token, output_token) = if call.params.zeroForOne {
                (call.key.currency0, call.key.currency1)
            } else {
                (call.key.currency1, call.key.currency0)
            };
            if !call.params.amountSpecified.is_negative() {
                return revert("exact output not supported");
            }
            let amount = call.params.amountSpecified.unsigned_abs();
            let allowance_key = (input_token, self.account, router);
            let allowance = chain.allowances.get(&allowance_key).copied().unwrap_or_default();
            if allowance < amount {
                return revert("ERC20: insufficient allowance");
            }
            let balance = chain.balances.get(&(input_token, self.account)).copied().unwrap_or_default();
            if balance < amount {
                return revert("ERC20: transfer amount exceeds balance");
            }
            chain.allowances.insert(allowance_key, allowance - amount);
            chain.balances.insert((input_token, self.account), balance - amount);
            *chain.balances.entry((output_token, self.account)).or_default() += amount;
            return Ok(());
        }

        if to == faucet {
            IFaucet::claimTokensCall::abi_decode(input).map_err(|e| WalletError::Rpc(e.to_string()))?;
            if chain.claimed.contains(&self.account) {
                return revert("Already claimed");
            }
            let payout = chain.claim_amount;
            if chain.faucet_reserve < payout {
                return revert("Insufficient faucet balance");
            }
            chain.faucet_reserve -= payout;
            chain.claimed.insert(self.account);
            for token in [self.token_a(), self.token_b()] {
                *chain.balances.entry((token, self.account)).or_default() += payout;
            }
            return Ok(());
        }

        revert("unknown contract")
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_account(&self) -> Result<Address, WalletError> {
        self.with(|c| {
            if c.unavailable {
                Err(WalletError::Unavailable)
            } else if c.reject_connect {
                Err(WalletError::UserRejected)
            } else {
                Ok(self.account)
            }
        })
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.with(|c| c.chain_id))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        self.with(|c| {
            c.switch_requests += 1;
            if c.reject_switch {
                return Err(WalletError::UserRejected);
            }
            if !c.known_chains.contains(&chain_id) {
                return Err(WalletError::UnknownChain(chain_id));
            }
            if !c.ignore_switch {
                c.chain_id = chain_id;
            }
            Ok(())
        })
    }

    async fn add_chain(&self, chain: &ChainDescriptor) -> Result<(), WalletError> {
        self.with(|c| {
            c.add_requests += 1;
            if c.reject_add {
                return Err(WalletError::UserRejected);
            }
            c.known_chains.insert(chain.chain_id);
            Ok(())
        })
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, WalletError> {
        let to = tx.to.and_then(|kind| kind.to().copied()).unwrap_or_default();
        let input = tx.input.input().cloned().unwrap_or_default();
        self.with(|c| {
            c.calls += 1;
            if c.failing_reads.contains(&to) {
                return Err(WalletError::Rpc("request timed out".into()));
            }
            let selector: [u8; 4] = input
                .get(..4)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| WalletError::Rpc("missing selector".into()))?;
            let encoded = if selector == IERC20::balanceOfCall::SELECTOR {
                let call = IERC20::balanceOfCall::abi_decode(&input)
                    .map_err(|e| WalletError::Rpc(e.to_string()))?;
                c.balances.get(&(to, call.account)).copied().unwrap_or_default().abi_encode()
            } else if selector == IERC20::allowanceCall::SELECTOR {
                let call = IERC20::allowanceCall::abi_decode(&input)
                    .map_err(|e| WalletError::Rpc(e.to_string()))?;
                c.allowances
                    .get(&(to, call.owner, call.spender))
                    .copied()
                    .unwrap_or_default()
                    .abi_encode()
            } else if selector == IFaucet::hasClaimedCall::SELECTOR {
                let call = IFaucet::hasClaimedCall::abi_decode(&input)
                    .map_err(|e| WalletError::Rpc(e.to_string()))?;
                c.claimed.contains(&call.user).abi_encode()
            } else if selector == IFaucet::CLAIM_AMOUNTCall::SELECTOR {
                c.claim_amount.abi_encode()
            } else {
                return Err(WalletError::Reverted("unknown selector".into()));
            };
            Ok(Bytes::from(encoded))
        })
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, WalletError> {
        let to = tx.to.and_then(|kind| kind.to().copied()).unwrap_or_default();
        let input = tx.input.input().cloned().unwrap_or_default();
        self.pass(&self.hold_sends).await;
        let mut guard = self.chain.lock().unwrap();
        let chain = &mut *guard;
        chain.sends += 1;
        if std::mem::take(&mut chain.reject_next_send) {
            return Err(WalletError::UserRejected);
        }
        let hash = Self::next_hash(chain);
        if std::mem::take(&mut chain.revert_next_receipt) {
            chain.receipts.insert(hash, false);
            return Ok(hash);
        }
        self.execute(chain, to, &input)?;
        chain.receipts.insert(hash, true);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: B256) -> Result<bool, WalletError> {
        self.pass(&self.hold).await;
        self.with(|c| c.receipts.get(&hash).copied())
            .ok_or_else(|| WalletError::Rpc(format!("unknown transaction {hash}")))
    }
}

// ─── Client helpers ───────────────────────────────────────────────────────────

/// Built-in configuration with the display window disabled.
pub fn config() -> SwapConfig {
    SwapConfig::unichain_sepolia().with_display_window(std::time::Duration::ZERO)
}

pub fn client(mock: &Arc<MockWallet>) -> SwapClient {
    SwapClient::new(mock.config.clone())
        .unwrap()
        .with_wallet(mock.clone())
}

/// Mock with 100 of each token and no allowance.
pub fn funded() -> Arc<MockWallet> {
    let mock = MockWallet::new(&config());
    mock.set_balance(mock.token_a(), units(100));
    mock.set_balance(mock.token_b(), units(100));
    mock
}
