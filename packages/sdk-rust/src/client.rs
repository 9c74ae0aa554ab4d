//! [`SwapClient`]: the orchestration engine front ends drive.
//!
//! The client owns a single [`SessionState`] behind a `watch` channel. Every
//! transition is published to subscribers; intents are checked and moved to
//! `Submitting` inside one `send_if_modified` closure, so two intents can
//! never both pass the in-flight check.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::{
    primitives::{Address, B256, U256},
    rpc::types::TransactionRequest,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    abi::PoolKey,
    amount::format_amount,
    config::SwapConfig,
    error::{Error, Result},
    executor::TransactionExecutor,
    faucet::{ClaimKey, ClaimLedger, FaucetClaimer},
    instructions::{approve_request, swap_params, swap_request},
    reader::BalanceAllowanceReader,
    state::{SessionState, TxKind},
    tokens::{TokenDirectory, TradeDirection},
    types::SwapView,
    wallet::{WalletProvider, WalletSession},
};

// ─── Attempt ──────────────────────────────────────────────────────────────────

/// Everything captured at the moment an intent was accepted.
struct Attempt {
    kind:      TxKind,
    session:   WalletSession,
    epoch:     u64,
    seq:       u64,
    amount:    U256,
    direction: TradeDirection,
}

// ─── Client ───────────────────────────────────────────────────────────────────

/// Approve-then-swap client for the pegged pool.
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use brens_swap_sdk::{LocalWallet, SwapClient, SwapConfig};
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SwapConfig::unichain_sepolia();
/// let wallet = LocalWallet::from_private_key("0x...", config.chain.rpc_url.clone())?;
/// let client = SwapClient::new(config)?.with_wallet(Arc::new(wallet));
///
/// client.connect().await?;
/// client.set_amount("10");
/// if client.requires_approval() {
///     client.approve().await?;
/// }
/// let hash = client.swap().await?;
/// println!("swapped: {hash}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SwapClient {
    config:   Arc<SwapConfig>,
    tokens:   TokenDirectory,
    pool_key: PoolKey,
    wallet:   Option<Arc<dyn WalletProvider>>,
    ledger:   Arc<ClaimLedger>,
    state:    Arc<watch::Sender<SessionState>>,
    sync:     Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SwapClient {
    /// Validate `config` and build a disconnected client.
    pub fn new(config: SwapConfig) -> Result<Self> {
        config.validate()?;
        let pool_key = config.pool_key()?;
        let (state, _) = watch::channel(SessionState::default());
        Ok(Self {
            tokens: config.tokens(),
            config: Arc::new(config),
            pool_key,
            wallet: None,
            ledger: Arc::new(ClaimLedger::in_memory()),
            state: Arc::new(state),
            sync: Arc::default(),
        })
    }

    /// Wallet backend used by [`connect`](Self::connect).
    pub fn with_wallet(mut self, wallet: Arc<dyn WalletProvider>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Replace the in-memory claim ledger (e.g. with a persisted one).
    pub fn with_claim_ledger(mut self, ledger: ClaimLedger) -> Self {
        self.ledger = Arc::new(ledger);
        self
    }

    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenDirectory {
        &self.tokens
    }

    pub fn pool_key(&self) -> &PoolKey {
        &self.pool_key
    }

    // ── Observation ───────────────────────────────────────────────────────────

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn view(&self) -> SwapView {
        SwapView::new(&self.config, &self.state.borrow())
    }

    pub fn account(&self) -> Option<Address> {
        self.state.borrow().account()
    }

    /// Whether an approval must precede a swap of the pending amount.
    pub fn requires_approval(&self) -> bool {
        let state = self.state.borrow();
        state.requires_approval(self.tokens.input(state.direction).decimals)
    }

    // ── Session ───────────────────────────────────────────────────────────────

    /// Acquire an account, verify the network and load balances.
    ///
    /// Replaces any previous session; its in-flight completions are dropped.
    pub async fn connect(&self) -> Result<Address> {
        let wallet = self.wallet.clone().ok_or(Error::NoProviderAvailable)?;
        let session = WalletSession::connect(wallet, self.config.chain.clone()).await?;
        let account = session.account();
        let claimed = self.ledger.contains(&self.claim_key(account));

        self.state.send_modify(|s| {
            s.reset_session();
            s.session = Some(session);
            if claimed {
                s.claimed.set(true);
            }
        });
        info!(%account, "connected");

        self.refresh().await?;
        Ok(account)
    }

    /// Drop the session and everything read through it.
    pub fn disconnect(&self) {
        self.cancel_sync();
        self.state.send_modify(SessionState::reset_session);
        info!("disconnected");
    }

    // ── Edits ─────────────────────────────────────────────────────────────────
    //
    // Every edit that changes the pair or the amount re-reads balances and
    // allowances in the background while a session is open.

    /// Flip the direction. The pending amount is always cleared.
    pub fn toggle_direction(&self) -> TradeDirection {
        let mut direction = TradeDirection::default();
        self.state.send_modify(|s| {
            s.direction = s.direction.toggled();
            s.amount.clear();
            direction = s.direction;
        });
        debug!(direction = direction.label(), "direction toggled");
        self.sync_in_background();
        direction
    }

    pub fn set_direction(&self, direction: TradeDirection) {
        let changed = self.state.send_if_modified(|s| {
            if s.direction == direction {
                return false;
            }
            s.direction = direction;
            s.amount.clear();
            true
        });
        if changed {
            self.sync_in_background();
        }
    }

    pub fn set_amount(&self, amount: impl Into<String>) {
        let amount = amount.into();
        let changed = self.state.send_if_modified(|s| {
            if s.amount == amount {
                return false;
            }
            s.amount = amount;
            true
        });
        if changed {
            self.sync_in_background();
        }
    }

    /// Fill the amount with the whole input balance and return it. An empty
    /// balance leaves the amount as it was.
    pub fn set_max_amount(&self) -> String {
        let mut amount = String::new();
        let changed = self.state.send_if_modified(|s| {
            let balance = s.input_balance().value;
            if !balance.is_zero() {
                let decimals = self.tokens.input(s.direction).decimals;
                s.amount = format_amount(balance, decimals);
            }
            amount = s.amount.clone();
            !balance.is_zero()
        });
        if changed {
            self.sync_in_background();
        }
        amount
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    /// Re-read balances, router allowances and faucet status.
    ///
    /// Individual read failures keep the previous cached value; only a
    /// missing session or a wrong network is an error.
    pub async fn refresh(&self) -> Result<()> {
        let (session, epoch) = self.current_session()?;
        session.ensure_network().await?;

        let reader = BalanceAllowanceReader::new(&session);
        let account = session.account();
        let (token_a, token_b) = (self.tokens.token_a().address, self.tokens.token_b().address);
        let ((bal_a, bal_b), (allow_a, allow_b), claimed) = tokio::join!(
            reader.read_balances(account, token_a, token_b),
            reader.read_allowances(account, self.config.contracts.router, token_a, token_b),
            reader.has_claimed(self.config.contracts.faucet, account),
        );

        let claimed = match claimed {
            Ok(true) => {
                self.record_claim(account);
                Some(true)
            }
            Ok(false) => Some(self.ledger.contains(&self.claim_key(account))),
            Err(e) => {
                warn!(%account, error = %e, "faucet status read failed");
                None
            }
        };

        self.update(epoch, |s| {
            if let Ok(v) = bal_a {
                s.balance_a.set(v);
            }
            if let Ok(v) = bal_b {
                s.balance_b.set(v);
            }
            if let Ok(v) = allow_a {
                s.allowance_a.set(v);
            }
            if let Ok(v) = allow_b {
                s.allowance_b.set(v);
            }
            if let Some(v) = claimed {
                s.claimed.set(v);
            }
            true
        });
        Ok(())
    }

    /// Whether the connected account has claimed from the faucet.
    pub async fn has_claimed(&self) -> Result<bool> {
        let (session, epoch) = self.current_session()?;
        let account = session.account();
        if self.ledger.contains(&self.claim_key(account)) {
            return Ok(true);
        }
        session.ensure_network().await?;
        let claimed = FaucetClaimer::new(&session, self.config.contracts.faucet)
            .has_claimed()
            .await?;
        if claimed {
            self.record_claim(account);
        }
        self.update(epoch, |s| {
            s.claimed.set(claimed);
            true
        });
        Ok(claimed)
    }

    /// Amount of each token the faucet hands out.
    pub async fn claim_amount(&self) -> Result<U256> {
        let (session, _) = self.current_session()?;
        session.ensure_network().await?;
        FaucetClaimer::new(&session, self.config.contracts.faucet)
            .claim_amount()
            .await
    }

    // ── Intents ───────────────────────────────────────────────────────────────

    /// Approve the router to spend exactly the pending amount of the input
    /// token. On confirmation the allowance is re-read.
    pub async fn approve(&self) -> Result<B256> {
        let attempt = self.begin_trade(TxKind::Approval)?;
        let token = self.tokens.input(attempt.direction).address;
        info!(%token, amount = %attempt.amount, "approving router");

        let tx = approve_request(
            attempt.session.account(),
            token,
            self.config.contracts.router,
            attempt.amount,
        );
        let hash = self.drive(&attempt, tx).await?;

        if self.is_current(attempt.epoch) {
            let result = BalanceAllowanceReader::new(&attempt.session)
                .allowance(token, attempt.session.account(), self.config.contracts.router)
                .await;
            match result {
                Ok(value) => {
                    self.update(attempt.epoch, |s| {
                        let slot = if token == self.tokens.token_a().address {
                            &mut s.allowance_a
                        } else {
                            &mut s.allowance_b
                        };
                        slot.set(value);
                        true
                    });
                }
                Err(e) => warn!(%token, error = %e, "allowance refresh failed"),
            }
        }
        Ok(hash)
    }

    /// Exact-input swap of the pending amount. Rejected with
    /// [`Error::ApprovalRequired`] while the cached allowance is short.
    ///
    /// On confirmation both balances are re-read and the amount is cleared.
    pub async fn swap(&self) -> Result<B256> {
        let attempt = self.begin_trade(TxKind::Swap)?;
        let input = self.tokens.input(attempt.direction).address;

        let params = match swap_params(&self.pool_key, input, attempt.amount) {
            Ok(params) => params,
            Err(e) => {
                self.fail(&attempt, &e);
                return Err(e);
            }
        };
        info!(
            zero_for_one = params.zeroForOne,
            amount = %attempt.amount,
            "swapping"
        );

        let tx = swap_request(
            attempt.session.account(),
            self.config.contracts.router,
            &self.pool_key,
            params,
        );
        let hash = self.drive(&attempt, tx).await?;

        if self.is_current(attempt.epoch) {
            self.update(attempt.epoch, |s| {
                s.amount.clear();
                true
            });
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "post-swap refresh failed");
            }
        }
        Ok(hash)
    }

    /// Claim test tokens. A second claim for the same account is rejected
    /// with [`Error::AlreadyClaimed`] before any network call.
    pub async fn claim(&self) -> Result<B256> {
        let attempt = self.begin_claim()?;
        let account = attempt.session.account();
        let claimer = FaucetClaimer::new(&attempt.session, self.config.contracts.faucet);
        info!(%account, "claiming from faucet");

        let hash = match claimer.submit().await {
            Ok(hash) => hash,
            Err(e) => {
                if matches!(e, Error::AlreadyClaimed) {
                    self.record_claim(account);
                }
                self.fail(&attempt, &e);
                return Err(e);
            }
        };
        self.accept(&attempt, hash);

        if let Err(e) = claimer.confirm(hash).await {
            self.fail(&attempt, &e);
            return Err(e);
        }
        self.record_claim(account);
        self.succeed(&attempt);

        if self.is_current(attempt.epoch) {
            self.update(attempt.epoch, |s| {
                s.claimed.set(true);
                true
            });
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "post-claim refresh failed");
            }
        }
        Ok(hash)
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn current_session(&self) -> Result<(WalletSession, u64)> {
        let state = self.state.borrow();
        let session = state.session.clone().ok_or(Error::NotConnected)?;
        Ok((session, state.epoch))
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.state.borrow().epoch == epoch
    }

    /// Apply `f` unless the session it belongs to has been replaced.
    fn update(&self, epoch: u64, f: impl FnOnce(&mut SessionState) -> bool) -> bool {
        self.state.send_if_modified(|s| s.epoch == epoch && f(s))
    }

    fn begin_trade(&self, kind: TxKind) -> Result<Attempt> {
        let mut outcome = Err(Error::NotConnected);
        self.state.send_if_modified(|s| {
            let decimals = self.tokens.input(s.direction).decimals;
            let checked = s.check_trade_intent(kind, decimals).and_then(|amount| {
                let session = s.session.clone().ok_or(Error::NotConnected)?;
                Ok((amount, session))
            });
            let (amount, session) = match checked {
                Ok(ok) => ok,
                Err(e) => {
                    outcome = Err(e);
                    return false;
                }
            };
            let Some(seq) = Self::begin_lane(s, kind) else {
                outcome = Err(Error::OperationInProgress);
                return false;
            };
            outcome = Ok(Attempt {
                kind,
                session,
                epoch: s.epoch,
                seq,
                amount,
                direction: s.direction,
            });
            true
        });
        match &outcome {
            Ok(_) => self.cancel_sync(),
            Err(e) => debug!(kind = kind.label(), error = %e, "intent rejected"),
        }
        outcome
    }

    fn begin_claim(&self) -> Result<Attempt> {
        let mut outcome = Err(Error::NotConnected);
        self.state.send_if_modified(|s| {
            if let Err(e) = s.check_claim_intent() {
                outcome = Err(e);
                return false;
            }
            let Some(session) = s.session.clone() else {
                return false;
            };
            if s.claimed.value || self.ledger.contains(&self.claim_key(session.account())) {
                outcome = Err(Error::AlreadyClaimed);
                return false;
            }
            let Some(seq) = Self::begin_lane(s, TxKind::Claim) else {
                outcome = Err(Error::OperationInProgress);
                return false;
            };
            outcome = Ok(Attempt {
                kind: TxKind::Claim,
                session,
                epoch: s.epoch,
                seq,
                amount: U256::ZERO,
                direction: s.direction,
            });
            true
        });
        match &outcome {
            Ok(_) => self.cancel_sync(),
            Err(e) => debug!(error = %e, "claim rejected"),
        }
        outcome
    }

    /// Move the lane for `kind` to `Submitting`; a terminal status on the
    /// other lane is dismissed along with it.
    fn begin_lane(s: &mut SessionState, kind: TxKind) -> Option<u64> {
        let seq = s.lane_mut(kind).begin(kind)?;
        let other = match kind {
            TxKind::Approval | TxKind::Swap => &mut s.claim_tx,
            TxKind::Claim => &mut s.swap_tx,
        };
        if other.state.is_terminal() {
            other.clear();
        }
        Some(seq)
    }

    /// Submit and confirm, publishing each step.
    async fn drive(&self, attempt: &Attempt, tx: TransactionRequest) -> Result<B256> {
        let executor = TransactionExecutor::new(&attempt.session);
        let hash = match executor.submit(attempt.kind, tx).await {
            Ok(hash) => hash,
            Err(e) => {
                self.fail(attempt, &e);
                return Err(e);
            }
        };
        self.accept(attempt, hash);

        if let Err(e) = executor.confirm(attempt.kind, hash).await {
            self.fail(attempt, &e);
            return Err(e);
        }
        self.succeed(attempt);
        Ok(hash)
    }

    fn accept(&self, attempt: &Attempt, hash: B256) {
        if self.update(attempt.epoch, |s| s.lane_mut(attempt.kind).accept(attempt.seq, hash)) {
            debug!(kind = attempt.kind.label(), %hash, "awaiting confirmation");
        }
    }

    fn succeed(&self, attempt: &Attempt) {
        // A background read begun before confirmation must not overwrite
        // the post-confirmation reads.
        self.cancel_sync();
        if self.update(attempt.epoch, |s| s.lane_mut(attempt.kind).succeed(attempt.seq)) {
            info!(kind = attempt.kind.label(), seq = attempt.seq, "transaction confirmed");
            self.schedule_expiry(attempt);
        } else {
            debug!(kind = attempt.kind.label(), "stale confirmation discarded");
        }
    }

    fn fail(&self, attempt: &Attempt, err: &Error) {
        let reason = err.to_string();
        if self.update(attempt.epoch, |s| s.lane_mut(attempt.kind).fail(attempt.seq, reason)) {
            error!(kind = attempt.kind.label(), error = %err, "transaction failed");
            self.schedule_expiry(attempt);
        }
    }

    /// Return the lane to `Idle` once the display window elapses, unless a
    /// newer attempt has replaced it by then.
    fn schedule_expiry(&self, attempt: &Attempt) {
        let Some(window) = self.config.display_window() else {
            return;
        };
        let state = Arc::clone(&self.state);
        let (kind, epoch, seq) = (attempt.kind, attempt.epoch, attempt.seq);
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            state.send_if_modified(|s| s.epoch == epoch && s.lane_mut(kind).expire(seq));
        });
    }

    /// Start a refresh for the current session, superseding one still
    /// running. A no-op while disconnected or outside a runtime.
    fn sync_in_background(&self) {
        if !self.state.borrow().is_connected() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let client = self.clone();
        let task = runtime.spawn(async move {
            if let Err(e) = client.refresh().await {
                debug!(error = %e, "background refresh failed");
            }
        });
        if let Some(previous) = self.lock_sync().replace(task) {
            previous.abort();
        }
    }

    fn cancel_sync(&self) {
        if let Some(task) = self.lock_sync().take() {
            task.abort();
        }
    }

    fn lock_sync(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.sync.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim_key(&self, account: Address) -> ClaimKey {
        ClaimKey {
            chain_id: self.config.chain.chain_id,
            faucet:   self.config.contracts.faucet,
            account,
        }
    }

    fn record_claim(&self, account: Address) {
        if let Err(e) = self.ledger.mark(self.claim_key(account)) {
            warn!(%account, error = %e, "could not persist claim ledger");
        }
    }
}
