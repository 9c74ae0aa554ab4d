//! Transaction lifecycle and the session snapshot published to observers.
//!
//! ```text
//! Idle ─begin─▶ Submitting ─accept─▶ AwaitingConfirmation ─succeed─▶ Succeeded
//!                   │                        │                           │
//!                   └────────fail────────────┴──────▶ Failed ──expire────┴─▶ Idle
//! ```
//!
//! Every transition returns whether it applied. An invalid transition leaves
//! the record untouched.

use alloy::primitives::{Address, B256, U256};
use serde::Serialize;

use crate::amount::parse_positive;
use crate::approval::requires_approval;
use crate::error::{Error, Result};
use crate::tokens::TradeDirection;
use crate::wallet::WalletSession;

// ─── Transaction state ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Approval,
    Swap,
    Claim,
}

impl TxKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Approval => "approval",
            Self::Swap => "swap",
            Self::Claim => "claim",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TxState {
    #[default]
    Idle,
    Submitting {
        kind: TxKind,
    },
    AwaitingConfirmation {
        kind: TxKind,
        hash: B256,
    },
    Succeeded {
        kind: TxKind,
        hash: B256,
    },
    Failed {
        kind:   TxKind,
        /// Present when the failure happened after network acceptance.
        hash:   Option<B256>,
        reason: String,
    },
}

impl TxState {
    pub fn kind(&self) -> Option<TxKind> {
        match self {
            Self::Idle => None,
            Self::Submitting { kind }
            | Self::AwaitingConfirmation { kind, .. }
            | Self::Succeeded { kind, .. }
            | Self::Failed { kind, .. } => Some(*kind),
        }
    }

    /// Hash assigned by the network, once accepted.
    pub fn hash(&self) -> Option<B256> {
        match self {
            Self::Idle | Self::Submitting { .. } => None,
            Self::AwaitingConfirmation { hash, .. } | Self::Succeeded { hash, .. } => Some(*hash),
            Self::Failed { hash, .. } => *hash,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Submitting { .. } | Self::AwaitingConfirmation { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }
}

// ─── TransactionRecord ────────────────────────────────────────────────────────

/// One lane of the state machine: the current attempt and its sequence number.
///
/// `seq` increases on every `begin`, so completions and expiry timers can
/// tell whether they still refer to the attempt on display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub seq:   u64,
    pub state: TxState,
}

impl TransactionRecord {
    /// Start a new attempt from `Idle` or a terminal state. Returns its seq.
    pub fn begin(&mut self, kind: TxKind) -> Option<u64> {
        match self.state {
            TxState::Idle | TxState::Succeeded { .. } | TxState::Failed { .. } => {
                self.seq += 1;
                self.state = TxState::Submitting { kind };
                Some(self.seq)
            }
            TxState::Submitting { .. } | TxState::AwaitingConfirmation { .. } => None,
        }
    }

    pub fn accept(&mut self, seq: u64, hash: B256) -> bool {
        if seq != self.seq {
            return false;
        }
        match self.state {
            TxState::Submitting { kind } => {
                self.state = TxState::AwaitingConfirmation { kind, hash };
                true
            }
            TxState::Idle
            | TxState::AwaitingConfirmation { .. }
            | TxState::Succeeded { .. }
            | TxState::Failed { .. } => false,
        }
    }

    pub fn succeed(&mut self, seq: u64) -> bool {
        if seq != self.seq {
            return false;
        }
        match self.state {
            TxState::AwaitingConfirmation { kind, hash } => {
                self.state = TxState::Succeeded { kind, hash };
                true
            }
            TxState::Idle
            | TxState::Submitting { .. }
            | TxState::Succeeded { .. }
            | TxState::Failed { .. } => false,
        }
    }

    pub fn fail(&mut self, seq: u64, reason: impl Into<String>) -> bool {
        if seq != self.seq {
            return false;
        }
        let (kind, hash) = match self.state {
            TxState::Submitting { kind } => (kind, None),
            TxState::AwaitingConfirmation { kind, hash } => (kind, Some(hash)),
            TxState::Idle | TxState::Succeeded { .. } | TxState::Failed { .. } => return false,
        };
        self.state = TxState::Failed { kind, hash, reason: reason.into() };
        true
    }

    /// Return a terminal attempt to `Idle` once its display window elapsed.
    pub fn expire(&mut self, seq: u64) -> bool {
        if seq != self.seq || !self.state.is_terminal() {
            return false;
        }
        self.state = TxState::Idle;
        true
    }

    /// Unconditionally drop whatever is on display (disconnect).
    pub fn clear(&mut self) {
        self.state = TxState::Idle;
    }
}

// ─── Cached values ────────────────────────────────────────────────────────────

/// A chain value as last seen. `value` is the default until first fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Cached<T> {
    pub value:   T,
    pub fetched: bool,
}

impl<T> Cached<T> {
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.fetched = true;
    }
}

// ─── SessionState ─────────────────────────────────────────────────────────────

/// Everything an observer needs to render the engine, published on every
/// change.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Incremented on every connect and disconnect.
    pub epoch:       u64,
    pub session:     Option<WalletSession>,
    pub direction:   TradeDirection,
    /// Pending amount exactly as typed.
    pub amount:      String,
    pub balance_a:   Cached<U256>,
    pub balance_b:   Cached<U256>,
    /// Allowance granted to the router, per token.
    pub allowance_a: Cached<U256>,
    pub allowance_b: Cached<U256>,
    pub claimed:     Cached<bool>,
    /// Approval and swap share this lane.
    pub swap_tx:     TransactionRecord,
    pub claim_tx:    TransactionRecord,
}

impl SessionState {
    pub fn account(&self) -> Option<Address> {
        self.session.as_ref().map(WalletSession::account)
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn in_flight(&self) -> bool {
        self.swap_tx.state.is_in_flight() || self.claim_tx.state.is_in_flight()
    }

    pub fn lane(&self, kind: TxKind) -> &TransactionRecord {
        match kind {
            TxKind::Approval | TxKind::Swap => &self.swap_tx,
            TxKind::Claim => &self.claim_tx,
        }
    }

    pub fn lane_mut(&mut self, kind: TxKind) -> &mut TransactionRecord {
        match kind {
            TxKind::Approval | TxKind::Swap => &mut self.swap_tx,
            TxKind::Claim => &mut self.claim_tx,
        }
    }

    pub fn input_balance(&self) -> Cached<U256> {
        match self.direction {
            TradeDirection::AToB => self.balance_a,
            TradeDirection::BToA => self.balance_b,
        }
    }

    pub fn output_balance(&self) -> Cached<U256> {
        match self.direction {
            TradeDirection::AToB => self.balance_b,
            TradeDirection::BToA => self.balance_a,
        }
    }

    /// Router allowance for the token currently being sold.
    pub fn input_allowance(&self) -> Cached<U256> {
        match self.direction {
            TradeDirection::AToB => self.allowance_a,
            TradeDirection::BToA => self.allowance_b,
        }
    }

    pub fn requires_approval(&self, decimals: u8) -> bool {
        requires_approval(&self.amount, decimals, self.input_allowance().value)
    }

    /// Validate an approve or swap intent against the current snapshot.
    ///
    /// Checks run in a fixed order: amount, in-flight transaction, session,
    /// then (swap only) the approval gate. Returns the parsed amount.
    pub fn check_trade_intent(&self, kind: TxKind, decimals: u8) -> Result<U256> {
        let amount = parse_positive(&self.amount, decimals)?;
        if self.in_flight() {
            return Err(Error::OperationInProgress);
        }
        if self.session.is_none() {
            return Err(Error::NotConnected);
        }
        if kind == TxKind::Swap && self.requires_approval(decimals) {
            return Err(Error::ApprovalRequired {
                required:  amount,
                allowance: self.input_allowance().value,
            });
        }
        Ok(amount)
    }

    /// Validate a claim intent. The ledger check happens in the caller.
    pub fn check_claim_intent(&self) -> Result<()> {
        if self.in_flight() {
            return Err(Error::OperationInProgress);
        }
        if self.session.is_none() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    /// Forget the session and everything read through it.
    pub fn reset_session(&mut self) {
        self.epoch += 1;
        self.session = None;
        self.balance_a = Cached::default();
        self.balance_b = Cached::default();
        self.allowance_a = Cached::default();
        self.allowance_b = Cached::default();
        self.claimed = Cached::default();
        self.swap_tx.clear();
        self.claim_tx.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(n: u8) -> B256 {
        B256::repeat_byte(n)
    }

    #[test]
    fn happy_path_keeps_hash_until_expiry() {
        let mut lane = TransactionRecord::default();
        let seq = lane.begin(TxKind::Swap).unwrap();
        assert_eq!(lane.state.hash(), None);
        assert!(lane.accept(seq, hash(1)));
        assert!(lane.state.is_in_flight());
        assert!(lane.succeed(seq));
        assert_eq!(lane.state, TxState::Succeeded { kind: TxKind::Swap, hash: hash(1) });
        assert!(lane.expire(seq));
        assert_eq!(lane.state, TxState::Idle);
    }

    #[test]
    fn no_second_begin_while_in_flight() {
        let mut lane = TransactionRecord::default();
        let seq = lane.begin(TxKind::Approval).unwrap();
        assert_eq!(lane.begin(TxKind::Swap), None);
        lane.accept(seq, hash(2));
        assert_eq!(lane.begin(TxKind::Swap), None);
        lane.fail(seq, "reverted");
        assert_eq!(lane.begin(TxKind::Swap), Some(seq + 1));
    }

    #[test]
    fn failure_records_hash_only_after_acceptance() {
        let mut lane = TransactionRecord::default();
        let seq = lane.begin(TxKind::Claim).unwrap();
        lane.fail(seq, "rejected");
        assert_eq!(lane.state.hash(), None);

        let seq = lane.begin(TxKind::Claim).unwrap();
        lane.accept(seq, hash(3));
        lane.fail(seq, "reverted");
        assert_eq!(lane.state.hash(), Some(hash(3)));
        assert_eq!(lane.state.kind(), Some(TxKind::Claim));
    }

    #[test]
    fn stale_sequence_numbers_are_ignored() {
        let mut lane = TransactionRecord::default();
        let old = lane.begin(TxKind::Swap).unwrap();
        lane.accept(old, hash(4));
        lane.succeed(old);
        let new = lane.begin(TxKind::Swap).unwrap();

        assert!(!lane.expire(old));
        assert!(!lane.accept(old, hash(5)));
        assert_eq!(lane.state, TxState::Submitting { kind: TxKind::Swap });
        assert!(!lane.expire(new), "in-flight attempts never expire");
    }

    #[test]
    fn invalid_transitions_are_noops() {
        let mut lane = TransactionRecord::default();
        assert!(!lane.succeed(0));
        assert!(!lane.fail(0, "x"));
        assert!(!lane.expire(0));
        let seq = lane.begin(TxKind::Swap).unwrap();
        assert!(!lane.succeed(seq));
        assert_eq!(lane.state, TxState::Submitting { kind: TxKind::Swap });
    }

    #[test]
    fn intent_checks_run_in_order() {
        let mut state = SessionState::default();
        assert!(matches!(
            state.check_trade_intent(TxKind::Swap, 18),
            Err(Error::InvalidAmount(_))
        ));

        state.amount = "10".into();
        state.swap_tx.begin(TxKind::Approval);
        assert!(matches!(
            state.check_trade_intent(TxKind::Swap, 18),
            Err(Error::OperationInProgress)
        ));

        state.swap_tx.clear();
        assert!(matches!(
            state.check_trade_intent(TxKind::Approval, 18),
            Err(Error::NotConnected)
        ));
        assert!(matches!(state.check_claim_intent(), Err(Error::NotConnected)));

        state.claim_tx.begin(TxKind::Claim);
        assert!(matches!(
            state.check_trade_intent(TxKind::Approval, 18),
            Err(Error::OperationInProgress)
        ));
    }

    #[test]
    fn direction_selects_cached_figures() {
        let mut state = SessionState::default();
        state.balance_a.set(U256::from(1u8));
        state.balance_b.set(U256::from(2u8));
        state.allowance_b.set(U256::from(3u8));

        assert_eq!(state.input_balance().value, U256::from(1u8));
        state.direction = TradeDirection::BToA;
        assert_eq!(state.input_balance().value, U256::from(2u8));
        assert_eq!(state.output_balance().value, U256::from(1u8));
        assert_eq!(state.input_allowance().value, U256::from(3u8));
    }

    #[test]
    fn reset_bumps_epoch_and_clears_lanes() {
        let mut state = SessionState::default();
        state.balance_a.set(U256::from(9u8));
        let seq = state.swap_tx.begin(TxKind::Swap).unwrap();
        state.reset_session();

        assert_eq!(state.epoch, 1);
        assert_eq!(state.swap_tx.state, TxState::Idle);
        assert!(!state.balance_a.fetched);
        assert!(!state.swap_tx.accept(seq, hash(6)));
    }
}
