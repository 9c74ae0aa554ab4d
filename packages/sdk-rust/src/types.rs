//! View-facing values derived from a [`SessionState`] snapshot.
//!
//! Nothing here talks to the network; a [`SwapView`] is a pure function of
//! the snapshot and the static configuration.

use alloy::primitives::{Address, B256, U256};
use serde::Serialize;

use crate::amount::{display_amount, format_amount, parse_positive};
use crate::config::SwapConfig;
use crate::state::{SessionState, TxKind, TxState};
use crate::tokens::{Token, TradeDirection};

/// Swap rate of the pegged pool.
pub const RATE_LABEL: &str = "1:1";

// ─── View structs ─────────────────────────────────────────────────────────────

/// One side of the trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenView {
    pub symbol:      String,
    pub address:     Address,
    /// Truncated label, `"0.00"` when empty.
    pub balance:     String,
    pub balance_raw: U256,
    pub fetched:     bool,
}

/// The primary button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionView {
    pub label:   String,
    pub enabled: bool,
}

/// Status line for one transaction lane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub kind:         TxKind,
    pub message:      String,
    pub hash:         Option<B256>,
    pub explorer_url: Option<String>,
    pub in_flight:    bool,
}

/// Everything a front end renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapView {
    pub connected:         bool,
    pub account:           Option<Address>,
    pub chain_id:          u64,
    pub direction:         TradeDirection,
    pub input:             TokenView,
    pub output:            TokenView,
    pub allowance:         String,
    pub amount:            String,
    /// Output the user receives; equals the input at the pegged rate.
    pub quote:             String,
    pub rate:              &'static str,
    pub requires_approval: bool,
    pub action:            ActionView,
    pub swap_status:       Option<StatusView>,
    pub claim_status:      Option<StatusView>,
    pub claimed:           bool,
}

impl SwapView {
    pub fn new(config: &SwapConfig, state: &SessionState) -> Self {
        let tokens = config.tokens();
        let input = tokens.input(state.direction);
        let output = tokens.output(state.direction);
        let actionable = parse_positive(&state.amount, input.decimals).is_ok();
        let requires_approval = state.requires_approval(input.decimals);

        Self {
            connected: state.is_connected(),
            account: state.account(),
            chain_id: config.chain.chain_id,
            direction: state.direction,
            input: token_view(input, state.input_balance().value, state.input_balance().fetched),
            output: token_view(output, state.output_balance().value, state.output_balance().fetched),
            allowance: format_amount(state.input_allowance().value, input.decimals),
            amount: state.amount.clone(),
            quote: if actionable { state.amount.trim().to_string() } else { String::new() },
            rate: RATE_LABEL,
            requires_approval,
            action: action_view(state, input, actionable, requires_approval),
            swap_status: status_view(config, &state.swap_tx.state),
            claim_status: status_view(config, &state.claim_tx.state),
            claimed: state.claimed.value,
        }
    }
}

fn token_view(token: &Token, balance: U256, fetched: bool) -> TokenView {
    TokenView {
        symbol: token.symbol.clone(),
        address: token.address,
        balance: display_amount(balance, token.decimals),
        balance_raw: balance,
        fetched,
    }
}

fn action_view(
    state:             &SessionState,
    input:             &Token,
    actionable:        bool,
    requires_approval: bool,
) -> ActionView {
    if !state.is_connected() {
        return ActionView { label: "Connect Wallet".into(), enabled: true };
    }
    let label = match &state.swap_tx.state {
        s if s.is_in_flight() => match s.kind() {
            Some(TxKind::Approval) => "Approving...".to_string(),
            _ => "Swapping...".to_string(),
        },
        _ if requires_approval => format!("Approve {}", input.symbol),
        _ => "Swap".to_string(),
    };
    ActionView { label, enabled: actionable && !state.in_flight() }
}

/// Human-readable line for a lane, `None` when idle.
pub fn status_message(state: &TxState) -> Option<String> {
    let message = match state {
        TxState::Idle => return None,
        TxState::Submitting { kind } => match kind {
            TxKind::Approval => "Confirm approval in your wallet...".to_string(),
            TxKind::Swap => "Confirm swap in your wallet...".to_string(),
            TxKind::Claim => "Confirm claim in your wallet...".to_string(),
        },
        TxState::AwaitingConfirmation { kind, .. } => match kind {
            TxKind::Approval => "Waiting for approval confirmation...".to_string(),
            TxKind::Swap => "Waiting for swap confirmation...".to_string(),
            TxKind::Claim => "Waiting for claim confirmation...".to_string(),
        },
        TxState::Succeeded { kind, .. } => match kind {
            TxKind::Approval => "Approval confirmed!".to_string(),
            TxKind::Swap => "Swap successful!".to_string(),
            TxKind::Claim => "Tokens claimed!".to_string(),
        },
        TxState::Failed { kind, reason, .. } => match kind {
            TxKind::Approval => format!("Approval failed: {reason}"),
            TxKind::Swap => format!("Swap failed: {reason}"),
            TxKind::Claim => format!("Claim failed: {reason}"),
        },
    };
    Some(message)
}

fn status_view(config: &SwapConfig, state: &TxState) -> Option<StatusView> {
    let message = status_message(state)?;
    let hash = state.hash();
    Some(StatusView {
        kind: state.kind()?,
        message,
        hash,
        explorer_url: hash.map(|h| config.chain.tx_url(h)),
        in_flight: state.is_in_flight(),
    })
}
