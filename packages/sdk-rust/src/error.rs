//! SDK error type.

use alloy::primitives::U256;

/// All errors returned by the Brens Swap SDK.
///
/// `ReadFailed` is the only variant the engine recovers from locally; every
/// other variant ends the current attempt and is surfaced verbatim.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── Session ──────────────────────────────────────────────────────────────
    /// No compatible wallet exists in the environment.
    #[error("No wallet provider available; configure a private key or a wallet endpoint")]
    NoProviderAvailable,

    /// An intent needs a connected account but the session is absent.
    #[error("Wallet is not connected")]
    NotConnected,

    /// The wallet could not be moved onto the expected network.
    #[error("Wrong network: expected chain {expected} ({reason})")]
    WrongNetwork { expected: u64, reason: String },

    // ── Intent validation ────────────────────────────────────────────────────
    /// Amount is empty, unparsable or non-positive.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A transaction is still submitting or awaiting confirmation.
    #[error("Another transaction is already in progress")]
    OperationInProgress,

    /// The cached allowance does not cover the requested swap amount.
    #[error("Approval required: amount {required} exceeds allowance {allowance}")]
    ApprovalRequired { required: U256, allowance: U256 },

    // ── Transaction lifecycle ────────────────────────────────────────────────
    /// The user declined the request in their wallet.
    #[error("Request rejected in wallet")]
    UserRejected,

    /// The transaction was not accepted by the network.
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    /// The transaction was accepted but reverted or never confirmed.
    #[error("Confirmation failed: {0}")]
    ConfirmationFailed(String),

    // ── Faucet ───────────────────────────────────────────────────────────────
    #[error("Tokens already claimed for this account")]
    AlreadyClaimed,

    #[error("Faucet has insufficient balance")]
    InsufficientFaucetBalance,

    #[error("Claim failed: {0}")]
    ClaimFailed(String),

    // ── Reads ────────────────────────────────────────────────────────────────
    /// A read query failed. Recovered locally; the cached value is kept.
    #[error("Read failed: {0}")]
    ReadFailed(String),

    // ── Configuration / persistence ──────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;
