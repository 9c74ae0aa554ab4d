//! Brens Swap Rust SDK
//!
//! Client-side orchestration for swapping two pegged tokens 1:1 through a
//! Uniswap v4 pool. The engine acquires a wallet session on the right
//! network, keeps balances and router allowances in sync, enforces
//! approve-before-swap, and drives every transaction through an explicit
//! state machine that front ends observe over a `watch` channel.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use brens_swap_sdk::{LocalWallet, SwapClient, SwapConfig, TxState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SwapConfig::unichain_sepolia();
//!     let wallet = LocalWallet::from_private_key("0x...", config.chain.rpc_url.clone())?;
//!     let client = SwapClient::new(config)?.with_wallet(Arc::new(wallet));
//!
//!     // Print every status change
//!     let mut rx = client.subscribe();
//!     tokio::spawn(async move {
//!         while rx.changed().await.is_ok() {
//!             if let TxState::AwaitingConfirmation { hash, .. } = &rx.borrow().swap_tx.state {
//!                 println!("pending: {hash}");
//!             }
//!         }
//!     });
//!
//!     client.connect().await?;
//!     client.set_amount("10");
//!
//!     // 1. Approve the router if the allowance is short
//!     if client.requires_approval() {
//!         client.approve().await?;
//!     }
//!
//!     // 2. Swap at the pegged rate
//!     let hash = client.swap().await?;
//!     println!("Swapped! {}", client.config().chain.tx_url(hash));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature Overview
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`SwapClient::connect`] | Acquire an account, switch/register the network, load balances |
//! | [`SwapClient::refresh`] | Re-read balances, allowances and faucet status |
//! | [`SwapClient::approve`] | Approve the router for exactly the pending amount |
//! | [`SwapClient::swap`] | Exact-input swap at 1:1 |
//! | [`SwapClient::claim`] | One-time test-token faucet claim |
//! | [`SwapClient::view`] | Render-ready [`SwapView`] of the current state |

pub mod abi;
pub mod amount;
pub mod approval;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod faucet;
pub mod instructions;
pub mod provider;
pub mod reader;
pub mod state;
pub mod tokens;
pub mod types;
pub mod wallet;

pub use client::SwapClient;
pub use config::SwapConfig;
pub use error::{Error, Result};
pub use faucet::{ClaimKey, ClaimLedger};
pub use provider::{InjectedWallet, LocalWallet};
pub use state::{SessionState, TransactionRecord, TxKind, TxState};
pub use tokens::{Token, TokenDirectory, TradeDirection};
pub use types::*;
pub use wallet::{WalletError, WalletProvider, WalletSession};
