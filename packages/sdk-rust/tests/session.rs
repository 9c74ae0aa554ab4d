//! End-to-end orchestration against the in-memory wallet.

mod common;

use std::time::Duration;

use alloy::primitives::{address, U256};
use brens_swap_sdk::{
    ClaimLedger, Error, SessionState, SwapClient, TradeDirection, TxKind, TxState,
};
use common::{client, config, funded, units, MockWallet, USER};

/// Wait until a background refresh has produced the state `done` expects.
async fn settle(client: &SwapClient, done: impl FnMut(&SessionState) -> bool) {
    let mut rx = client.subscribe();
    let settled = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(done)).await;
    assert!(matches!(settled, Ok(Ok(_))), "state never settled");
}

// ─── Approve → swap ───────────────────────────────────────────────────────────

#[tokio::test]
async fn approval_unlocks_swap() {
    let mock = funded();
    let client = client(&mock);
    client.connect().await.unwrap();

    client.set_amount("10");
    assert!(client.requires_approval());
    assert!(matches!(
        client.swap().await,
        Err(Error::ApprovalRequired { required, allowance })
            if required == units(10) && allowance.is_zero()
    ));
    assert_eq!(mock.sends(), 0);

    let approval = client.approve().await.unwrap();
    let state = client.snapshot();
    assert_eq!(state.swap_tx.state, TxState::Succeeded { kind: TxKind::Approval, hash: approval });
    assert_eq!(state.allowance_a.value, units(10));
    assert!(!client.requires_approval());
    assert_eq!(client.view().action.label, "Swap");

    let swap = client.swap().await.unwrap();
    assert_ne!(swap, approval);
    assert_eq!(mock.balance(mock.token_a()), units(90));
    assert_eq!(mock.balance(mock.token_b()), units(110));
}

#[tokio::test]
async fn confirmed_swap_refreshes_and_clears_amount() {
    let mock = funded();
    mock.set_allowance(mock.token_a(), U256::MAX);
    let client = client(&mock);
    client.connect().await.unwrap();

    client.set_amount("2.5");
    let hash = client.swap().await.unwrap();

    let state = client.snapshot();
    assert_eq!(state.amount, "");
    assert_eq!(state.balance_a.value, units(100) - units(5) / U256::from(2u8));
    assert_eq!(state.balance_b.value, units(100) + units(5) / U256::from(2u8));
    assert_eq!(state.swap_tx.state, TxState::Succeeded { kind: TxKind::Swap, hash });

    let view = client.view();
    let status = view.swap_status.unwrap();
    assert_eq!(status.message, "Swap successful!");
    assert_eq!(status.explorer_url, Some(client.config().chain.tx_url(hash)));

    // Still on display until the next intent replaces it
    client.set_amount("1");
    client.approve().await.unwrap();
    assert_eq!(client.snapshot().swap_tx.state.kind(), Some(TxKind::Approval));
}

#[tokio::test]
async fn reverse_direction_sells_token_b() {
    let mock = funded();
    mock.set_allowance(mock.token_b(), U256::MAX);
    let client = client(&mock);
    client.connect().await.unwrap();

    client.set_amount("7");
    assert_eq!(client.toggle_direction(), TradeDirection::BToA);
    assert_eq!(client.snapshot().amount, "", "toggling clears the amount");

    client.set_amount("7");
    client.swap().await.unwrap();
    assert_eq!(mock.balance(mock.token_a()), units(107));
    assert_eq!(mock.balance(mock.token_b()), units(93));
}

#[tokio::test]
async fn max_fills_whole_input_balance() {
    let mock = funded();
    mock.set_balance(mock.token_a(), units(3) / U256::from(2u8));
    let client = client(&mock);
    client.connect().await.unwrap();

    assert_eq!(client.set_max_amount(), "1.5");
    assert_eq!(client.view().quote, "1.5");
}

#[tokio::test]
async fn max_with_empty_balance_keeps_amount() {
    let mock = MockWallet::new(&config());
    let client = client(&mock);
    client.connect().await.unwrap();

    client.set_amount("3");
    assert_eq!(client.set_max_amount(), "3");
    assert_eq!(client.snapshot().amount, "3");
}

// ─── Background reads ─────────────────────────────────────────────────────────

#[tokio::test]
async fn amount_edits_pick_up_allowance_changed_elsewhere() {
    let mock = funded();
    let client = client(&mock);
    client.connect().await.unwrap();

    mock.set_allowance(mock.token_a(), U256::MAX);
    client.set_amount("10");
    settle(&client, |s| s.allowance_a.value == U256::MAX).await;
    assert!(!client.requires_approval());
    client.swap().await.unwrap();

    mock.set_allowance(mock.token_a(), U256::ZERO);
    client.set_amount("5");
    settle(&client, |s| s.allowance_a.value.is_zero()).await;
    assert!(client.requires_approval());
    assert!(matches!(client.swap().await, Err(Error::ApprovalRequired { .. })));
}

#[tokio::test]
async fn toggling_direction_rereads_the_new_input() {
    let mock = funded();
    let client = client(&mock);
    client.connect().await.unwrap();

    mock.set_allowance(mock.token_b(), U256::MAX);
    mock.set_balance(mock.token_b(), units(40));
    client.toggle_direction();
    settle(&client, |s| s.allowance_b.value == U256::MAX).await;

    assert_eq!(client.view().input.balance, "40");
    client.set_amount("7");
    assert!(!client.requires_approval());
}

#[tokio::test]
async fn edits_while_disconnected_stay_local() {
    let mock = funded();
    let client = client(&mock);
    client.set_amount("3");
    client.toggle_direction();
    client.set_amount("4");
    tokio::task::yield_now().await;
    assert_eq!(mock.calls(), 0);
}

// ─── Intent validation ────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_amount_is_rejected_before_anything_else() {
    let mock = funded();
    let client = client(&mock);

    for amount in ["", "0", "  ", "abc"] {
        client.set_amount(amount);
        assert!(matches!(client.approve().await, Err(Error::InvalidAmount(_))));
        assert!(matches!(client.swap().await, Err(Error::InvalidAmount(_))));
    }

    client.connect().await.unwrap();
    client.set_amount("");
    assert!(matches!(client.approve().await, Err(Error::InvalidAmount(_))));
    assert!(matches!(client.swap().await, Err(Error::InvalidAmount(_))));
    assert_eq!(mock.sends(), 0);
    assert_eq!(client.snapshot().swap_tx.state, TxState::Idle);
}

#[tokio::test]
async fn intents_require_a_session() {
    let mock = funded();
    let client = client(&mock);
    client.set_amount("1");
    assert!(matches!(client.approve().await, Err(Error::NotConnected)));
    assert!(matches!(client.claim().await, Err(Error::NotConnected)));
    assert!(matches!(client.refresh().await, Err(Error::NotConnected)));
}

#[tokio::test]
async fn one_transaction_in_flight_at_a_time() {
    let mock = funded();
    let client = client(&mock);
    client.connect().await.unwrap();
    client.set_amount("10");

    mock.hold_receipts();
    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.approve().await }
    });

    let mut rx = client.subscribe();
    rx.wait_for(|s| matches!(s.swap_tx.state, TxState::AwaitingConfirmation { .. }))
        .await
        .unwrap();

    assert!(matches!(client.approve().await, Err(Error::OperationInProgress)));
    assert!(matches!(client.claim().await, Err(Error::OperationInProgress)));
    // Amount is still checked first
    client.set_amount("");
    assert!(matches!(client.swap().await, Err(Error::InvalidAmount(_))));
    assert!(!client.view().action.enabled);
    client.set_amount("10");
    assert_eq!(client.view().action.label, "Approving...");
    assert_eq!(mock.sends(), 1);

    mock.release();
    let hash = pending.await.unwrap().unwrap();
    assert_eq!(
        client.snapshot().swap_tx.state,
        TxState::Succeeded { kind: TxKind::Approval, hash }
    );
    client.swap().await.unwrap();
}

// ─── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rejected_submission_fails_without_hash() {
    let mock = funded();
    let client = client(&mock);
    client.connect().await.unwrap();
    client.set_amount("10");

    mock.with(|c| c.reject_next_send = true);
    assert!(matches!(client.approve().await, Err(Error::UserRejected)));

    let state = client.snapshot();
    match &state.swap_tx.state {
        TxState::Failed { kind, hash, .. } => {
            assert_eq!(*kind, TxKind::Approval);
            assert_eq!(*hash, None);
        }
        other => panic!("unexpected state {other:?}"),
    }
    assert!(state.allowance_a.value.is_zero());

    // The engine stays usable
    client.approve().await.unwrap();
}

#[tokio::test]
async fn reverted_swap_keeps_amount_and_cache() {
    let mock = funded();
    mock.set_allowance(mock.token_a(), U256::MAX);
    let client = client(&mock);
    client.connect().await.unwrap();
    client.set_amount("10");

    mock.with(|c| c.revert_next_receipt = true);
    assert!(matches!(client.swap().await, Err(Error::ConfirmationFailed(_))));

    let state = client.snapshot();
    assert_eq!(state.amount, "10");
    assert_eq!(state.balance_a.value, units(100));
    assert!(matches!(state.swap_tx.state, TxState::Failed { hash: Some(_), .. }));
    assert!(client.view().swap_status.unwrap().message.starts_with("Swap failed:"));
}

#[tokio::test]
async fn oversized_swap_is_rejected_on_submission() {
    let mock = funded();
    mock.set_allowance(mock.token_a(), U256::MAX);
    let client = client(&mock);
    client.connect().await.unwrap();

    client.set_amount("200");
    assert!(matches!(client.swap().await, Err(Error::SubmissionFailed(_))));
    assert_eq!(mock.balance(mock.token_a()), units(100));
}

#[tokio::test]
async fn failing_read_keeps_previous_value() {
    let mock = funded();
    let client = client(&mock);
    client.connect().await.unwrap();

    mock.set_balance(mock.token_a(), units(50));
    mock.set_balance(mock.token_b(), units(60));
    let token_b = mock.token_b();
    mock.with(|c| c.failing_reads.insert(token_b));

    client.refresh().await.unwrap();
    let state = client.snapshot();
    assert_eq!(state.balance_a.value, units(50));
    assert_eq!(state.balance_b.value, units(100));
    assert!(state.balance_b.fetched);
}

#[tokio::test]
async fn never_fetched_balance_stays_zero() {
    let mock = funded();
    let token_a = mock.token_a();
    mock.with(|c| c.failing_reads.insert(token_a));
    let client = client(&mock);
    client.connect().await.unwrap();

    let state = client.snapshot();
    assert!(!state.balance_a.fetched);
    assert!(state.balance_a.value.is_zero());
    assert_eq!(state.balance_b.value, units(100));
    assert_eq!(client.view().input.balance, "0.00");
}

// ─── Disconnect ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn disconnect_mid_flight_discards_completion() {
    let mock = funded();
    mock.set_allowance(mock.token_a(), U256::MAX);
    let client = client(&mock);
    client.connect().await.unwrap();
    client.set_amount("10");

    mock.hold_receipts();
    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.swap().await }
    });
    client
        .subscribe()
        .wait_for(|s| s.swap_tx.state.hash().is_some())
        .await
        .unwrap();

    client.disconnect();
    mock.release();
    pending.await.unwrap().unwrap();

    let state = client.snapshot();
    assert!(!state.is_connected());
    assert_eq!(state.swap_tx.state, TxState::Idle);
    assert!(!state.balance_a.fetched);
    assert!(state.balance_a.value.is_zero());
    assert_eq!(state.amount, "10", "late completion must not clear the amount");
}

// ─── Faucet ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn second_claim_never_reaches_the_network() {
    let mock = MockWallet::new(&config());
    let client = client(&mock);
    client.connect().await.unwrap();
    assert!(!client.snapshot().claimed.value);
    assert_eq!(client.claim_amount().await.unwrap(), units(1_000));

    let hash = client.claim().await.unwrap();
    let state = client.snapshot();
    assert!(state.claimed.value);
    assert_eq!(state.balance_a.value, units(1_000));
    assert_eq!(state.balance_b.value, units(1_000));
    assert_eq!(state.claim_tx.state, TxState::Succeeded { kind: TxKind::Claim, hash });

    let (sends, calls) = (mock.sends(), mock.calls());
    assert!(matches!(client.claim().await, Err(Error::AlreadyClaimed)));
    assert_eq!((mock.sends(), mock.calls()), (sends, calls));
    assert!(client.has_claimed().await.unwrap());
}

#[tokio::test]
async fn claim_reverts_are_classified() {
    let mock = MockWallet::new(&config());
    let faucet = mock.config.contracts.faucet;
    mock.with(|c| {
        c.failing_reads.insert(faucet);
        c.claimed.insert(USER);
    });
    let client = client(&mock);
    client.connect().await.unwrap();

    assert!(matches!(client.claim().await, Err(Error::AlreadyClaimed)));
    assert!(matches!(
        client.snapshot().claim_tx.state,
        TxState::Failed { kind: TxKind::Claim, .. }
    ));
    // The on-chain answer is remembered
    let sends = mock.sends();
    assert!(matches!(client.claim().await, Err(Error::AlreadyClaimed)));
    assert_eq!(mock.sends(), sends);
}

#[tokio::test]
async fn claim_seen_on_chain_is_remembered() {
    let mock = MockWallet::new(&config());
    mock.with(|c| c.claimed.insert(USER));
    let client = client(&mock);
    client.connect().await.unwrap();

    assert!(client.snapshot().claimed.value);
    assert!(matches!(client.claim().await, Err(Error::AlreadyClaimed)));
    assert_eq!(mock.sends(), 0);

    // After reconnecting the ledger answers even if the chain forgets
    mock.with(|c| c.claimed.clear());
    client.disconnect();
    client.connect().await.unwrap();
    assert!(client.snapshot().claimed.value);
    assert!(client.has_claimed().await.unwrap());
}

#[tokio::test]
async fn empty_faucet_is_reported() {
    let mock = MockWallet::new(&config());
    mock.with(|c| c.faucet_reserve = U256::ZERO);
    let client = client(&mock);
    client.connect().await.unwrap();

    assert!(matches!(client.claim().await, Err(Error::InsufficientFaucetBalance)));
    assert!(!client.snapshot().claimed.value);
}

#[tokio::test]
async fn declined_claim_is_a_rejection() {
    let mock = MockWallet::new(&config());
    mock.with(|c| c.reject_next_send = true);
    let client = client(&mock);
    client.connect().await.unwrap();

    assert!(matches!(client.claim().await, Err(Error::UserRejected)));
    client.claim().await.unwrap();
}

#[tokio::test]
async fn persisted_ledger_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("claims.json");

    let mock = MockWallet::new(&config());
    let first = client(&mock).with_claim_ledger(ClaimLedger::open(&path).unwrap());
    first.connect().await.unwrap();
    first.claim().await.unwrap();
    first.disconnect();
    drop(first);

    // Fresh chain that has never seen the claim: only the ledger knows
    let mock = MockWallet::new(&config());
    let second: SwapClient = client(&mock).with_claim_ledger(ClaimLedger::open(&path).unwrap());
    second.connect().await.unwrap();
    assert!(second.snapshot().claimed.value);
    assert!(matches!(second.claim().await, Err(Error::AlreadyClaimed)));
    assert_eq!(mock.sends(), 0);
}

#[tokio::test]
async fn ledger_entries_belong_to_one_faucet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("claims.json");

    let mock = MockWallet::new(&config());
    let first = client(&mock).with_claim_ledger(ClaimLedger::open(&path).unwrap());
    first.connect().await.unwrap();
    first.claim().await.unwrap();
    drop(first);

    let mut redeployed = config();
    redeployed.contracts.faucet = address!("0x00000000000000000000000000000000000000fa");
    let mock = MockWallet::new(&redeployed);
    let second = client(&mock).with_claim_ledger(ClaimLedger::open(&path).unwrap());
    second.connect().await.unwrap();

    assert!(!second.snapshot().claimed.value);
    second.claim().await.unwrap();
    assert_eq!(mock.sends(), 1);
}
