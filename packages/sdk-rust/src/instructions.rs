//! Call builders for the router, token and faucet contracts.
//!
//! Each write builder returns a [`TransactionRequest`] ready to hand to the
//! wallet; each read builder returns one ready for `eth_call`. Swap
//! parameters follow the Uniswap v4 conventions exactly:
//!
//! - `amountSpecified < 0` means exact input (the only mode this client sends)
//! - `sqrtPriceLimitX96` is the loosest bound the pool accepts, so pricing
//!   protection is left entirely to the pool and its hook.

use alloy::{
    network::TransactionBuilder,
    primitives::{aliases::U160, uint, Address, I256, U256},
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};

use crate::abi::{IFaucet, ISimpleSwapRouter, PoolKey, SwapParams, IERC20};
use crate::error::{Error, Result};

// ─── Price bounds (TickMath.MIN_SQRT_PRICE / MAX_SQRT_PRICE) ─────────────────

pub const MIN_SQRT_PRICE: U160 = uint!(4295128739_U160);
pub const MAX_SQRT_PRICE: U160 =
    uint!(1461446703485210103287273052203988822378723970342_U160);

/// Tightest limit that does not itself reject the trade.
pub fn sqrt_price_limit(zero_for_one: bool) -> U160 {
    if zero_for_one {
        MIN_SQRT_PRICE + U160::from(1u8)
    } else {
        MAX_SQRT_PRICE - U160::from(1u8)
    }
}

// ─── Swap parameters ──────────────────────────────────────────────────────────

/// Build exact-input swap parameters for selling `amount` of `input`.
///
/// `amount` must be positive and fit `int256`; `input` must be one of the
/// pool's currencies.
pub fn swap_params(pool_key: &PoolKey, input: Address, amount: U256) -> Result<SwapParams> {
    if amount.is_zero() {
        return Err(Error::InvalidAmount("amount must be greater than zero".into()));
    }
    if input != pool_key.currency0 && input != pool_key.currency1 {
        return Err(Error::Config(format!("token {input} is not part of the pool")));
    }
    let magnitude = I256::try_from(amount)
        .map_err(|_| Error::InvalidAmount(format!("{amount} does not fit int256")))?;

    let zero_for_one = input == pool_key.currency0;
    Ok(SwapParams {
        zeroForOne:        zero_for_one,
        amountSpecified:   -magnitude,
        sqrtPriceLimitX96: sqrt_price_limit(zero_for_one),
    })
}

// ─── Write requests ───────────────────────────────────────────────────────────

fn request(from: Address, to: Address, input: Vec<u8>) -> TransactionRequest {
    TransactionRequest::default()
        .with_from(from)
        .with_to(to)
        .with_input(input)
}

/// `token.approve(spender, amount)`.
pub fn approve_request(
    from:    Address,
    token:   Address,
    spender: Address,
    amount:  U256,
) -> TransactionRequest {
    request(from, token, IERC20::approveCall { spender, amount }.abi_encode())
}

/// `router.swap(key, params)`. The key is passed through unmodified.
pub fn swap_request(
    from:   Address,
    router: Address,
    key:    &PoolKey,
    params: SwapParams,
) -> TransactionRequest {
    let call = ISimpleSwapRouter::swapCall { key: key.clone(), params };
    request(from, router, call.abi_encode())
}

/// `faucet.claimTokens()`.
pub fn claim_request(from: Address, faucet: Address) -> TransactionRequest {
    request(from, faucet, IFaucet::claimTokensCall {}.abi_encode())
}

// ─── Read requests ────────────────────────────────────────────────────────────

fn read(to: Address, input: Vec<u8>) -> TransactionRequest {
    TransactionRequest::default().with_to(to).with_input(input)
}

pub fn balance_of_request(token: Address, account: Address) -> TransactionRequest {
    read(token, IERC20::balanceOfCall { account }.abi_encode())
}

pub fn allowance_request(token: Address, owner: Address, spender: Address) -> TransactionRequest {
    read(token, IERC20::allowanceCall { owner, spender }.abi_encode())
}

pub fn has_claimed_request(faucet: Address, user: Address) -> TransactionRequest {
    read(faucet, IFaucet::hasClaimedCall { user }.abi_encode())
}

pub fn claim_amount_request(faucet: Address) -> TransactionRequest {
    read(faucet, IFaucet::CLAIM_AMOUNTCall {}.abi_encode())
}
