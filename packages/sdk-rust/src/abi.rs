//! Contract ABIs the engine calls into.
//!
//! Only the call shapes are defined here; the contracts' business logic
//! (pricing, circuit breaker, faucet accounting) is external.

use alloy::sol;

sol! {
    /// Uniswap v4 pool identity. `currency0 < currency1` numerically.
    #[derive(Debug, PartialEq, Eq)]
    struct PoolKey {
        address currency0;
        address currency1;
        uint24 fee;
        int24 tickSpacing;
        address hooks;
    }

    /// Router swap parameters.
    #[derive(Debug, PartialEq, Eq)]
    struct SwapParams {
        /// Direction: sell currency0 for currency1 when true.
        bool zeroForOne;
        /// Negative for exact input, positive for exact output.
        int256 amountSpecified;
        /// Price bound at which the swap stops executing.
        uint160 sqrtPriceLimitX96;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct BalanceDelta {
        int128 amount0;
        int128 amount1;
    }

    /// Minimal ERC-20 surface.
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Single-pool swap router deployed next to the hook.
    interface ISimpleSwapRouter {
        function swap(PoolKey key, SwapParams params) external returns (BalanceDelta delta);
    }

    /// One-time test-token faucet.
    interface IFaucet {
        function claimTokens() external;
        function hasClaimed(address user) external view returns (bool);
        function CLAIM_AMOUNT() external view returns (uint256);
    }
}
