//! Approve-before-swap gate.

use alloy::primitives::U256;

use crate::amount::parse_amount;

/// Whether an approval must precede a swap of `amount`.
///
/// `false` for an empty, unparsable or zero amount: nothing is actionable,
/// so no approval is meaningful. Otherwise `true` iff the amount strictly
/// exceeds the cached `allowance`. Never touches the network; the caller is
/// responsible for the allowance being fresh enough.
pub fn requires_approval(amount: &str, decimals: u8, allowance: U256) -> bool {
    match parse_amount(amount, decimals) {
        Ok(value) => !value.is_zero() && value > allowance,
        Err(_) => false,
    }
}
