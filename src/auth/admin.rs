//! Admin endpoint gating via `x-api-key` (spec §6.1).

use subtle::ConstantTimeEq;

/// Constant-time comparison so mismatched-length or near-miss keys don't leak
/// timing information about how much of the secret was guessed correctly.
pub fn secrets_match(provided: &str, configured: &str) -> bool {
    if provided.len() != configured.len() {
        return false;
    }
    provided.as_bytes().ct_eq(configured.as_bytes()).unwrap_u8() == 1
}
