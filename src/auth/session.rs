//! Session cookie signing/verification (spec §6.2).
//!
//! The cookie value is `base64(userId).base64(hmac)`, where the HMAC is
//! SHA-256 over the raw (unencoded) `userId` bytes keyed by the server's
//! configured session secret. Verification uses a constant-time comparison
//! so cookie forgery can't be sped up by timing the tag check.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum SessionTokenError {
    #[error("malformed session token")]
    Malformed,
    #[error("session token signature mismatch")]
    BadSignature,
}

pub fn sign(user_id: &str, secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(user_id.as_bytes());
    let tag = mac.finalize().into_bytes();

    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(user_id.as_bytes()),
        URL_SAFE_NO_PAD.encode(tag)
    )
}

/// Verifies `token` against `secret`, returning the embedded userId on success.
pub fn verify(token: &str, secret: &[u8]) -> Result<String, SessionTokenError> {
    let (user_part, tag_part) = token
        .split_once('.')
        .ok_or(SessionTokenError::Malformed)?;

    let user_bytes = URL_SAFE_NO_PAD
        .decode(user_part)
        .map_err(|_| SessionTokenError::Malformed)?;
    let given_tag = URL_SAFE_NO_PAD
        .decode(tag_part)
        .map_err(|_| SessionTokenError::Malformed)?;

    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(&user_bytes);
    let expected_tag = mac.finalize().into_bytes();

    if expected_tag.as_slice().ct_eq(&given_tag).unwrap_u8() != 1 {
        return Err(SessionTokenError::BadSignature);
    }

    String::from_utf8(user_bytes).map_err(|_| SessionTokenError::Malformed)
}
