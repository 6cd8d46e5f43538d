//! Request signing for the keyword-ads API.
//!
//! The signed message is `{timestamp}.{METHOD}.{path}`; the query string is
//! never part of it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Base64-encoded HMAC-SHA256 over `{timestamp}.{method}.{path}`.
///
/// # Errors
///
/// Returns [`InvalidLength`] if the HMAC implementation rejects the key.
pub fn signature(
    secret_key: &str,
    timestamp: &str,
    method: &str,
    path: &str,
) -> Result<String, InvalidLength> {
    sign(secret_key, &format!("{timestamp}.{method}.{path}"))
}

fn sign(secret_key: &str, message: &str) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())?;
    mac.update(message.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
