//! HMAC-SHA256 request signing.
//!
//! Subscriptions that enable signing get a signature header on every
//! attempt: HMAC-SHA256 over the exact raw body bytes, hex encoded and
//! prefixed with `sha256=`. Subscribers verify by recomputing the MAC
//! over the bytes they received.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use fanout_core::models::{Signing, SigningMode};

use crate::DEFAULT_SIGNATURE_HEADER;

type HmacSha256 = Hmac<Sha256>;

/// Computes the HMAC-SHA256 of `payload` as a lowercase hex string.
pub fn hmac_hex(payload: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Builds the signature header for a subscription, if signing applies.
///
/// Returns `(header_name, header_value)` with the value in
/// `sha256=<hex>` form. Signing is skipped when the mode is `none` or
/// when no secret is configured; a missing secret silently disables
/// signing rather than failing the delivery.
pub fn signature_header(signing: &Signing, payload: &[u8]) -> Option<(String, String)> {
    if signing.mode != SigningMode::HmacSha256 {
        return None;
    }
    let secret = signing.secret.as_deref().filter(|s| !s.is_empty())?;

    let header = signing
        .header
        .as_deref()
        .filter(|h| !h.is_empty())
        .unwrap_or(DEFAULT_SIGNATURE_HEADER)
        .to_string();

    Some((header, format!("sha256={}", hmac_hex(payload, secret))))
}
