//! Webhook signature verification.
//!
//! Every inbound request carries a detached Ed25519 signature over
//! `timestamp || body`. Verification gates the entire pipeline: a request
//! that fails here is answered 401 and its body is never parsed.

use ed25519_dalek::{Signature, VerifyingKey};

/// Check a request signature. Any malformed input (bad hex, wrong key or
/// signature length) fails closed.
pub fn verify(raw_body: &[u8], signature_hex: &str, timestamp: &str, public_key: &[u8]) -> bool {
    let Ok(signature_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&signature_bytes) else {
        return false;
    };
    let Ok(key_bytes) = <[u8; 32]>::try_from(public_key) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };

    let mut message = Vec::with_capacity(timestamp.len() + raw_body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(raw_body);
    key.verify_strict(&message, &signature).is_ok()
}
