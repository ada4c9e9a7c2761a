//! Base64url, Base58Check, and canonical-JSON helpers.
//!
//! Every hash in this crate is computed over the bytes these functions
//! produce, so two implementations that serialize the same semantic value
//! through here will always agree on its hash.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;

use crate::error::{LedgerError, Result};

/// URL-safe Base64 with trailing `=` padding stripped.
pub fn to_b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Inverse of [`to_b64`]. Fails with [`LedgerError::BadEncoding`] on
/// non-alphabet input.
pub fn from_b64(s: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| LedgerError::BadEncoding(format!("invalid base64url: {e}")))
}

/// UTF-8 bytes of `value` serialized as JSON with object keys sorted
/// ascending at every nesting level.
///
/// Struct fields serialize in declaration order by default, which is not
/// what we want for a content hash. Routing through `serde_json::Value`
/// first forces every object (including nested ones) through
/// `serde_json::Map`, which is a `BTreeMap` as long as the `preserve_order`
/// feature is off (it is, everywhere in this workspace) — so the
/// `to_vec` of that `Value` always emits keys in sorted order.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let as_value = serde_json::to_value(value)
        .map_err(|e| LedgerError::BadEncoding(format!("canonical json: {e}")))?;
    serde_json::to_vec(&as_value)
        .map_err(|e| LedgerError::BadEncoding(format!("canonical json: {e}")))
}

/// Standard Bitcoin-alphabet Base58Check: payload followed by the first 4
/// bytes of `SHA-256(SHA-256(payload))`, then Base58-encoded.
pub fn base58check_encode(payload: &[u8]) -> String {
    bs58::encode(payload).with_check().into_string()
}

/// Inverse of [`base58check_encode`]. Fails with
/// [`LedgerError::BadEncoding`] on a bad checksum or alphabet violation.
pub fn base58check_decode(s: &str) -> Result<Vec<u8>> {
    bs58::decode(s)
        .with_check(None)
        .into_vec()
        .map_err(|e| LedgerError::BadEncoding(format!("invalid base58check: {e}")))
}
