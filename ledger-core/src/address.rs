//! Address derivation.
//!
//! An address is the first 8 bytes of `SHA-256(pubkey)`, Base58Check
//! encoded. The truncation means addresses are not unique per key;
//! per spec.md §3, collisions are out of scope here.

use sha2::{Digest, Sha256};

use crate::codec::{base58check_decode, base58check_encode};
use crate::crypto::PublicKey;
use crate::error::{LedgerError, Result};

/// An address is treated as an opaque, comparable string identity.
pub type Address = String;

/// Derive the address for a public key.
pub fn address_of(pubkey: &PublicKey) -> Address {
    let digest = Sha256::digest(pubkey.to_bytes());
    base58check_encode(&digest[..8])
}

/// Parse a Base58Check address string back to its 8-byte prefix. Exposed
/// mainly for tests and tooling that want to validate an address's shape
/// without holding the originating public key.
pub fn decode_address(addr: &str) -> Result<[u8; 8]> {
    let bytes = base58check_decode(addr)?;
    bytes
        .try_into()
        .map_err(|_| LedgerError::BadEncoding("address must decode to 8 bytes".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn address_is_deterministic() {
        let kp = KeyPair::from_secret_bytes([3u8; 32]);
        let pk = kp.public_key();
        assert_eq!(address_of(&pk), address_of(&pk));
    }

    #[test]
    fn different_keys_usually_differ() {
        let a = KeyPair::from_secret_bytes([1u8; 32]).public_key();
        let b = KeyPair::from_secret_bytes([2u8; 32]).public_key();
        assert_ne!(address_of(&a), address_of(&b));
    }

    #[test]
    fn address_roundtrips_through_base58check() {
        let kp = KeyPair::from_secret_bytes([5u8; 32]);
        let addr = address_of(&kp.public_key());
        assert!(decode_address(&addr).is_ok());
    }

    #[test]
    fn decode_address_rejects_garbage() {
        assert!(decode_address("not an address").is_err());
    }
}
