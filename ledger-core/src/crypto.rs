//! Ed25519 keys and signatures.
//!
//! Wraps `ed25519-dalek`. On the wire (and therefore in canonical JSON)
//! public keys and signatures are URL-safe base64 strings; in memory they
//! are the library's own fixed-size types.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::{from_b64, to_b64};
use crate::error::{LedgerError, Result};

/// An ed25519 keypair, used to sign transactions and block headers.
pub struct KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl KeyPair {
    /// Generate a random keypair using the OS CSPRNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        KeyPair {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Rebuild a keypair from its 32-byte secret key material. Used by
    /// the demo wallet logins, which hold fixed keys the way
    /// `bendercoin/client.py`'s `LOGINS` table does.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        KeyPair {
            signing_key: ed25519_dalek::SigningKey::from_bytes(&bytes),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Sign a message, returning the raw 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            inner: self.signing_key.sign(message),
        }
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        KeyPair {
            signing_key: ed25519_dalek::SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

/// A 32-byte ed25519 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: ed25519_dalek::VerifyingKey,
}

impl PublicKey {
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map_err(|e| LedgerError::BadEncoding(format!("invalid public key: {e}")))?;
        Ok(PublicKey { verifying_key })
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Verify `signature` over `message`. This is the one place the
    /// "signature isn't signed" / "bad signature" validation rules bottom
    /// out.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.verifying_key.verify(message, &signature.inner).is_ok()
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_b64(&self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = from_b64(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("public key must be 32 bytes"))?;
        PublicKey::from_bytes(&arr).map_err(serde::de::Error::custom)
    }
}

/// A 64-byte ed25519 signature.
#[derive(Clone, Copy, Debug)]
pub struct Signature {
    inner: ed25519_dalek::Signature,
}

impl Signature {
    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        Signature {
            inner: ed25519_dalek::Signature::from_bytes(bytes),
        }
    }

    pub fn to_bytes(self) -> [u8; 64] {
        self.inner.to_bytes()
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}
impl Eq for Signature {}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_b64(&self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = from_b64(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("signature must be 64 bytes"))?;
        Ok(Signature::from_bytes(&arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let kp = KeyPair::generate();
        let pk = kp.public_key();
        let sig = kp.sign(b"hello");
        assert!(pk.verify(b"hello", &sig));
        assert!(!pk.verify(b"goodbye", &sig));
    }

    #[test]
    fn tampered_signature_fails_verification() {
        let kp = KeyPair::generate();
        let pk = kp.public_key();
        let sig = kp.sign(b"hello");
        let mut bytes = sig.to_bytes();
        bytes[0] ^= 0xff;
        let tampered = Signature::from_bytes(&bytes);
        assert!(!pk.verify(b"hello", &tampered));
    }

    #[test]
    fn public_key_serde_roundtrip() {
        let kp = KeyPair::generate();
        let pk = kp.public_key();
        let json = serde_json::to_string(&pk).unwrap();
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(pk, back);
    }

    #[test]
    fn from_secret_bytes_is_deterministic() {
        let bytes = [7u8; 32];
        let kp1 = KeyPair::from_secret_bytes(bytes);
        let kp2 = KeyPair::from_secret_bytes(bytes);
        assert_eq!(kp1.public_key(), kp2.public_key());
    }
}
