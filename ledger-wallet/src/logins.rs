//! Hardcoded demo identities, mirroring `bendercoin/client.py`'s `LOGINS`
//! table: a handful of named keypairs a pedagogical CLI can operate as
//! without a real key-management story.

use ledger_core::KeyPair;

pub fn lookup(name: &str) -> Option<KeyPair> {
    let seed = match name {
        "fry" => [1u8; 32],
        "leela" => [2u8; 32],
        "bender" => [3u8; 32],
        _ => return None,
    };
    Some(KeyPair::from_secret_bytes(seed))
}
