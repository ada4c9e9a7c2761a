//! Block assembly, mining, and chain linkage.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::address_of;
use crate::codec::{canonical_json, to_b64};
use crate::crypto::{KeyPair, PublicKey, Signature};
use crate::error::{LedgerError, Result};
use crate::transaction::Transaction;

/// Only the fields that feed the header's content hash: everything
/// except `nonce`, `signature`, and `mined`.
#[derive(Serialize)]
struct HashableHeader<'a> {
    num: u64,
    pubkey: String,
    reward: u64,
    tx_hashes: &'a str,
    coinbase_hash: &'a str,
    prev_hash: &'a str,
}

/// A sealed or in-progress block header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockHeader {
    pub num: u64,
    pub pubkey: PublicKey,
    pub reward: u64,
    /// Base64url SHA-256 of the concatenation of the coinbase hash and
    /// every pending transaction's hash, in order. Deliberately *not* a
    /// Merkle root (spec.md §4.4 / §9) — there are no inclusion proofs
    /// derivable from it.
    pub tx_hashes: String,
    pub coinbase_hash: String,
    /// Base64url hash of the previous header, or `""` for block 0.
    pub prev_hash: String,

    #[serde(with = "nonce_b64", default = "empty_nonce")]
    pub nonce: [u8; 64],

    #[serde(default)]
    pub signature: Option<Signature>,

    #[serde(default)]
    pub mined: bool,
}

fn empty_nonce() -> [u8; 64] {
    [0u8; 64]
}

mod nonce_b64 {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(nonce: &[u8; 64], s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&to_b64(nonce))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<[u8; 64], D::Error> {
        let s = String::deserialize(d)?;
        let bytes = crate::codec::from_b64(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("nonce must be 64 bytes"))
    }
}

impl BlockHeader {
    /// SHA-256 over the canonical JSON of the non-nonce, non-signature
    /// fields, concatenated with the raw nonce bytes.
    pub fn hash(&self) -> [u8; 32] {
        let hashable = HashableHeader {
            num: self.num,
            pubkey: to_b64(&self.pubkey.to_bytes()),
            reward: self.reward,
            tx_hashes: &self.tx_hashes,
            coinbase_hash: &self.coinbase_hash,
            prev_hash: &self.prev_hash,
        };
        let mut buf = canonical_json(&hashable).expect("header fields always canonicalize");
        buf.extend_from_slice(&self.nonce);
        Sha256::digest(buf).into()
    }

    /// Draw fresh random nonces until the header's hash begins with
    /// `difficulty` zero bytes. Constant memory, no dependence on the
    /// prior nonce, per spec.md §4.4.
    pub fn mine(&mut self, difficulty: usize) {
        if self.mined {
            return;
        }
        let mut rng = rand::rngs::OsRng;
        loop {
            let mut nonce = [0u8; 64];
            rng.fill_bytes(&mut nonce);
            self.nonce = nonce;
            let h = self.hash();
            if h[..difficulty].iter().all(|&b| b == 0) {
                self.mined = true;
                return;
            }
        }
    }

    /// Sign the mined header. Fails if mining has not completed.
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<()> {
        if !self.mined {
            return Err(LedgerError::invalid("don't sign unmined header"));
        }
        self.signature = Some(keypair.sign(&self.hash()));
        Ok(())
    }

    /// `true` iff this header's hash has `difficulty` leading zero bytes
    /// and its signature verifies against its own `pubkey`.
    pub fn is_sealed(&self, difficulty: usize) -> bool {
        let h = self.hash();
        if !h[..difficulty].iter().all(|&b| b == 0) {
            return false;
        }
        match &self.signature {
            Some(sig) => self.pubkey.verify(&h, sig),
            None => false,
        }
    }
}

/// A sealed block: a mined, signed header plus the coinbase and the
/// transactions it seals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub coinbase: Transaction,
    pub transactions: Vec<Transaction>,
}

/// `SHA-256(coinbase.hash() || tx1.hash() || tx2.hash() || ...)`,
/// base64url-encoded. Not a Merkle root — see spec.md §9.
pub fn compute_tx_hashes(coinbase: &Transaction, transactions: &[Transaction]) -> String {
    let mut buf = Vec::new();
    buf.extend_from_slice(&coinbase.hash());
    for tx in transactions {
        buf.extend_from_slice(&tx.hash());
    }
    to_b64(&Sha256::digest(buf))
}

/// Assemble, mine, and sign a new block sealing `transactions` on top of
/// `prev_header` (`None` for the genesis block).
///
/// This is the sole entry point for turning a batch of pending
/// transactions into a sealed [`Block`]; `Ledger::seal_current_block`
/// calls it and nothing else constructs a mined `Block`.
pub fn mine_block(
    keypair: &KeyPair,
    prev_header: Option<&BlockHeader>,
    transactions: Vec<Transaction>,
    reward: u64,
    difficulty: usize,
) -> Block {
    let (num, prev_hash) = match prev_header {
        Some(p) => (p.num + 1, to_b64(&p.hash())),
        None => (0, String::new()),
    };

    let miner_addr = address_of(&keypair.public_key());
    let mut coinbase = Transaction::new_coinbase(num, miner_addr, reward);
    coinbase.sign(keypair);

    let tx_hashes = compute_tx_hashes(&coinbase, &transactions);

    let mut header = BlockHeader {
        num,
        pubkey: keypair.public_key(),
        reward,
        tx_hashes,
        coinbase_hash: to_b64(&coinbase.hash()),
        prev_hash,
        nonce: [0u8; 64],
        signature: None,
        mined: false,
    };

    header.mine(difficulty);
    header
        .sign(keypair)
        .expect("header.mine always sets mined = true before returning");

    Block {
        header,
        coinbase,
        transactions,
    }
}

/// Validate chain linkage and proof-of-work/signature for a candidate
/// block against its predecessor (`None` for block 0). Does not validate
/// the contained transactions — that is the caller's job, since it
/// requires the ledger's index.
pub fn validate_linkage(block: &Block, prev: Option<&BlockHeader>, difficulty: usize) -> Result<()> {
    let (expected_num, expected_prev_hash) = match prev {
        Some(p) => (p.num + 1, to_b64(&p.hash())),
        None => (0, String::new()),
    };
    if block.header.num != expected_num {
        return Err(LedgerError::invalid("wrong block number"));
    }
    if block.header.prev_hash != expected_prev_hash {
        return Err(LedgerError::invalid("wrong prev hash"));
    }
    if !block.header.is_sealed(difficulty) {
        return Err(LedgerError::invalid("invalid proof of work or signature"));
    }
    let expected_tx_hashes = compute_tx_hashes(&block.coinbase, &block.transactions);
    if block.header.tx_hashes != expected_tx_hashes {
        return Err(LedgerError::invalid("tx_hashes mismatch"));
    }
    if block.header.coinbase_hash != to_b64(&block.coinbase.hash()) {
        return Err(LedgerError::invalid("coinbase_hash mismatch"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_block_mines_and_links() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let block = mine_block(&kp, None, vec![], 1000, 0);
        assert_eq!(block.header.num, 0);
        assert_eq!(block.header.prev_hash, "");
        assert!(block.header.is_sealed(0));
        assert!(validate_linkage(&block, None, 0).is_ok());
    }

    #[test]
    fn second_block_chains_to_first() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let genesis = mine_block(&kp, None, vec![], 1000, 0);
        let second = mine_block(&kp, Some(&genesis.header), vec![], 1000, 0);
        assert_eq!(second.header.num, 1);
        assert_eq!(second.header.prev_hash, to_b64(&genesis.header.hash()));
        assert!(validate_linkage(&second, Some(&genesis.header), 0).is_ok());
    }

    #[test]
    fn wrong_num_rejected() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let genesis = mine_block(&kp, None, vec![], 1000, 0);
        let mut second = mine_block(&kp, Some(&genesis.header), vec![], 1000, 0);
        second.header.num = 5;
        assert!(validate_linkage(&second, Some(&genesis.header), 0).is_err());
    }

    #[test]
    fn difficulty_two_hash_has_two_zero_bytes() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let block = mine_block(&kp, None, vec![], 1000, 2);
        let h = block.header.hash();
        assert_eq!(h[0], 0);
        assert_eq!(h[1], 0);
    }

    #[test]
    fn unmined_header_refuses_to_sign() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let mut header = BlockHeader {
            num: 0,
            pubkey: kp.public_key(),
            reward: 1000,
            tx_hashes: "x".into(),
            coinbase_hash: "y".into(),
            prev_hash: "".into(),
            nonce: [0u8; 64],
            signature: None,
            mined: false,
        };
        assert!(header.sign(&kp).is_err());
    }

    #[test]
    fn tx_hashes_is_not_order_independent_merkle() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let addr = address_of(&kp.public_key());
        let mut t1 = Transaction::new_coinbase(0, addr.clone(), 1);
        t1.sign(&kp);
        let mut t2 = Transaction::new_coinbase(1, addr, 1);
        t2.sign(&kp);

        let coinbase = t1.clone();
        let forward = compute_tx_hashes(&coinbase, &[t1.clone(), t2.clone()]);
        let backward = compute_tx_hashes(&coinbase, &[t2, t1]);
        assert_ne!(forward, backward);
    }

    #[test]
    fn header_roundtrips_through_json() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let block = mine_block(&kp, None, vec![], 1000, 0);
        let json = serde_json::to_string(&block.header).unwrap();
        let back: BlockHeader = serde_json::from_str(&json).unwrap();
        assert_eq!(block.header.hash(), back.hash());
    }
}
