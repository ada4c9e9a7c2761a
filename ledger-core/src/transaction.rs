//! The UTXO transaction: inputs, outputs, message, optional coinbase
//! marker, signature.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::{address_of, Address};
use crate::codec::{canonical_json, to_b64};
use crate::crypto::{KeyPair, PublicKey, Signature};
use crate::error::{LedgerError, Result};

/// A reference to a prior transaction's output. `amount` mirrors that
/// output's amount and is validated to match it in
/// [`Transaction::validate_previous`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Base64url-encoded SHA-256 hash of the referenced transaction.
    pub hash: String,
    pub index: u64,
    pub amount: u64,
}

/// One payment destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: Address,
    pub amount: u64,
}

/// Only the fields that feed the content hash. Kept as a private struct
/// (rather than hashing `Transaction` directly) so that adding a field to
/// `Transaction` can never silently change what gets hashed.
#[derive(Serialize)]
struct Hashable<'a> {
    inputs: &'a [TxInput],
    outputs: &'a [TxOutput],
    message: &'a str,
}

/// The UTXO transaction. Identity (`hash()`) is the SHA-256 of the
/// canonical JSON of `{inputs, outputs, message}` only — `coinbase`,
/// `datetime`, `pubkey`, and `signature` are not hashed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub message: String,

    /// Non-null iff this is a coinbase transaction; then equal to the
    /// block number being rewarded.
    #[serde(default)]
    pub coinbase: Option<u64>,

    #[serde(default)]
    pub datetime: Option<DateTime<Utc>>,

    #[serde(default)]
    pub pubkey: Option<PublicKey>,

    #[serde(default)]
    pub signature: Option<Signature>,
}

impl Transaction {
    /// Build an unsigned transaction. Call [`Transaction::sign`] before
    /// submitting it.
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>, message: String) -> Self {
        Transaction {
            inputs,
            outputs,
            message,
            coinbase: None,
            datetime: None,
            pubkey: None,
            signature: None,
        }
    }

    /// Build an unsigned coinbase transaction rewarding `num` with a
    /// single output to `address`.
    pub fn new_coinbase(num: u64, address: Address, amount: u64) -> Self {
        Transaction {
            inputs: vec![],
            outputs: vec![TxOutput { address, amount }],
            message: format!("coinbase {num}"),
            coinbase: Some(num),
            datetime: None,
            pubkey: None,
            signature: None,
        }
    }

    pub fn total_in(&self) -> u64 {
        self.inputs.iter().map(|i| i.amount).sum()
    }

    pub fn total_out(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount).sum()
    }

    /// The content hash: SHA-256 of the canonical JSON of the semantic
    /// fields only.
    pub fn hash(&self) -> [u8; 32] {
        let hashable = Hashable {
            inputs: &self.inputs,
            outputs: &self.outputs,
            message: &self.message,
        };
        // Canonicalization cannot fail for a type this simple; a failure
        // here would mean `String`/`u64`/`Vec` stopped being serializable.
        let bytes = canonical_json(&hashable).expect("transaction fields always canonicalize");
        Sha256::digest(bytes).into()
    }

    /// Sign this transaction, populating `pubkey` and `signature`.
    pub fn sign(&mut self, keypair: &KeyPair) {
        self.pubkey = Some(keypair.public_key());
        self.signature = Some(keypair.sign(&self.hash()));
    }

    /// The spender's address, derived from `pubkey`.
    ///
    /// # Panics
    /// Panics if called before the transaction is signed. A transaction
    /// with no `pubkey` has no well-defined spender; callers always run
    /// [`Transaction::validate`] (which requires a pubkey) before asking
    /// for this.
    pub fn from_address(&self) -> Address {
        address_of(
            self.pubkey
                .as_ref()
                .expect("from_address called on an unsigned transaction"),
        )
    }

    /// All addresses this transaction pays to.
    pub fn to_addresses(&self) -> HashSet<Address> {
        self.outputs.iter().map(|o| o.address.clone()).collect()
    }

    /// Total paid to `addr` by this transaction's outputs.
    pub fn received(&self, addr: &str) -> u64 {
        self.outputs
            .iter()
            .filter(|o| o.address == addr)
            .map(|o| o.amount)
            .sum()
    }

    /// Everything the spender pays away, excluding any change returned to
    /// themselves.
    pub fn sent(&self) -> u64 {
        self.total_out() - self.received(&self.from_address())
    }

    /// Self-validation. Enforces the rules of spec.md §4.3 in order,
    /// failing on the first violated rule. The reason strings are part of
    /// the observable contract.
    pub fn validate(&self) -> Result<()> {
        let is_coinbase = self.coinbase.is_some();
        if is_coinbase {
            if !self.inputs.is_empty() {
                return Err(LedgerError::invalid("inputs in coinbase"));
            }
        } else if self.inputs.is_empty() {
            return Err(LedgerError::invalid("no inputs"));
        }

        if self.outputs.is_empty() {
            return Err(LedgerError::invalid("no outputs"));
        }

        for i in &self.inputs {
            if i.hash.is_empty() {
                return Err(LedgerError::invalid("missing hash"));
            }
            if i.amount == 0 {
                return Err(LedgerError::invalid("amount must be positive"));
            }
        }

        let in_hashes: HashSet<&str> = self.inputs.iter().map(|i| i.hash.as_str()).collect();
        if in_hashes.len() != self.inputs.len() {
            return Err(LedgerError::invalid("input txes must not repeat"));
        }

        for o in &self.outputs {
            if o.address.is_empty() {
                return Err(LedgerError::invalid("missing address"));
            }
            if o.amount == 0 {
                return Err(LedgerError::invalid("amount must be positive"));
            }
        }

        let out_addrs: HashSet<&str> = self.outputs.iter().map(|o| o.address.as_str()).collect();
        if out_addrs.len() != self.outputs.len() {
            return Err(LedgerError::invalid("output addreses must not repeat"));
        }

        if !is_coinbase && self.total_in() != self.total_out() {
            return Err(LedgerError::invalid("mismatched in/out"));
        }

        if self.message.chars().count() > 140 {
            return Err(LedgerError::invalid("message too long"));
        }

        let (pubkey, signature) = match (&self.pubkey, &self.signature) {
            (Some(p), Some(s)) => (p, s),
            _ => return Err(LedgerError::invalid("transaction isn't signed")),
        };

        if !pubkey.verify(&self.hash(), signature) {
            return Err(LedgerError::invalid("signature verification failed"));
        }

        Ok(())
    }

    /// Previous-reference validation: checks every input against the
    /// transaction it claims to spend from. `index` maps a base64url tx
    /// hash to the transaction with that hash.
    pub fn validate_previous(&self, index: &HashMap<String, Transaction>) -> Result<()> {
        let spender = self.from_address();
        for i in &self.inputs {
            let prev = index
                .get(&i.hash)
                .ok_or_else(|| LedgerError::invalid("previous tx missing"))?;

            if to_b64(&prev.hash()) != i.hash {
                return Err(LedgerError::invalid("previous tx hash mismatch"));
            }

            prev.validate()?;

            let out = prev
                .outputs
                .get(i.index as usize)
                .ok_or_else(|| LedgerError::invalid("input index out of range"))?;

            if out.address != spender {
                return Err(LedgerError::invalid("no stealing"));
            }

            if out.amount != i.amount {
                return Err(LedgerError::invalid("input amount mismatch"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_tx(kp: &KeyPair, inputs: Vec<TxInput>, outputs: Vec<TxOutput>, msg: &str) -> Transaction {
        let mut tx = Transaction::new(inputs, outputs, msg.to_string());
        tx.sign(kp);
        tx
    }

    #[test]
    fn coinbase_rejects_nonempty_inputs() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let addr = address_of(&kp.public_key());
        let mut tx = Transaction::new(
            vec![TxInput {
                hash: "x".into(),
                index: 0,
                amount: 1,
            }],
            vec![TxOutput {
                address: addr,
                amount: 1,
            }],
            "".into(),
        );
        tx.coinbase = Some(0);
        tx.sign(&kp);
        assert_eq!(
            tx.validate().unwrap_err().to_string(),
            "inputs in coinbase"
        );
    }

    #[test]
    fn noncoinbase_rejects_empty_inputs() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let addr = address_of(&kp.public_key());
        let tx = signed_tx(&kp, vec![], vec![TxOutput { address: addr, amount: 1 }], "");
        assert_eq!(tx.validate().unwrap_err().to_string(), "no inputs");
    }

    #[test]
    fn rejects_empty_outputs() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let tx = signed_tx(
            &kp,
            vec![TxInput {
                hash: "x".into(),
                index: 0,
                amount: 1,
            }],
            vec![],
            "",
        );
        assert_eq!(tx.validate().unwrap_err().to_string(), "no outputs");
    }

    #[test]
    fn rejects_duplicate_input_hashes() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let addr = address_of(&kp.public_key());
        let tx = signed_tx(
            &kp,
            vec![
                TxInput { hash: "h".into(), index: 0, amount: 1 },
                TxInput { hash: "h".into(), index: 1, amount: 1 },
            ],
            vec![TxOutput { address: addr, amount: 2 }],
            "",
        );
        assert_eq!(
            tx.validate().unwrap_err().to_string(),
            "input txes must not repeat"
        );
    }

    #[test]
    fn rejects_duplicate_output_addresses() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let addr = address_of(&kp.public_key());
        let tx = signed_tx(
            &kp,
            vec![TxInput { hash: "h".into(), index: 0, amount: 2 }],
            vec![
                TxOutput { address: addr.clone(), amount: 1 },
                TxOutput { address: addr, amount: 1 },
            ],
            "",
        );
        assert_eq!(
            tx.validate().unwrap_err().to_string(),
            "output addreses must not repeat"
        );
    }

    #[test]
    fn rejects_mismatched_in_out() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let addr = address_of(&kp.public_key());
        let tx = signed_tx(
            &kp,
            vec![TxInput { hash: "h".into(), index: 0, amount: 300 }],
            vec![TxOutput { address: addr, amount: 299 }],
            "",
        );
        assert_eq!(tx.validate().unwrap_err().to_string(), "mismatched in/out");
    }

    #[test]
    fn message_140_chars_accepted_141_rejected() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let addr = address_of(&kp.public_key());
        let ok_msg = "a".repeat(140);
        let tx = signed_tx(
            &kp,
            vec![TxInput { hash: "h".into(), index: 0, amount: 1 }],
            vec![TxOutput { address: addr.clone(), amount: 1 }],
            &ok_msg,
        );
        assert!(tx.validate().is_ok());

        let bad_msg = "a".repeat(141);
        let tx2 = signed_tx(
            &kp,
            vec![TxInput { hash: "h".into(), index: 0, amount: 1 }],
            vec![TxOutput { address: addr, amount: 1 }],
            &bad_msg,
        );
        assert_eq!(tx2.validate().unwrap_err().to_string(), "message too long");
    }

    #[test]
    fn zero_amount_output_rejected_one_accepted() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let addr = address_of(&kp.public_key());
        let tx = signed_tx(
            &kp,
            vec![TxInput { hash: "h".into(), index: 0, amount: 0 }],
            vec![TxOutput { address: addr.clone(), amount: 0 }],
            "",
        );
        assert_eq!(
            tx.validate().unwrap_err().to_string(),
            "amount must be positive"
        );
    }

    #[test]
    fn bad_signature_fails_validate() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let addr = address_of(&kp.public_key());
        let mut tx = signed_tx(
            &kp,
            vec![TxInput { hash: "h".into(), index: 0, amount: 1 }],
            vec![TxOutput { address: addr, amount: 1 }],
            "",
        );
        let mut bytes = tx.signature.unwrap().to_bytes();
        bytes[0] ^= 0xff;
        tx.signature = Some(Signature::from_bytes(&bytes));
        assert_eq!(
            tx.validate().unwrap_err().to_string(),
            "signature verification failed"
        );
    }

    #[test]
    fn unsigned_transaction_fails_validate() {
        let addr = "someaddress".to_string();
        let tx = Transaction::new(
            vec![TxInput { hash: "h".into(), index: 0, amount: 1 }],
            vec![TxOutput { address: addr, amount: 1 }],
            "".into(),
        );
        assert_eq!(
            tx.validate().unwrap_err().to_string(),
            "transaction isn't signed"
        );
    }

    #[test]
    fn hash_is_stable_across_json_roundtrip() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let addr = address_of(&kp.public_key());
        let tx = signed_tx(
            &kp,
            vec![TxInput { hash: "h".into(), index: 0, amount: 1 }],
            vec![TxOutput { address: addr, amount: 1 }],
            "hi",
        );
        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx.hash(), back.hash());
    }

    #[test]
    fn hash_ignores_coinbase_datetime_pubkey_signature() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let addr = address_of(&kp.public_key());
        let mut tx1 = Transaction::new(
            vec![TxInput { hash: "h".into(), index: 0, amount: 1 }],
            vec![TxOutput { address: addr.clone(), amount: 1 }],
            "hi".into(),
        );
        let mut tx2 = tx1.clone();
        tx1.sign(&kp);
        tx2.datetime = Some(Utc::now());
        let kp2 = KeyPair::from_secret_bytes([9u8; 32]);
        tx2.sign(&kp2);
        assert_eq!(tx1.hash(), tx2.hash());
    }

    #[test]
    fn validate_previous_rejects_unknown_hash() {
        let kp = KeyPair::from_secret_bytes([1u8; 32]);
        let addr = address_of(&kp.public_key());
        let tx = signed_tx(
            &kp,
            vec![TxInput { hash: "doesnotexist".into(), index: 0, amount: 1 }],
            vec![TxOutput { address: addr, amount: 1 }],
            "",
        );
        let index = HashMap::new();
        assert_eq!(
            tx.validate_previous(&index).unwrap_err().to_string(),
            "previous tx missing"
        );
    }

    #[test]
    fn validate_previous_rejects_stealing() {
        let owner = KeyPair::from_secret_bytes([1u8; 32]);
        let owner_addr = address_of(&owner.public_key());
        let thief = KeyPair::from_secret_bytes([2u8; 32]);

        let mut prev = Transaction::new_coinbase(0, owner_addr, 100);
        prev.sign(&owner);
        let prev_hash = to_b64(&prev.hash());

        let steal = signed_tx(
            &thief,
            vec![TxInput { hash: prev_hash.clone(), index: 0, amount: 100 }],
            vec![TxOutput { address: address_of(&thief.public_key()), amount: 100 }],
            "",
        );

        let mut index = HashMap::new();
        index.insert(prev_hash, prev);
        assert_eq!(
            steal.validate_previous(&index).unwrap_err().to_string(),
            "no stealing"
        );
    }

    #[test]
    fn validate_previous_rejects_amount_mismatch() {
        let owner = KeyPair::from_secret_bytes([1u8; 32]);
        let owner_addr = address_of(&owner.public_key());

        let mut prev = Transaction::new_coinbase(0, owner_addr.clone(), 100);
        prev.sign(&owner);
        let prev_hash = to_b64(&prev.hash());

        let spend = signed_tx(
            &owner,
            vec![TxInput { hash: prev_hash.clone(), index: 0, amount: 50 }],
            vec![TxOutput { address: owner_addr, amount: 50 }],
            "",
        );

        let mut index = HashMap::new();
        index.insert(prev_hash, prev);
        assert_eq!(
            spend.validate_previous(&index).unwrap_err().to_string(),
            "input amount mismatch"
        );
    }
}
