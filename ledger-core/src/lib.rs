//! Core UTXO ledger: transactions, proof-of-work blocks, persistence, and
//! the in-memory index that ties them together. Binaries in this
//! workspace (`ledger-node`, `ledger-miner`, `ledger-wallet`) are thin
//! shells around [`Ledger`].

pub mod address;
pub mod block;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod storage;
pub mod transaction;

pub use address::{address_of, Address};
pub use block::{Block, BlockHeader};
pub use codec::{base58check_decode, base58check_encode, canonical_json, from_b64, to_b64};
pub use config::Config;
pub use crypto::{KeyPair, PublicKey, Signature};
pub use error::{LedgerError, Result};
pub use ledger::Ledger;
pub use transaction::{Transaction, TxInput, TxOutput};
