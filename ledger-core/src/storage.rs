//! Persisted chain state: a single JSON document mapping block number (as
//! a string key) to a block object, per spec.md §6.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockHeader};
use crate::error::Result;
use crate::transaction::Transaction;

/// On-disk shape of a block: the coinbase transaction is folded into the
/// front of `transactions` rather than kept in its own field.
#[derive(Serialize, Deserialize)]
struct DiskBlock {
    header: BlockHeader,
    transactions: Vec<Transaction>,
}

impl From<&Block> for DiskBlock {
    fn from(block: &Block) -> Self {
        let mut transactions = Vec::with_capacity(block.transactions.len() + 1);
        transactions.push(block.coinbase.clone());
        transactions.extend(block.transactions.iter().cloned());
        DiskBlock {
            header: block.header.clone(),
            transactions,
        }
    }
}

impl DiskBlock {
    /// Detach the first transaction (the coinbase) into its own slot,
    /// per spec.md §6.
    fn into_block(mut self) -> Block {
        let coinbase = self.transactions.remove(0);
        Block {
            header: self.header,
            coinbase,
            transactions: self.transactions,
        }
    }
}

/// Write the full chain to `path` as pretty-printed JSON, matching the
/// original's `json.dump(..., indent=4)`.
pub fn save(blocks: &BTreeMap<u64, Block>, path: &Path) -> Result<()> {
    let disk: BTreeMap<String, DiskBlock> = blocks
        .iter()
        .map(|(num, block)| (num.to_string(), DiskBlock::from(block)))
        .collect();
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &disk)
        .map_err(|e| crate::error::LedgerError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    Ok(())
}

/// Read the chain from `path`. A missing file is treated as an empty
/// chain (a brand new node has nothing sealed yet), rather than an error.
pub fn load(path: &Path) -> Result<BTreeMap<u64, Block>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let file = std::fs::File::open(path)?;
    let disk: BTreeMap<String, DiskBlock> = serde_json::from_reader(file)
        .map_err(|e| crate::error::LedgerError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    let mut blocks = BTreeMap::new();
    for (key, disk_block) in disk {
        let num: u64 = key
            .parse()
            .map_err(|_| crate::error::LedgerError::BadEncoding(format!("bad block number key: {key}")))?;
        blocks.insert(num, disk_block.into_block());
    }
    Ok(blocks)
}
