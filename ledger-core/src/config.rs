//! Environment-driven tunables.
//!
//! Mirrors the small env-var-with-default `Config` pattern used across the
//! retrieval pack (e.g. `bkunyiha-blockchain/src/config.rs`) rather than
//! pulling in a full configuration-file crate for two knobs.

use std::env;
use std::path::PathBuf;

/// Default proof-of-work difficulty: count of leading zero bytes required
/// in a sealed header's hash.
pub const DEFAULT_DIFFICULTY: usize = 2;

/// Default coinbase reward minted per sealed block.
pub const DEFAULT_BLOCK_REWARD: u64 = 1000;

const DIFFICULTY_KEY: &str = "LEDGER_DIFFICULTY";
const BLOCK_REWARD_KEY: &str = "LEDGER_BLOCK_REWARD";
const STORAGE_PATH_KEY: &str = "LEDGER_STORAGE_PATH";

/// Runtime configuration for a ledger instance. Constructed once per
/// `Ledger` (or per test) rather than stored as process-wide global state,
/// so tests can run with distinct, isolated settings (e.g. `DIFFICULTY=0`
/// for deterministic mining per spec.md §9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub difficulty: usize,
    pub block_reward: u64,
    pub storage_path: PathBuf,
}

impl Config {
    /// Defaults matching the spec: `DIFFICULTY = 2`, `BLOCK_REWARD = 1000`,
    /// persisted to `transactions.json` in the working directory.
    pub fn new() -> Self {
        Config {
            difficulty: DEFAULT_DIFFICULTY,
            block_reward: DEFAULT_BLOCK_REWARD,
            storage_path: PathBuf::from("transactions.json"),
        }
    }

    /// Read overrides from the environment, falling back to `new()`'s
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut cfg = Config::new();
        if let Ok(d) = env::var(DIFFICULTY_KEY) {
            if let Ok(parsed) = d.parse() {
                cfg.difficulty = parsed;
            }
        }
        if let Ok(r) = env::var(BLOCK_REWARD_KEY) {
            if let Ok(parsed) = r.parse() {
                cfg.block_reward = parsed;
            }
        }
        if let Ok(p) = env::var(STORAGE_PATH_KEY) {
            cfg.storage_path = PathBuf::from(p);
        }
        cfg
    }

    /// A config suitable for fast, deterministic tests: zero difficulty so
    /// mining terminates on the first nonce drawn.
    pub fn for_tests() -> Self {
        Config {
            difficulty: 0,
            block_reward: DEFAULT_BLOCK_REWARD,
            storage_path: PathBuf::from("transactions.json"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
