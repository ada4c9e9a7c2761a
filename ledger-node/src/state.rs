use std::sync::{Arc, Mutex};

use ledger_core::Ledger;

/// Shared handle to the single-writer ledger, cloned into every handler.
/// The mutex is held for the duration of a single request, including
/// mining when `/make_block` is hit — `Ledger`'s own ordering guarantee
/// requires that a seal be totally ordered with submits.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Mutex<Ledger>>,
}

impl AppState {
    pub fn new(ledger: Ledger) -> Self {
        AppState { ledger: Arc::new(Mutex::new(ledger)) }
    }
}
