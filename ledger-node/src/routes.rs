use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use ledger_core::Transaction;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/balance/:addr", get(balance))
        .route("/history/:addr", get(history))
        .route("/send_tx", post(send_tx))
        .route("/reload", get(reload))
        .route("/tx/:hash", get(get_tx))
        .route("/make_block", get(make_block))
        .with_state(state)
}

/// `GET /balance/{addr}` — a bare JSON integer, not wrapped in a status
/// envelope; an address with no history simply has a balance of zero.
async fn balance(State(state): State<AppState>, Path(addr): Path<String>) -> impl IntoResponse {
    let ledger = state.ledger.lock().expect("ledger mutex poisoned");
    Json(json!(ledger.balance(&addr)))
}

/// `GET /history/{addr}` — a bare JSON array of transactions.
async fn history(State(state): State<AppState>, Path(addr): Path<String>) -> impl IntoResponse {
    let ledger = state.ledger.lock().expect("ledger mutex poisoned");
    Json(json!(ledger.history(&addr)))
}

/// `POST /send_tx` — always 200, `{"status":"ok"}` or
/// `{"status":"err","error":"..."}"`; never a 5xx for a rejected
/// transaction.
async fn send_tx(State(state): State<AppState>, body: Result<Json<Transaction>, axum::extract::rejection::JsonRejection>) -> impl IntoResponse {
    let Json(tx) = match body {
        Ok(tx) => tx,
        Err(e) => return Json(json!({"status": "err", "error": e.to_string()})),
    };
    let mut ledger = state.ledger.lock().expect("ledger mutex poisoned");
    match ledger.submit(tx) {
        Ok(()) => Json(json!({"status": "ok"})),
        Err(e) => Json(json!({"status": "err", "error": e.to_string()})),
    }
}

async fn reload(State(state): State<AppState>) -> impl IntoResponse {
    let mut ledger = state.ledger.lock().expect("ledger mutex poisoned");
    match ledger.reload() {
        Ok(()) => Json(json!({"status": "ok"})),
        Err(e) => Json(json!({"status": "err", "error": e.to_string()})),
    }
}

/// `GET /tx/{b64hash}` — the transaction itself, or an error envelope.
async fn get_tx(State(state): State<AppState>, Path(hash): Path<String>) -> impl IntoResponse {
    let ledger = state.ledger.lock().expect("ledger mutex poisoned");
    match ledger.get_tx(&hash) {
        Some(tx) => Json(json!(tx)),
        None => Json(json!({"status": "err", "error": "no such transaction"})),
    }
}

async fn make_block(State(state): State<AppState>) -> impl IntoResponse {
    let mut ledger = state.ledger.lock().expect("ledger mutex poisoned");
    match ledger.seal_current_block() {
        Ok(num) => Json(json!({"status": "ok", "block_num": num})),
        Err(e) => Json(json!({"status": "err", "error": e.to_string()})),
    }
}

