mod routes;
mod state;

use clap::Parser;
use ledger_core::{Config, KeyPair, Ledger};

use state::AppState;

/// HTTP node exposing a single ledger over the query/mutate API.
#[derive(Parser, Debug)]
struct Args {
    /// TCP port to listen on.
    #[arg(long, env = "LEDGER_NODE_PORT", default_value_t = 3000)]
    port: u16,

    /// 32-byte hex seed for this node's coinbase keypair. A random key is
    /// generated (and lost on restart) if unset — fine for a demo node,
    /// not for one expected to keep mining the same identity.
    #[arg(long, env = "LEDGER_NODE_KEY_SEED")]
    key_seed: Option<String>,
}

fn load_keypair(seed: Option<String>) -> KeyPair {
    match seed {
        Some(hex_seed) => {
            let bytes = hex::decode(hex_seed.trim_start_matches("0x"))
                .expect("--key-seed must be 32 bytes of hex");
            let array: [u8; 32] = bytes.try_into().expect("--key-seed must be exactly 32 bytes");
            KeyPair::from_secret_bytes(array)
        }
        None => KeyPair::generate(),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let keypair = load_keypair(args.key_seed);
    let config = Config::from_env();

    let ledger = Ledger::new(keypair, config).expect("failed to load persisted chain");
    let state = AppState::new(ledger);

    let app = routes::router(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!(%addr, "starting ledger node");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listener");

    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
        tracing::info!("shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .expect("server error");
}
