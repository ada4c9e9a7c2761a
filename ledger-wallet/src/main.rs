mod api;
mod logins;

use clap::{Parser, Subcommand};
use ledger_core::{address_of, to_b64, Transaction, TxInput, TxOutput};

use api::NodeClient;

#[derive(Parser, Debug)]
struct Cli {
    /// Base URL of the ledger node to talk to.
    #[arg(long, env = "LEDGER_WALLET_NODE_URL", default_value = "http://127.0.0.1:3000")]
    node_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print an account's balance.
    Balance { account: String },
    /// Print an account's transaction history.
    History { account: String },
    /// Build, sign, and submit a payment from one demo login to another.
    Send {
        sender: String,
        recipient: String,
        amount: u64,
        #[arg(short, long, default_value = "")]
        message: String,
    },
    /// Submit a raw, already-signed transaction read as JSON from a file
    /// (or stdin if omitted).
    SendRaw { file: Option<std::path::PathBuf> },
    /// Ask the node to re-read its persisted chain.
    Reload,
    /// Ask the node to seal the currently pending block.
    MakeBlock,
}

fn account_address(name: &str) -> String {
    let kp = logins::lookup(name).unwrap_or_else(|| panic!("unknown login: {name}"));
    address_of(&kp.public_key())
}

/// Candidate unspent outputs belonging to `addr`: every output in its
/// history paid to it, minus every input anywhere in that history that
/// already references it. Mirrors `bendercoin/client.py`'s `get_unspent`.
fn unspent_outputs(addr: &str, history: &[Transaction]) -> Vec<TxInput> {
    let mut spent: Vec<(String, u64, u64)> = Vec::new();
    let mut possible: Vec<TxInput> = Vec::new();

    for tx in history {
        let hash = to_b64(&tx.hash());
        for input in &tx.inputs {
            spent.push((input.hash.clone(), input.index, input.amount));
        }
        for (index, output) in tx.outputs.iter().enumerate() {
            if output.address == addr {
                possible.push(TxInput { hash: hash.clone(), index: index as u64, amount: output.amount });
            }
        }
    }

    possible
        .into_iter()
        .filter(|i| !spent.contains(&(i.hash.clone(), i.index, i.amount)))
        .collect()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = NodeClient::new(&cli.node_url).expect("invalid --node-url");

    match cli.command {
        Command::Balance { account } => {
            let addr = account_address(&account);
            let balance = client.balance(&addr).await.expect("request failed");
            println!("{balance}");
        }

        Command::History { account } => {
            let addr = account_address(&account);
            let history = client.history(&addr).await.expect("request failed");
            for tx in history {
                print_tx(&tx, &addr);
            }
        }

        Command::Send { sender, recipient, amount, message } => {
            if amount == 0 {
                eprintln!("bad amount");
                std::process::exit(1);
            }
            let sender_kp = logins::lookup(&sender).unwrap_or_else(|| panic!("unknown login: {sender}"));
            let sender_addr = address_of(&sender_kp.public_key());
            let recipient_addr = account_address(&recipient);

            let history = client.history(&sender_addr).await.expect("request failed");
            let candidates = unspent_outputs(&sender_addr, &history);

            let mut inputs = Vec::new();
            let mut total = 0u64;
            for input in candidates {
                total += input.amount;
                inputs.push(input);
                if total >= amount {
                    break;
                }
            }
            if total < amount {
                eprintln!("not enough money");
                std::process::exit(1);
            }

            let mut outputs = vec![TxOutput { address: recipient_addr, amount }];
            if total > amount {
                outputs.push(TxOutput { address: sender_addr, amount: total - amount });
            }

            let mut tx = Transaction::new(inputs, outputs, message);
            tx.sign(&sender_kp);

            println!("signed transaction:");
            println!("{}", serde_json::to_string_pretty(&tx).unwrap());

            let result = client.send_tx(&tx).await.expect("request failed");
            println!("{result}");
        }

        Command::SendRaw { file } => {
            let reader: Box<dyn std::io::Read> = match file {
                Some(path) => Box::new(std::fs::File::open(path).expect("failed to open file")),
                None => Box::new(std::io::stdin()),
            };
            let tx: Transaction = serde_json::from_reader(reader).expect("failed to parse transaction json");
            let result = client.send_tx(&tx).await.expect("request failed");
            println!("{result}");
        }

        Command::Reload => {
            let result = client.reload().await.expect("request failed");
            println!("{result}");
        }

        Command::MakeBlock => {
            let result = client.make_block().await.expect("request failed");
            println!("{result}");
        }
    }
}

fn print_tx(tx: &Transaction, account: &str) {
    let hash = to_b64(&tx.hash());
    print!("tx {hash}:");
    if !tx.message.is_empty() {
        println!(" {}", tx.message);
    } else {
        println!();
    }

    if tx.coinbase.is_none() && tx.from_address() == account {
        for out in &tx.outputs {
            if out.address == account {
                continue;
            }
            println!("-{} >> {}", out.amount, out.address);
        }
    } else if tx.to_addresses().contains(account) {
        println!("+{} << {}", tx.received(account), tx.from_address());
    } else {
        println!("from {}: {}", tx.from_address(), tx.total_in());
        for out in &tx.outputs {
            println!("to {}: {}", out.address, out.amount);
        }
    }
    println!();
}
