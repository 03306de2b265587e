//! Billboard CLI
//!
//! Headless line-driven front end: wires the RPC gateways into a sync core
//! and drives it from stdin, printing the view after every change. Commands:
//!
//! ```text
//! connect        request wallet access
//! set <text>     stage a new message
//! submit         send the staged message
//! clear          discard the staged message
//! show           reprint the current view
//! quit           exit
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use billboard_core::{Config, SyncCore, ViewModel};
use billboard_rpc::{ContractRpc, WalletRpc};

#[derive(Parser)]
#[command(name = "billboard")]
#[command(about = "Read and update the shared billboard message")]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wallet provider endpoint override
    #[arg(long)]
    wallet_url: Option<String>,

    /// Node endpoint override
    #[arg(long)]
    node_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    if let Some(url) = cli.wallet_url {
        config.wallet_url = url;
    }
    if let Some(url) = cli.node_url {
        config.node_url = url;
    }
    info!(
        "Starting billboard (wallet: {}, node: {})",
        config.wallet_url, config.node_url
    );

    let wallet = WalletRpc::detect(&config).await;
    let contract = ContractRpc::connect(&config, wallet.transport_handle()).await?;

    let mut core = SyncCore::new(wallet, contract);
    core.initialize().await;
    print_view(&core.view());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut streams_alive = true;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_command(&mut core, &line).await {
                    break;
                }
                print_view(&core.view());
            }
            alive = core.pump(), if streams_alive => {
                if alive {
                    print_view(&core.view());
                } else {
                    streams_alive = false;
                }
            }
        }
    }

    core.close();
    Ok(())
}

/// Apply one command line; returns false on quit
async fn handle_command(
    core: &mut SyncCore<WalletRpc, ContractRpc>,
    line: &str,
) -> bool {
    let input = line.trim();
    match input {
        "" | "show" => {}
        "quit" | "q" => return false,
        "connect" => core.connect().await,
        "submit" => core.submit().await,
        "clear" => core.clear_pending(),
        _ => match input.strip_prefix("set ") {
            Some(text) => core.set_pending(text),
            None => eprintln!("unknown command: {input}"),
        },
    }
    true
}

fn print_view(view: &ViewModel) {
    println!("[{}] {}", view.connection_label, view.status);
    println!("message: {}", view.message);
    if !view.pending.is_empty() {
        println!("staged:  {}", view.pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }
}
