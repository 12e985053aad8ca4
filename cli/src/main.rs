//! lzwire: plan and apply OApp pathway wiring.
//!
//! # Usage
//!
//! ```text
//! lzwire plan --graph wire.yaml --state chains.json
//! lzwire wire --graph wire.yaml --state chains.json --output after.json
//! lzwire wire --graph wire.yaml --state chains.json --parallel -v
//! lzwire config get --graph wire.yaml --state chains.json
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lzwire")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reconcile cross-chain OApp pathway configuration")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the transactions needed to bring the chains in line with the graph
    Plan(Inputs),
    /// Plan, then sign and submit the transactions
    Wire {
        #[command(flatten)]
        inputs: Inputs,

        /// Submit to different chains concurrently
        #[arg(long)]
        parallel: bool,

        /// Where to write the chain state after wiring (defaults to --state)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Inspect the messaging config of every pathway
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show custom, default and active libraries, ULN and executor configs
    Get(Inputs),
}

#[derive(Args, Debug, Clone)]
pub struct Inputs {
    /// Wire graph document (.yaml, .yml or .json)
    #[arg(short, long)]
    pub graph: PathBuf,

    /// Chain state snapshot (JSON)
    #[arg(short, long)]
    pub state: PathBuf,

    /// Engine settings (YAML); LZ_WIRE_* variables override it
    #[arg(long, env = "LZ_WIRE_SETTINGS")]
    pub settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Plan(inputs) => commands::plan(&inputs).await,
        Commands::Wire {
            inputs,
            parallel,
            output,
        } => {
            let output = output.unwrap_or_else(|| inputs.state.clone());
            commands::wire(&inputs, parallel, &output).await
        }
        Commands::Config {
            command: ConfigCommands::Get(inputs),
        } => commands::config_get(&inputs).await,
    }
}
