use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};
use std::path::{Path, PathBuf};

use ethereum_node::core::{Block, Transaction};
use ethereum_node::crypto::{generate_private_key, secret_to_address};
use ethereum_node::types::Address;
use ethereum_node::{client_version, Config, Genesis, Node};

/// Nested calls recurse on the native stack, up to 1024 frames deep.
const EXECUTION_STACK_SIZE: usize = 256 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "ethereum-node")]
#[command(about = "Account-based ledger node with a gas-metered execution engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Network preset used when no configuration file is given
    #[arg(short, long, global = true, default_value = "mainnet")]
    network: String,

    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import blocks on top of a genesis and print their receipts
    Import {
        /// Path to genesis configuration file
        #[arg(short, long)]
        genesis: PathBuf,

        /// Block files (JSON), applied in order
        blocks: Vec<PathBuf>,
    },

    /// Trace a transaction on top of the imported blocks
    Trace {
        /// Path to genesis configuration file
        #[arg(short, long)]
        genesis: PathBuf,

        /// Transaction file (JSON)
        #[arg(short, long)]
        tx: PathBuf,

        /// Execute as this sender instead of recovering the signature
        #[arg(long)]
        from: Option<String>,

        /// Block files (JSON) to import first
        blocks: Vec<PathBuf>,
    },

    /// Print the effective configuration
    DumpConfig,

    /// Account management commands
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Generate a new key pair
    New,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::for_network(&cli.network)?,
    };
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    if config.log.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    info!("Starting {}", client_version());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(EXECUTION_STACK_SIZE)
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(run(cli.command, config))
}

async fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Import { genesis, blocks } => {
            let output = tokio::task::spawn_blocking(move || -> Result<String> {
                let mut node = open_node(config, &genesis)?;
                let mut imported = Vec::with_capacity(blocks.len());
                for path in &blocks {
                    imported.push(node.import_block(&read_block(path)?)?);
                }
                info!(head = node.head().number, "Import finished");
                Ok(serde_json::to_string_pretty(&imported)?)
            })
            .await??;
            println!("{}", output);
        }

        Commands::Trace { genesis, tx, from, blocks } => {
            let output = tokio::task::spawn_blocking(move || -> Result<String> {
                let mut node = open_node(config, &genesis)?;
                for path in &blocks {
                    node.import_block(&read_block(path)?)?;
                }
                let tx: Transaction = read_json(&tx)?;
                let sender = from.as_deref().map(parse_address).transpose()?;
                let trace = node.trace_transaction(&tx, sender)?;
                Ok(serde_json::to_string_pretty(&trace)?)
            })
            .await??;
            println!("{}", output);
        }

        Commands::DumpConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
        }

        Commands::Account { command } => match command {
            AccountCommands::New => {
                let secret = generate_private_key();
                println!("Address: {:x}", secret_to_address(&secret));
                println!("Secret:  0x{}", hex::encode(secret.secret_bytes()));
            }
        },
    }

    Ok(())
}

fn open_node(config: Config, genesis: &Path) -> Result<Node> {
    info!("Loading genesis from {}", genesis.display());
    let genesis = Genesis::from_file(genesis)?;
    Node::new(config, &genesis)
}

fn read_block(path: &Path) -> Result<Block> {
    read_json(path).with_context(|| format!("Invalid block file {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

fn parse_address(s: &str) -> Result<Address> {
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .context("Failed to parse address")?;
    Ok(Address::from_slice(&bytes)?)
}
