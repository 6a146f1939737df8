//! hero-cli
//!
//! Command-line front end for the hero program. Every subcommand prints
//! its result as JSON on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hero_nft::commands::{
    self, build_uploader, parse_price, CreateHeroRequest, FlowContext, PurchaseRequest,
};
use hero_nft::config::Config;
use hero_nft::rpc::{HeroRpc, SolanaRpc};
use hero_nft::structured_logging::OperationLogger;
use hero_nft::tx_builder::TransactionSubmitter;
use hero_nft::upload::{IpfsCredentials, StorageKind};
use hero_nft::wallet::WalletManager;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "hero-cli", author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Solana cluster (mainnet-beta, testnet, devnet, localnet) or RPC URL
    #[arg(short, long, global = true, default_value = "devnet")]
    env: String,

    /// Solana wallet location
    #[arg(short, long, global = true, default_value = "~/.config/solana/id.json")]
    keypair: String,

    /// Log level used when RUST_LOG is not set
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Path to configuration file
    #[arg(long, global = true, default_value = "hero.toml")]
    config: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new hero under the next free id
    #[command(name = "create_hero")]
    CreateHero {
        /// Hero name
        #[arg(short, long)]
        name: String,
        /// Hero image URI
        #[arg(short, long)]
        uri: String,
        /// Listed price in SOL
        #[arg(short, long)]
        price: String,
        /// Owner NFT mint address
        #[arg(short, long)]
        owner: String,
    },

    /// List every hero
    #[command(name = "show_all")]
    ShowAll,

    /// Change the listed price of a hero
    #[command(name = "update_hero_price")]
    UpdateHeroPrice {
        /// Hero id
        #[arg(short, long)]
        id: u32,
        /// New price in SOL
        #[arg(short, long)]
        price: String,
    },

    /// Buy a hero and mint its ownership NFT
    #[command(name = "buy_hero")]
    BuyHero {
        /// Hero id
        #[arg(short, long)]
        id: u32,
        /// New hero name
        #[arg(short, long)]
        name: Option<String>,
        /// New hero image URI
        #[arg(short, long)]
        uri: Option<String>,
        /// New hero price in SOL
        #[arg(short, long)]
        price: Option<String>,
    },

    /// Upload an image to decentralized storage
    #[command(name = "upload_image")]
    UploadImage {
        /// Image file path to upload
        file: PathBuf,
        /// Storage backend (arweave, ipfs)
        #[arg(short, long, default_value = "arweave")]
        storage: String,
        /// Infura IPFS project id (required for ipfs)
        #[arg(long)]
        ipfs_infura_project_id: Option<String>,
        /// Infura IPFS secret key (required for ipfs)
        #[arg(long)]
        ipfs_infura_secret: Option<String>,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::CreateHero { .. } => "create_hero",
            Self::ShowAll => "show_all",
            Self::UpdateHeroPrice { .. } => "update_hero_price",
            Self::BuyHero { .. } => "buy_hero",
            Self::UploadImage { .. } => "upload_image",
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.common.log_level, cli.common.json_logs) {
        eprintln!("failed to initialize logging: {:#}", e);
        std::process::exit(2);
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Initialize logging subsystem
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{}'", level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let common = cli.common;
    let config = Config::load(&common.config)
        .with_context(|| format!("Failed to load config from {}", common.config.display()))?;
    config.validate()?;

    let rpc_url = config.rpc_url(&common.env)?;
    info!(env = %common.env, rpc = %rpc_url, "Connecting");
    let rpc: Arc<dyn HeroRpc> = Arc::new(SolanaRpc::new(
        &rpc_url,
        config.confirm_settings()?.commitment,
        config.rpc_timeout(),
    ));
    let logger = OperationLogger::new(cli.command.name());

    match cli.command {
        Command::CreateHero {
            name,
            uri,
            price,
            owner,
        } => {
            let request = CreateHeroRequest {
                name,
                uri,
                price_lamports: parse_price(&price)?,
                owner_nft_mint: parse_pubkey("owner", &owner)?,
            };
            let ctx = flow_context(rpc, config, &common.env, &common.keypair)?;
            info!(program = %ctx.program_id, "Hero program");
            print_json(&commands::create_hero(&ctx, request, &logger).await?)
        }
        Command::ShowAll => {
            let ctx = FlowContext::new(rpc, config, &common.env, None)?;
            print_json(&commands::show_all(&ctx, &logger).await?)
        }
        Command::UpdateHeroPrice { id, price } => {
            let price = parse_price(&price)?;
            let ctx = flow_context(rpc, config, &common.env, &common.keypair)?;
            let signature = commands::update_hero_price(&ctx, id, price, &logger).await?;
            print_json(&serde_json::json!({ "id": id, "signature": signature.to_string() }))
        }
        Command::BuyHero {
            id,
            name,
            uri,
            price,
        } => {
            let request = PurchaseRequest {
                id,
                new_name: name,
                new_uri: uri,
                new_price: price.as_deref().map(parse_price).transpose()?,
            };
            let ctx = flow_context(rpc, config, &common.env, &common.keypair)?;
            // Metadata always goes to Arweave for purchases
            let uploader = ctx.uploader(StorageKind::Arweave, None)?;
            print_json(&commands::buy_hero(&ctx, request, uploader.as_ref(), &logger).await?)
        }
        Command::UploadImage {
            file,
            storage,
            ipfs_infura_project_id,
            ipfs_infura_secret,
        } => {
            let storage = StorageKind::from_str(&storage)?;
            let credentials = match storage {
                StorageKind::Ipfs => Some(IpfsCredentials::from_options(
                    ipfs_infura_project_id,
                    ipfs_infura_secret,
                )?),
                StorageKind::Arweave => None,
            };
            // Keypair only matters when paying for Arweave storage
            let wallet = match storage {
                StorageKind::Arweave => Some(load_wallet(&common.keypair)?),
                StorageKind::Ipfs => None,
            };
            let submitter = Arc::new(TransactionSubmitter::new(
                rpc,
                config.submit_policy(),
                config.confirm_settings()?,
            ));
            let uploader = build_uploader(
                &config,
                &common.env,
                wallet.as_ref(),
                submitter,
                storage,
                credentials,
            )?;
            let link = commands::upload_image(
                uploader.as_ref(),
                &file,
                &config.upload_policy(),
                &logger,
            )
            .await?;
            print_json(&serde_json::json!({ "file": file.display().to_string(), "link": link }))
        }
    }
}

fn flow_context(
    rpc: Arc<dyn HeroRpc>,
    config: Config,
    env: &str,
    keypair: &str,
) -> Result<FlowContext> {
    let wallet = load_wallet(keypair)?;
    Ok(FlowContext::new(rpc, config, env, Some(wallet))?)
}

fn load_wallet(keypair: &str) -> Result<WalletManager> {
    info!("Loading wallet from: {}", keypair);
    let wallet = WalletManager::from_file(keypair).context("Failed to load wallet")?;
    info!("Wallet address: {}", wallet.pubkey());
    Ok(wallet)
}

fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).with_context(|| format!("{} '{}' is not a valid address", field, value))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
