//! CLI flows
//!
//! Each flow validates its input before touching the network, then drives
//! the scanner, the submitter and (for purchases and uploads) a storage
//! backend through one shared [`FlowContext`].

pub mod create_hero;
pub mod purchase_hero;
pub mod show_all;
pub mod update_price;
pub mod upload_image;

pub use create_hero::{create_hero, CreateHeroRequest, CreatedHero};
pub use purchase_hero::{buy_hero, PurchaseRequest, PurchasedHero};
pub use show_all::{show_all, HeroListing};
pub use update_price::update_hero_price;
pub use upload_image::upload_image;

use crate::config::Config;
use crate::errors::{HeroError, HeroResult};
use crate::pda::derive_hero_address;
use crate::rpc::HeroRpc;
use crate::scanner::RecordScanner;
use crate::tx_builder::TransactionSubmitter;
use crate::upload::{ArweaveUploader, IpfsCredentials, IpfsUploader, StorageKind, Uploader};
use crate::wallet::WalletManager;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Everything a flow needs to talk to the cluster
pub struct FlowContext {
    pub rpc: Arc<dyn HeroRpc>,
    pub submitter: Arc<TransactionSubmitter<dyn HeroRpc>>,
    pub scanner: RecordScanner,
    pub program_id: Pubkey,
    pub config: Config,
    /// Cluster name passed to storage services
    pub env: String,
    wallet: Option<WalletManager>,
}

impl FlowContext {
    pub fn new(
        rpc: Arc<dyn HeroRpc>,
        config: Config,
        env: &str,
        wallet: Option<WalletManager>,
    ) -> HeroResult<Self> {
        let program_id = config.program_id()?;
        let submitter = Arc::new(TransactionSubmitter::new(
            Arc::clone(&rpc),
            config.submit_policy(),
            config.confirm_settings()?,
        ));
        Ok(Self {
            scanner: RecordScanner::new(Arc::clone(&rpc)),
            rpc,
            submitter,
            program_id,
            config,
            env: env.to_string(),
            wallet,
        })
    }

    /// Signing wallet; flows that submit transactions require one
    pub fn wallet(&self) -> HeroResult<&WalletManager> {
        self.wallet
            .as_ref()
            .ok_or_else(|| HeroError::validation("this command needs a keypair (--keypair)"))
    }

    pub fn hero_address(&self, id: u32) -> HeroResult<Pubkey> {
        derive_hero_address(&self.config.program.hero_seed, id, &self.program_id).map(|(address, _)| address)
    }

    /// Storage backend for `storage`
    pub fn uploader(
        &self,
        storage: StorageKind,
        ipfs_credentials: Option<IpfsCredentials>,
    ) -> HeroResult<Box<dyn Uploader>> {
        build_uploader(
            &self.config,
            &self.env,
            self.wallet.as_ref(),
            Arc::clone(&self.submitter),
            storage,
            ipfs_credentials,
        )
    }
}

/// Storage backend without a hero program context
///
/// Arweave pays for storage with `wallet` through `submitter`; IPFS only
/// needs credentials.
pub fn build_uploader(
    config: &Config,
    env: &str,
    wallet: Option<&WalletManager>,
    submitter: Arc<TransactionSubmitter<dyn HeroRpc>>,
    storage: StorageKind,
    ipfs_credentials: Option<IpfsCredentials>,
) -> HeroResult<Box<dyn Uploader>> {
    let timeout = Duration::from_secs(config.upload.request_timeout_secs);
    let uploader: Box<dyn Uploader> = match storage {
        StorageKind::Arweave => {
            let wallet = wallet.ok_or_else(|| {
                HeroError::validation("arweave storage needs a keypair (--keypair) to pay for storage")
            })?;
            Box::new(
                ArweaveUploader::new(
                    &config.upload.arweave_endpoint,
                    env,
                    config.upload.storage_cost_lamports,
                    wallet.keypair_arc(),
                    submitter,
                    timeout,
                )
                .map_err(|e| HeroError::config(format!("arweave client: {}", e)))?,
            )
        }
        StorageKind::Ipfs => {
            let credentials = ipfs_credentials.ok_or_else(|| {
                HeroError::validation(
                    "ipfs storage needs --ipfs-infura-project-id and --ipfs-infura-secret",
                )
            })?;
            Box::new(
                IpfsUploader::new(
                    &config.upload.ipfs_api_url,
                    &config.upload.ipfs_gateway,
                    credentials,
                    timeout,
                )
                .map_err(|e| HeroError::config(format!("ipfs client: {}", e)))?,
            )
        }
    };
    Ok(uploader)
}

/// SOL amount to lamports, rounding up
pub fn parse_price(input: &str) -> HeroResult<u64> {
    let sol: f64 = input
        .trim()
        .parse()
        .map_err(|_| HeroError::validation(format!("price '{}' is not a number", input)))?;
    if !sol.is_finite() || sol < 0.0 {
        return Err(HeroError::validation(format!(
            "price must be a finite, non-negative SOL amount, got {}",
            input
        )));
    }
    let lamports = (sol * LAMPORTS_PER_SOL).ceil();
    if lamports > u64::MAX as f64 {
        return Err(HeroError::validation(format!("price {} SOL is too large", input)));
    }
    Ok(lamports as u64)
}

/// Names and URIs are stored as program strings; NUL would be trimmed on read
pub(crate) fn validate_text(field: &str, value: &str) -> HeroResult<()> {
    if value.is_empty() {
        return Err(HeroError::validation(format!("{} must not be empty", field)));
    }
    if value.contains('\0') {
        return Err(HeroError::validation(format!("{} must not contain NUL", field)));
    }
    Ok(())
}
