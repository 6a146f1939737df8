//! Configuration module for the hero CLI
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and resolves cluster names to RPC URLs.

use crate::errors::{HeroError, HeroResult};
use crate::retry::RetryPolicy;
use crate::tx_builder::ConfirmSettings;
use crate::upload::arweave::{DEFAULT_ARWEAVE_ENDPOINT, STORAGE_COST_LAMPORTS};
use crate::upload::ipfs::{DEFAULT_IPFS_API, DEFAULT_IPFS_GATEWAY};
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const PROGRAM_ID_ENV: &str = "HERO_METADATA_PROGRAM_ID";
pub const RPC_URL_ENV: &str = "HERO_RPC_URL";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub program: ProgramConfig,
    pub rpc: RpcConfig,
    pub submit: SubmitConfig,
    pub upload: UploadConfig,
    pub create: CreateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    /// Hero program id (base58); `HERO_METADATA_PROGRAM_ID` overrides
    pub program_id: Option<String>,

    /// First PDA seed of hero accounts
    pub hero_seed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Explicit RPC URL; wins over the `--env` cluster name
    pub url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub jitter_factor: f64,
    pub confirm_poll_ms: u64,
    pub confirm_timeout_secs: u64,
    /// processed, confirmed or finalized
    pub commitment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub request_timeout_secs: u64,
    pub arweave_endpoint: String,
    pub storage_cost_lamports: u64,
    /// Image bundled with metadata manifests on Arweave
    pub meta_image: Option<PathBuf>,
    pub ipfs_api_url: String,
    pub ipfs_gateway: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateConfig {
    /// Fresh ids tried when another writer claims ours first
    pub max_id_claim_attempts: u32,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            program_id: None,
            hero_seed: "hero".to_string(),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 30,
        }
    }
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff_ms: 500,
            max_backoff_ms: 8_000,
            jitter_factor: 0.2,
            confirm_poll_ms: 500,
            confirm_timeout_secs: 30,
            commitment: "confirmed".to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff_ms: 1_000,
            max_backoff_ms: 16_000,
            request_timeout_secs: 60,
            arweave_endpoint: DEFAULT_ARWEAVE_ENDPOINT.to_string(),
            storage_cost_lamports: STORAGE_COST_LAMPORTS,
            meta_image: None,
            ipfs_api_url: DEFAULT_IPFS_API.to_string(),
            ipfs_gateway: DEFAULT_IPFS_GATEWAY.to_string(),
        }
    }
}

impl Default for CreateConfig {
    fn default() -> Self {
        Self {
            max_id_claim_attempts: 3,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> HeroResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> HeroResult<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| HeroError::config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.env`, then the TOML file if it exists, then environment overrides
    pub fn load(path: &Path) -> HeroResult<Self> {
        dotenvy::dotenv().ok();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup(PROGRAM_ID_ENV).filter(|v| !v.is_empty()) {
            self.program.program_id = Some(id);
        }
        if let Some(url) = lookup(RPC_URL_ENV).filter(|v| !v.is_empty()) {
            self.rpc.url = Some(url);
        }
    }

    pub fn validate(&self) -> HeroResult<()> {
        if self.program.hero_seed.is_empty() || self.program.hero_seed.len() > 32 {
            return Err(HeroError::config("program.hero_seed must be 1..=32 bytes"));
        }
        if self.submit.max_attempts == 0 || self.upload.max_attempts == 0 {
            return Err(HeroError::config("max_attempts must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.submit.jitter_factor) {
            return Err(HeroError::config("submit.jitter_factor must be within 0.0..=1.0"));
        }
        if self.create.max_id_claim_attempts == 0 {
            return Err(HeroError::config("create.max_id_claim_attempts must be at least 1"));
        }
        parse_commitment(&self.submit.commitment)?;
        Ok(())
    }

    /// Hero program id; required by every on-chain command
    pub fn program_id(&self) -> HeroResult<Pubkey> {
        let raw = self.program.program_id.as_deref().ok_or_else(|| {
            HeroError::config(format!("{} is not set", PROGRAM_ID_ENV))
        })?;
        Pubkey::from_str(raw)
            .map_err(|e| HeroError::config(format!("{} is not a valid pubkey: {}", PROGRAM_ID_ENV, e)))
    }

    /// RPC URL: explicit override, otherwise the `env` cluster
    pub fn rpc_url(&self, env: &str) -> HeroResult<String> {
        match &self.rpc.url {
            Some(url) => Ok(url.clone()),
            None => resolve_cluster(env),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.timeout_secs)
    }

    pub fn submit_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.submit.max_attempts,
            base_delay_ms: self.submit.base_backoff_ms,
            max_delay_ms: self.submit.max_backoff_ms,
            jitter_factor: self.submit.jitter_factor,
            ..RetryPolicy::default()
        }
    }

    pub fn upload_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.upload.max_attempts,
            base_delay_ms: self.upload.base_backoff_ms,
            max_delay_ms: self.upload.max_backoff_ms,
            ..RetryPolicy::upload()
        }
    }

    pub fn confirm_settings(&self) -> HeroResult<ConfirmSettings> {
        Ok(ConfirmSettings {
            commitment: parse_commitment(&self.submit.commitment)?,
            poll_interval: Duration::from_millis(self.submit.confirm_poll_ms),
            timeout: Duration::from_secs(self.submit.confirm_timeout_secs),
        })
    }
}

fn parse_commitment(level: &str) -> HeroResult<CommitmentConfig> {
    match level {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        other => Err(HeroError::config(format!("unknown commitment level '{}'", other))),
    }
}

/// Map a cluster name or URL to an RPC URL
pub fn resolve_cluster(env: &str) -> HeroResult<String> {
    let url = match env {
        "mainnet-beta" => "https://api.mainnet-beta.solana.com",
        "testnet" => "https://api.testnet.solana.com",
        "devnet" => "https://api.devnet.solana.com",
        "localnet" => "http://127.0.0.1:8899",
        url if url.starts_with("http://") || url.starts_with("https://") => url,
        other => {
            return Err(HeroError::validation(format!(
                "unknown cluster '{}'; use mainnet-beta, testnet, devnet, localnet or an http(s) URL",
                other
            )))
        }
    };
    Ok(url.to_string())
}
