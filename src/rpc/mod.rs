//! Network RPC contract
//!
//! Every flow talks to the cluster through [`HeroRpc`]. The production
//! implementation wraps the nonblocking `RpcClient`; tests script an
//! in-memory double.

pub mod errors;

pub use errors::RpcError;

use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::{
    config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
    filter::{Memcmp, RpcFilterType},
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use std::time::Duration;
use tracing::debug;

/// Narrowing predicate for program account scans
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    /// Account data contains `bytes` at `offset`
    Memcmp { offset: usize, bytes: Vec<u8> },
    /// Account data is exactly this long
    DataSize(u64),
}

impl AccountFilter {
    pub fn memcmp(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Memcmp {
            offset,
            bytes: bytes.into(),
        }
    }

    /// Evaluate the filter locally against raw account data
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            Self::Memcmp { offset, bytes } => data
                .get(*offset..offset.saturating_add(bytes.len()))
                .is_some_and(|window| window == bytes.as_slice()),
            Self::DataSize(size) => data.len() as u64 == *size,
        }
    }
}

impl From<&AccountFilter> for RpcFilterType {
    fn from(filter: &AccountFilter) -> Self {
        match filter {
            AccountFilter::Memcmp { offset, bytes } => {
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(*offset, bytes))
            }
            AccountFilter::DataSize(size) => RpcFilterType::DataSize(*size),
        }
    }
}

/// One account returned by a program scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAccount {
    pub pubkey: Pubkey,
    pub data: Vec<u8>,
}

/// Outcome of a signature status query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    /// Not yet seen at the requested commitment
    Pending,
    Confirmed,
    /// Landed on chain but failed during execution
    Failed(TransactionError),
}

/// Cluster operations the hero flows depend on
#[async_trait]
pub trait HeroRpc: Send + Sync {
    /// Endpoint label used in errors and logs
    fn endpoint(&self) -> &str;

    async fn latest_blockhash(&self) -> Result<Hash, RpcError>;

    /// Whether transactions signed over `blockhash` can still land
    async fn is_blockhash_valid(&self, blockhash: &Hash) -> Result<bool, RpcError>;

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RpcError>;

    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SignatureState, RpcError>;

    async fn program_accounts(
        &self,
        program: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<RawAccount>, RpcError>;

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, RpcError>;

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, RpcError>;
}

/// [`HeroRpc`] backed by a Solana JSON-RPC endpoint
pub struct SolanaRpc {
    client: RpcClient,
    url: String,
}

impl SolanaRpc {
    pub fn new(url: &str, commitment: CommitmentConfig, timeout: Duration) -> Self {
        Self {
            client: RpcClient::new_with_timeout_and_commitment(url.to_string(), timeout, commitment),
            url: url.to_string(),
        }
    }

    fn classify(&self, err: solana_client::client_error::ClientError) -> RpcError {
        RpcError::from_client_error(&err, &self.url)
    }
}

#[async_trait]
impl HeroRpc for SolanaRpc {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| self.classify(e))
    }

    async fn is_blockhash_valid(&self, blockhash: &Hash) -> Result<bool, RpcError> {
        self.client
            .is_blockhash_valid(blockhash, self.client.commitment())
            .await
            .map_err(|e| self.classify(e))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RpcError> {
        self.client
            .send_transaction(transaction)
            .await
            .map_err(|e| self.classify(e))
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SignatureState, RpcError> {
        let status = self
            .client
            .get_signature_status_with_commitment(signature, commitment)
            .await
            .map_err(|e| self.classify(e))?;
        Ok(match status {
            None => SignatureState::Pending,
            Some(Ok(())) => SignatureState::Confirmed,
            Some(Err(err)) => SignatureState::Failed(err),
        })
    }

    async fn program_accounts(
        &self,
        program: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<RawAccount>, RpcError> {
        let config = RpcProgramAccountsConfig {
            filters: if filters.is_empty() {
                None
            } else {
                Some(filters.iter().map(RpcFilterType::from).collect())
            },
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.client.commitment()),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };

        let accounts = self
            .client
            .get_program_accounts_with_config(program, config)
            .await
            .map_err(|e| self.classify(e))?;
        debug!(program = %program, count = accounts.len(), "Fetched program accounts");

        Ok(accounts
            .into_iter()
            .map(|(pubkey, account)| RawAccount {
                pubkey,
                data: account.data,
            })
            .collect())
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, RpcError> {
        let response = self
            .client
            .get_account_with_commitment(address, self.client.commitment())
            .await
            .map_err(|e| self.classify(e))?;
        Ok(response.value.is_some())
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, RpcError> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(|e| self.classify(e))
    }
}
