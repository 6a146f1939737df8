//! Error taxonomy for hero flows
//!
//! - `Validation`: bad caller input, raised before any network call
//! - `Submission`: transient failures outlasted the retry budget
//! - `Rejected`: the cluster or program refused the transaction; never retried
//! - `Decode`: malformed account bytes
//! - `Upload`: off-chain storage failed after bounded retries

use crate::codec::CodecError;
use crate::rpc::RpcError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeroError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Submission failed after {attempts} attempts: {last_error}")]
    Submission { attempts: u32, last_error: RpcError },

    #[error("Transaction rejected: {reason}")]
    Rejected { reason: String, code: Option<u32> },

    #[error("Decode error: {0}")]
    Decode(#[from] CodecError),

    #[error("Upload failed after {attempts} attempts: {last_error}")]
    Upload { attempts: u32, last_error: String },

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HeroError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    /// Lift a classified RPC error, mapping semantic refusals to `Rejected`
    pub fn from_rpc(err: RpcError) -> Self {
        if err.is_rejection() {
            Self::Rejected {
                code: err.code(),
                reason: err.to_string(),
            }
        } else {
            Self::Rpc(err)
        }
    }

    /// Check if this error is potentially retryable by the caller
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rpc(e) => e.is_retryable(),
            Self::Submission { .. } => true,
            Self::Upload { .. } => true,
            Self::Validation(_)
            | Self::Rejected { .. }
            | Self::Decode(_)
            | Self::Config(_)
            | Self::Io(_) => false,
        }
    }

    /// Get the error category for structured logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Submission { .. } => "submission",
            Self::Rejected { .. } => "rejected",
            Self::Decode(_) => "decode",
            Self::Upload { .. } => "upload",
            Self::Rpc(_) => "rpc",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

pub type HeroResult<T> = Result<T, HeroError>;
