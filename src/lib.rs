//! Hero NFT client library
//!
//! Builds, signs and submits transactions for the on-chain hero program:
//! creating heroes, listing them, repricing, and buying them with a fresh
//! ownership NFT. Images and NFT metadata go to Arweave or IPFS first.
//!
//! The binary in `main.rs` is a thin clap front end over [`commands`].

pub mod codec;
pub mod commands;
pub mod config;
pub mod errors;
pub mod pda;
pub mod retry;
pub mod rpc;
pub mod scanner;
pub mod state;
pub mod structured_logging;
pub mod tx_builder;
pub mod upload;
pub mod wallet;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

// Re-export commonly used types
pub use errors::{HeroError, HeroResult};
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
pub use state::HeroRecord;
