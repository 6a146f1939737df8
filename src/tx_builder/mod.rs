//! Transaction building and submission
//!
//! ## Architecture
//!
//! - **instructions**: hero and Token Metadata instruction builders, plan
//!   ordering checks
//! - **submit**: signing, sending and ack polling with bounded retry
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use hero_nft::retry::RetryPolicy;
//! use hero_nft::rpc::SolanaRpc;
//! use hero_nft::structured_logging::OperationLogger;
//! use hero_nft::tx_builder::{ConfirmSettings, TransactionSubmitter};
//! use solana_sdk::{commitment_config::CommitmentConfig, signature::Keypair};
//! use std::{sync::Arc, time::Duration};
//!
//! # async fn example(ixs: Vec<solana_sdk::instruction::Instruction>) -> hero_nft::errors::HeroResult<()> {
//! let rpc = Arc::new(SolanaRpc::new(
//!     "https://api.devnet.solana.com",
//!     CommitmentConfig::confirmed(),
//!     Duration::from_secs(30),
//! ));
//! let submitter = TransactionSubmitter::new(rpc, RetryPolicy::default(), ConfirmSettings::default());
//! let payer = Keypair::new();
//! let logger = OperationLogger::new("example");
//!
//! let signature = submitter.submit(&ixs, &payer, &[], &logger).await?;
//! submitter.confirm_best_effort(&signature, &logger).await;
//! # Ok(())
//! # }
//! ```

pub mod instructions;
pub mod submit;

pub use instructions::{
    create_hero_instruction, create_hero_instruction_with_data, create_master_edition_instruction,
    create_metadata_instruction, purchase_hero_instruction, purchase_hero_instruction_with_data,
    sanity_check_mint_order, update_hero_price_instruction,
    update_hero_price_instruction_with_data, InstructionPlan,
};
pub use submit::{ConfirmSettings, TransactionSubmitter};
