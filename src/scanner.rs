//! Program account scanning
//!
//! Hero records are found by listing every account the program owns and
//! decoding each one. A single malformed account must not poison the
//! listing, so decode failures are logged and skipped.

use crate::errors::{HeroError, HeroResult};
use crate::rpc::{AccountFilter, HeroRpc, RawAccount};
use crate::state::HeroRecord;
use crate::structured_logging::OperationLogger;
use solana_sdk::pubkey::Pubkey;
use spl_token::solana_program::program_pack::Pack;
use std::sync::Arc;

/// Size of an SPL token account
pub const TOKEN_ACCOUNT_LEN: u64 = 165;

/// Token account currently holding a hero's ownership NFT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NftHolder {
    pub token_account: Pubkey,
    pub owner: Pubkey,
}

pub struct RecordScanner {
    rpc: Arc<dyn HeroRpc>,
}

impl RecordScanner {
    pub fn new(rpc: Arc<dyn HeroRpc>) -> Self {
        Self { rpc }
    }

    /// Every account owned by `program` that passes `filters`
    pub async fn scan_all(&self, program: &Pubkey, filters: &[AccountFilter]) -> HeroResult<Vec<RawAccount>> {
        Ok(self.rpc.program_accounts(program, filters).await?)
    }

    /// Decode hero records, skipping accounts that do not decode
    pub fn decode_all(&self, raw: Vec<RawAccount>, logger: &OperationLogger) -> Vec<(Pubkey, HeroRecord)> {
        decode_records(raw, logger)
    }

    /// Scan and decode in one step
    pub async fn records(&self, program: &Pubkey, logger: &OperationLogger) -> HeroResult<Vec<(Pubkey, HeroRecord)>> {
        let raw = self.scan_all(program, &[]).await?;
        logger.debug(&format!("Fetched {} program accounts", raw.len()));
        Ok(decode_records(raw, logger))
    }

    /// Record stored at `address`, if the program owns one there
    pub async fn find_record(
        &self,
        program: &Pubkey,
        address: &Pubkey,
        logger: &OperationLogger,
    ) -> HeroResult<Option<HeroRecord>> {
        let raw = self.scan_all(program, &[]).await?;
        let Some(account) = raw.into_iter().find(|a| a.pubkey == *address) else {
            return Ok(None);
        };
        match HeroRecord::from_account_data(&account.data) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                logger.log_decode_skipped(&address.to_string(), &err.to_string());
                Err(HeroError::Decode(err))
            }
        }
    }

    /// Token account holding exactly one unit of `mint`, and its owner
    pub async fn find_nft_holder(&self, mint: &Pubkey, logger: &OperationLogger) -> HeroResult<NftHolder> {
        let filters = [
            AccountFilter::memcmp(0, mint.to_bytes().to_vec()),
            AccountFilter::DataSize(TOKEN_ACCOUNT_LEN),
        ];
        let accounts = self.scan_all(&spl_token::id(), &filters).await?;
        logger.debug(&format!("{} token accounts for mint {}", accounts.len(), mint));

        accounts
            .iter()
            .find_map(|raw| {
                let account = spl_token::state::Account::unpack(&raw.data).ok()?;
                (account.mint == *mint && account.amount == 1).then_some(NftHolder {
                    token_account: raw.pubkey,
                    owner: account.owner,
                })
            })
            .ok_or_else(|| HeroError::validation(format!("no holder found for ownership NFT {}", mint)))
    }
}

/// Decode hero records, skipping accounts that do not decode
pub fn decode_records(raw: Vec<RawAccount>, logger: &OperationLogger) -> Vec<(Pubkey, HeroRecord)> {
    raw.into_iter()
        .filter_map(|account| match HeroRecord::from_account_data(&account.data) {
            Ok(record) => Some((account.pubkey, record)),
            Err(err) => {
                logger.log_decode_skipped(&account.pubkey.to_string(), &err.to_string());
                None
            }
        })
        .collect()
}

/// Next free hero id: one past the highest id seen, 1 for an empty program
pub fn next_hero_id<'a>(records: impl IntoIterator<Item = &'a HeroRecord>) -> HeroResult<u32> {
    match records.into_iter().map(|r| r.id).max() {
        None => Ok(1),
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| HeroError::validation("hero id space exhausted")),
    }
}
