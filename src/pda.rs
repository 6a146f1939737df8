//! Program-derived address helpers
//!
//! Hero accounts live at `[seed, id.to_le_bytes()]` under the hero program.
//! The seed bytes and the 4-byte id encoding must match the on-chain program
//! exactly; any drift derives an address nobody owns.

use crate::errors::{HeroError, HeroResult};
use solana_sdk::{pubkey, pubkey::Pubkey};

/// Metaplex Token Metadata program
pub const TOKEN_METADATA_PROGRAM_ID: Pubkey = pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzbb6K8bt518x1s");

const METADATA_PREFIX: &[u8] = b"metadata";
const EDITION_SUFFIX: &[u8] = b"edition";
const MAX_SEED_LEN: usize = 32;

/// Derive the account address of hero `id`
///
/// Returns the address and its bump. Pure and deterministic.
pub fn derive_hero_address(seed: &str, id: u32, program: &Pubkey) -> HeroResult<(Pubkey, u8)> {
    if seed.is_empty() || seed.len() > MAX_SEED_LEN {
        return Err(HeroError::validation(format!(
            "hero seed must be 1..={} bytes, got {}",
            MAX_SEED_LEN,
            seed.len()
        )));
    }
    let id_bytes = id.to_le_bytes();
    Pubkey::try_find_program_address(&[seed.as_bytes(), &id_bytes], program).ok_or_else(|| {
        HeroError::validation(format!("no viable bump for hero {} under {}", id, program))
    })
}

/// Token Metadata account of `mint`
pub fn metadata_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[METADATA_PREFIX, TOKEN_METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
        &TOKEN_METADATA_PROGRAM_ID,
    )
    .0
}

/// Master edition account of `mint`
pub fn master_edition_address(mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[
            METADATA_PREFIX,
            TOKEN_METADATA_PROGRAM_ID.as_ref(),
            mint.as_ref(),
            EDITION_SUFFIX,
        ],
        &TOKEN_METADATA_PROGRAM_ID,
    )
    .0
}

/// Associated token account of `wallet` for `mint`
pub fn token_wallet_address(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(wallet, mint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_derivation_is_deterministic() {
        let program = Pubkey::new_unique();
        let a = derive_hero_address("hero", 7, &program).unwrap();
        let b = derive_hero_address("hero", 7, &program).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_ids_give_distinct_addresses() {
        let program = Pubkey::new_unique();
        let addresses: HashSet<Pubkey> = (1..=300u32)
            .map(|id| derive_hero_address("hero", id, &program).unwrap().0)
            .collect();
        assert_eq!(addresses.len(), 300);
    }

    #[test]
    fn test_seed_bytes_match_manual_construction() {
        let program = Pubkey::new_unique();
        let (expected, bump) =
            Pubkey::find_program_address(&[b"hero", &[5, 0, 0, 0]], &program);
        assert_eq!(derive_hero_address("hero", 5, &program).unwrap(), (expected, bump));
    }

    #[test]
    fn test_seed_and_program_change_the_address() {
        let program = Pubkey::new_unique();
        let base = derive_hero_address("hero", 1, &program).unwrap().0;
        assert_ne!(base, derive_hero_address("villain", 1, &program).unwrap().0);
        assert_ne!(
            base,
            derive_hero_address("hero", 1, &Pubkey::new_unique()).unwrap().0
        );
    }

    #[test]
    fn test_oversized_seed_rejected() {
        let program = Pubkey::new_unique();
        let seed = "x".repeat(33);
        assert!(matches!(
            derive_hero_address(&seed, 1, &program),
            Err(HeroError::Validation(_))
        ));
    }

    #[test]
    fn test_metadata_and_edition_differ() {
        let mint = Pubkey::new_unique();
        assert_ne!(metadata_address(&mint), master_edition_address(&mint));
        assert_eq!(metadata_address(&mint), metadata_address(&mint));
    }
}
