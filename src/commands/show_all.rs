//! List every hero the program holds

use super::FlowContext;
use crate::errors::HeroResult;
use crate::state::HeroRecord;
use crate::structured_logging::OperationLogger;
use serde::Serialize;

/// One listed hero with the account it lives in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeroListing {
    pub pubkey: String,
    #[serde(flatten)]
    pub record: HeroRecord,
}

/// All decodable hero records, ordered by id
pub async fn show_all(ctx: &FlowContext, logger: &OperationLogger) -> HeroResult<Vec<HeroListing>> {
    let mut listings: Vec<HeroListing> = ctx
        .scanner
        .records(&ctx.program_id, logger)
        .await?
        .into_iter()
        .map(|(pubkey, record)| HeroListing {
            pubkey: pubkey.to_string(),
            record,
        })
        .collect();
    listings.sort_by_key(|l| l.record.id);
    logger.info(&format!("Fetched {} heroes", listings.len()));
    Ok(listings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{mock_context, seed_hero};
    use crate::test_utils::MockRpc;
    use solana_sdk::pubkey::Pubkey;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_listing_is_sorted_and_skips_garbage() {
        let rpc = Arc::new(MockRpc::new());
        let ctx = mock_context(rpc.clone());
        for id in [3u32, 1, 2] {
            seed_hero(
                &rpc,
                &ctx,
                &HeroRecord {
                    id,
                    name: format!("hero-{}", id),
                    uri: "ipfs://x".to_string(),
                    last_price: 0,
                    listed_price: 100,
                    owner_nft_mint: Pubkey::new_unique(),
                },
            );
        }
        rpc.add_account(Pubkey::new_unique(), ctx.program_id, vec![1, 2, 3]);

        let listings = show_all(&ctx, &OperationLogger::new("test")).await.unwrap();

        assert_eq!(
            listings.iter().map(|l| l.record.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        let json = serde_json::to_value(&listings[0]).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["listed_price"], 100);
        assert_eq!(json["pubkey"], ctx.hero_address(1).unwrap().to_string());
        assert!(json["owner_nft_mint"].is_string());
    }

    #[tokio::test]
    async fn test_empty_program() {
        let ctx = mock_context(Arc::new(MockRpc::new()));
        assert!(show_all(&ctx, &OperationLogger::new("test")).await.unwrap().is_empty());
    }
}
