//! Change the listed price of a hero

use super::FlowContext;
use crate::errors::{HeroError, HeroResult};
use crate::state::UpdateHeroPriceArgs;
use crate::structured_logging::OperationLogger;
use crate::tx_builder::update_hero_price_instruction;
use solana_sdk::signature::Signature;

pub async fn update_hero_price(
    ctx: &FlowContext,
    id: u32,
    price_lamports: u64,
    logger: &OperationLogger,
) -> HeroResult<Signature> {
    let wallet = ctx.wallet()?;
    let address = ctx.hero_address(id)?;
    logger.info(&format!("Hero {} account: {}", id, address));

    let record = ctx
        .scanner
        .find_record(&ctx.program_id, &address, logger)
        .await?
        .ok_or_else(|| HeroError::validation(format!("hero {} does not exist", id)))?;
    logger.info(&format!("Owner NFT mint: {}", record.owner_nft_mint));

    let holder = ctx.scanner.find_nft_holder(&record.owner_nft_mint, logger).await?;
    logger.info(&format!(
        "Token account {} held by {}",
        holder.token_account, holder.owner
    ));
    if holder.owner != wallet.pubkey() {
        logger.warn(&format!(
            "Wallet {} does not hold the ownership NFT; the program will refuse the update",
            wallet.pubkey()
        ));
    }

    let ix = update_hero_price_instruction(
        &ctx.program_id,
        &address,
        &wallet.pubkey(),
        &holder.token_account,
        UpdateHeroPriceArgs {
            id,
            price: price_lamports,
        },
    )?;

    let signature = ctx.submitter.submit(&[ix], wallet.keypair(), &[], logger).await?;
    ctx.submitter.confirm_best_effort(&signature, logger).await;
    logger.info(&format!("Hero {} price set to {} lamports: {}", id, price_lamports, signature));
    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{mock_context, seed_hero};
    use crate::state::{HeroInstruction, HeroRecord};
    use crate::test_utils::{token_account_data, MockRpc};
    use solana_sdk::pubkey::Pubkey;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_update_targets_holder_token_account() {
        let rpc = Arc::new(MockRpc::new());
        let ctx = mock_context(rpc.clone());
        let mint = Pubkey::new_unique();
        let address = seed_hero(
            &rpc,
            &ctx,
            &HeroRecord {
                id: 2,
                name: "Odin".to_string(),
                uri: "ipfs://odin".to_string(),
                last_price: 0,
                listed_price: 1,
                owner_nft_mint: mint,
            },
        );
        let token_account = Pubkey::new_unique();
        let owner = ctx.wallet().unwrap().pubkey();
        rpc.add_account(token_account, spl_token::id(), token_account_data(&mint, &owner, 1));

        let sig = update_hero_price(&ctx, 2, 7_500_000_000, &OperationLogger::new("test"))
            .await
            .unwrap();

        let tx = &rpc.sent_transactions()[0];
        assert_eq!(tx.signatures[0], sig);
        let ix = &tx.message.instructions[0];
        let keys: Vec<Pubkey> = ix
            .accounts
            .iter()
            .map(|&i| tx.message.account_keys[i as usize])
            .collect();
        assert_eq!(keys, vec![address, owner, token_account]);
        assert_eq!(
            HeroInstruction::from_bytes(&ix.data).unwrap(),
            HeroInstruction::UpdatePrice(UpdateHeroPriceArgs {
                id: 2,
                price: 7_500_000_000
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_hero_is_validation_error() {
        let rpc = Arc::new(MockRpc::new());
        let ctx = mock_context(rpc.clone());

        let err = update_hero_price(&ctx, 9, 1, &OperationLogger::new("test"))
            .await
            .unwrap_err();

        assert!(matches!(err, HeroError::Validation(_)));
        assert_eq!(rpc.send_attempts(), 0);
    }
}
