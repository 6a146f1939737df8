//! Create a hero record under the next free id

use super::{validate_text, FlowContext};
use crate::errors::{HeroError, HeroResult};
use crate::scanner::next_hero_id;
use crate::state::{CreateHeroArgs, HeroRecord};
use crate::structured_logging::OperationLogger;
use crate::tx_builder::create_hero_instruction;
use serde::Serialize;
use solana_sdk::{pubkey::Pubkey, signature::Signature};

/// Ids probed past an already-claimed address before giving up
const MAX_ID_PROBES: u32 = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateHeroRequest {
    pub name: String,
    pub uri: String,
    pub price_lamports: u64,
    pub owner_nft_mint: Pubkey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedHero {
    pub id: u32,
    #[serde(serialize_with = "crate::state::serialize_pubkey")]
    pub address: Pubkey,
    #[serde(serialize_with = "serialize_signature")]
    pub signature: Signature,
}

fn serialize_signature<S: serde::Serializer>(sig: &Signature, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&sig.to_string())
}

pub async fn create_hero(
    ctx: &FlowContext,
    request: CreateHeroRequest,
    logger: &OperationLogger,
) -> HeroResult<CreatedHero> {
    validate_text("name", &request.name)?;
    validate_text("uri", &request.uri)?;
    let wallet = ctx.wallet()?;
    let max_claims = ctx.config.create.max_id_claim_attempts.max(1);

    let mut last_error = None;
    for claim in 1..=max_claims {
        let records = ctx.scanner.records(&ctx.program_id, logger).await?;
        logger.info(&format!("Fetched hero count: {}", records.len()));

        let (id, address) = claimable_id(ctx, next_hero_id(records.iter().map(|(_, r)| r))?, logger).await?;
        logger.info(&format!("New hero id {} at {}", id, address));

        let args = CreateHeroArgs {
            data: HeroRecord {
                id,
                name: request.name.clone(),
                uri: request.uri.clone(),
                last_price: 0,
                listed_price: request.price_lamports,
                owner_nft_mint: request.owner_nft_mint,
            },
            id,
        };
        let ix = create_hero_instruction(&ctx.program_id, &address, &wallet.pubkey(), args)?;

        let err = match ctx.submitter.submit(&[ix], wallet.keypair(), &[], logger).await {
            Ok(signature) => {
                ctx.submitter.confirm_best_effort(&signature, logger).await;
                logger.info(&format!("Hero {} created: {}", id, signature));
                return Ok(CreatedHero {
                    id,
                    address,
                    signature,
                });
            }
            Err(err) => err,
        };

        let lost_race =
            matches!(err, HeroError::Rejected { .. }) && ctx.rpc.account_exists(&address).await?;
        if !lost_race {
            return Err(err);
        }
        logger.warn(&format!(
            "Hero id {} was claimed by another writer (claim {}/{}): {}",
            id, claim, max_claims, err
        ));
        last_error = Some(err);
    }

    Err(last_error.unwrap_or_else(|| HeroError::validation("could not claim a hero id")))
}

/// First id at or after `start` whose account does not exist yet
async fn claimable_id(ctx: &FlowContext, start: u32, logger: &OperationLogger) -> HeroResult<(u32, Pubkey)> {
    let mut id = start;
    for _ in 0..MAX_ID_PROBES {
        let address = ctx.hero_address(id)?;
        if !ctx.rpc.account_exists(&address).await? {
            return Ok((id, address));
        }
        logger.debug(&format!("Hero id {} already has an account, probing next", id));
        id = id
            .checked_add(1)
            .ok_or_else(|| HeroError::validation("hero id space exhausted"))?;
    }
    Err(HeroError::validation(format!(
        "no free hero id within {} of {}",
        MAX_ID_PROBES, start
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{mock_context, seed_hero};
    use crate::state::HeroInstruction;
    use crate::test_utils::MockRpc;
    use std::sync::Arc;

    fn request() -> CreateHeroRequest {
        CreateHeroRequest {
            name: "Thor".to_string(),
            uri: "ipfs://thor".to_string(),
            price_lamports: 5_000_000_000,
            owner_nft_mint: Pubkey::new_unique(),
        }
    }

    fn hero(id: u32) -> HeroRecord {
        HeroRecord {
            id,
            name: format!("hero-{}", id),
            uri: "ipfs://x".to_string(),
            last_price: 0,
            listed_price: 1,
            owner_nft_mint: Pubkey::new_unique(),
        }
    }

    fn sent_args(rpc: &MockRpc) -> CreateHeroArgs {
        let tx = rpc.sent_transactions().pop().unwrap();
        let data = &tx.message.instructions[0].data;
        match HeroInstruction::from_bytes(data).unwrap() {
            HeroInstruction::Create(args) => args,
            other => panic!("unexpected instruction {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_hero_gets_id_one() {
        let rpc = Arc::new(MockRpc::new());
        let ctx = mock_context(rpc.clone());

        let created = create_hero(&ctx, request(), &OperationLogger::new("test")).await.unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(created.address, ctx.hero_address(1).unwrap());
        let args = sent_args(&rpc);
        assert_eq!(args.id, 1);
        assert_eq!(args.data.last_price, 0);
        assert_eq!(args.data.listed_price, 5_000_000_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_id_follows_highest_existing() {
        let rpc = Arc::new(MockRpc::new());
        let ctx = mock_context(rpc.clone());
        seed_hero(&rpc, &ctx, &hero(1));
        seed_hero(&rpc, &ctx, &hero(4));

        let created = create_hero(&ctx, request(), &OperationLogger::new("test")).await.unwrap();
        assert_eq!(created.id, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_race_rescans_and_takes_next_id() {
        let rpc = Arc::new(MockRpc::new());
        let ctx = mock_context(rpc.clone());
        seed_hero(&rpc, &ctx, &hero(1));

        // Another writer lands hero 2 while our first submission is in flight
        let mut rival = codec_bytes(&hero(2));
        rival.resize(rival.len() + 64, 0);
        rpc.lose_race_on_next_send(ctx.hero_address(2).unwrap(), ctx.program_id, rival);

        let created = create_hero(&ctx, request(), &OperationLogger::new("test")).await.unwrap();

        assert_eq!(created.id, 3);
        assert_eq!(rpc.send_attempts(), 2);
        assert_eq!(sent_args(&rpc).id, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_landing_first_attempt_is_not_created_twice() {
        use crate::retry::RetryPolicy;
        use crate::rpc::SignatureState;
        use crate::tx_builder::{ConfirmSettings, TransactionSubmitter};
        use solana_sdk::{instruction::InstructionError, transaction::TransactionError};
        use std::time::Duration;

        let rpc = Arc::new(MockRpc::new());
        let mut ctx = mock_context(rpc.clone());
        ctx.submitter = Arc::new(TransactionSubmitter::new(
            Arc::clone(&ctx.rpc),
            RetryPolicy::immediate(3),
            ConfirmSettings {
                timeout: Duration::from_secs(1),
                ..ConfirmSettings::default()
            },
        ));
        rpc.expire_blockhashes();
        // First attempt outlives its ack window and the next check, then lands
        let mut first = vec![SignatureState::Pending; 4];
        first.push(SignatureState::Confirmed);
        rpc.script_statuses(0, first);
        // Re-signed attempt fails because hero 1 already exists
        rpc.script_statuses(
            1,
            vec![SignatureState::Failed(TransactionError::InstructionError(
                0,
                InstructionError::Custom(0),
            ))],
        );

        let created = create_hero(&ctx, request(), &OperationLogger::new("test")).await.unwrap();

        let sent = rpc.sent_transactions();
        assert_eq!(created.id, 1);
        assert_eq!(created.signature, sent[0].signatures[0]);
        assert_eq!(rpc.send_attempts(), 2);
        assert!(sent.iter().all(|tx| {
            matches!(
                HeroInstruction::from_bytes(&tx.message.instructions[0].data).unwrap(),
                HeroInstruction::Create(CreateHeroArgs { id: 1, .. })
            )
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_without_rival_is_surfaced() {
        let rpc = Arc::new(MockRpc::new());
        let ctx = mock_context(rpc.clone());
        rpc.fail_next_sends(vec![crate::rpc::RpcError::InsufficientFunds {
            endpoint: "mock".to_string(),
        }]);

        let err = create_hero(&ctx, request(), &OperationLogger::new("test")).await.unwrap_err();
        assert!(matches!(err, HeroError::Rejected { .. }));
        assert_eq!(rpc.send_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_input_never_touches_network() {
        let rpc = Arc::new(MockRpc::new());
        let ctx = mock_context(rpc.clone());
        let mut req = request();
        req.name.clear();

        let err = create_hero(&ctx, req, &OperationLogger::new("test")).await.unwrap_err();
        assert!(matches!(err, HeroError::Validation(_)));
        assert_eq!(rpc.send_attempts(), 0);
    }

    fn codec_bytes(record: &HeroRecord) -> Vec<u8> {
        crate::codec::encode(crate::state::hero_schema(), record).unwrap()
    }
}
