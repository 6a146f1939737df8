//! Buy a hero and mint the buyer a fresh ownership NFT
//!
//! One atomic transaction carries the purchase and the whole mint:
//! create mint account, purchase, initialize mint, buyer ATA, metadata,
//! mint one token, master edition. The metadata JSON is uploaded first
//! since its link goes into the metadata instruction.

use super::{validate_text, FlowContext};
use crate::errors::{HeroError, HeroResult};
use crate::pda::{master_edition_address, metadata_address, token_wallet_address};
use crate::state::{
    CreateMasterEditionArgs, CreateMetadataArgs, Creator, MetadataData, PurchaseHeroArgs,
};
use crate::structured_logging::OperationLogger;
use crate::tx_builder::{
    create_master_edition_instruction, create_metadata_instruction, purchase_hero_instruction,
    sanity_check_mint_order, InstructionPlan,
};
use crate::upload::{upload_with_retry, NftMetadata, UploadContent, Uploader};
use serde::Serialize;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction,
};
use spl_associated_token_account::instruction::create_associated_token_account;
use spl_token::solana_program::program_pack::Pack;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseRequest {
    pub id: u32,
    pub new_name: Option<String>,
    pub new_uri: Option<String>,
    pub new_price: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchasedHero {
    #[serde(serialize_with = "crate::state::serialize_pubkey")]
    pub metadata: Pubkey,
    #[serde(serialize_with = "crate::state::serialize_pubkey")]
    pub mint: Pubkey,
    pub signature: String,
    pub metadata_uri: String,
}

/// Empty strings mean "keep the current value"
fn normalize(field: &str, value: Option<String>) -> HeroResult<Option<String>> {
    match value.filter(|v| !v.is_empty()) {
        Some(v) => {
            validate_text(field, &v)?;
            Ok(Some(v))
        }
        None => Ok(None),
    }
}

pub async fn buy_hero(
    ctx: &FlowContext,
    request: PurchaseRequest,
    uploader: &dyn Uploader,
    logger: &OperationLogger,
) -> HeroResult<PurchasedHero> {
    let new_name = normalize("new name", request.new_name)?;
    let new_uri = normalize("new uri", request.new_uri)?;
    let wallet = ctx.wallet()?;
    let buyer = wallet.pubkey();
    let id = request.id;

    // Resolving
    let address = ctx.hero_address(id)?;
    logger.info(&format!("Hero {} account: {}", id, address));
    let record = ctx
        .scanner
        .find_record(&ctx.program_id, &address, logger)
        .await?
        .ok_or_else(|| HeroError::validation(format!("hero {} does not exist", id)))?;
    let holder = ctx.scanner.find_nft_holder(&record.owner_nft_mint, logger).await?;
    logger.info(&format!(
        "Current owner {} via token account {}",
        holder.owner, holder.token_account
    ));

    // Composing
    let mint = Keypair::new();
    let mint_rent = ctx
        .rpc
        .minimum_balance_for_rent_exemption(spl_token::state::Mint::LEN)
        .await?;

    let mut plan = InstructionPlan::new(Vec::with_capacity(7)).with_signer(mint.pubkey());
    plan.push(system_instruction::create_account(
        &buyer,
        &mint.pubkey(),
        mint_rent,
        spl_token::state::Mint::LEN as u64,
        &spl_token::id(),
    ));
    plan.push(purchase_hero_instruction(
        &ctx.program_id,
        &address,
        &buyer,
        &holder.owner,
        &holder.token_account,
        &mint.pubkey(),
        PurchaseHeroArgs {
            id,
            new_name: new_name.clone(),
            new_uri: new_uri.clone(),
            new_price: request.new_price,
        },
    )?);

    let name = new_name.unwrap_or(record.name);
    let image = new_uri.unwrap_or(record.uri);
    let metadata = NftMetadata::for_hero(&name, &image, &buyer, &ctx.program_id);

    let cover_image = match &ctx.config.upload.meta_image {
        Some(path) => Some(tokio::fs::read(path).await.map_err(|e| {
            HeroError::validation(format!("cannot read meta image {}: {}", path.display(), e))
        })?),
        None => None,
    };
    let content = UploadContent::metadata(&metadata, cover_image)?;
    let metadata_uri =
        upload_with_retry(uploader, &content, &ctx.config.upload_policy(), logger).await?;
    logger.info(&format!("Uploaded metadata: {}", metadata_uri));

    let token_program = spl_token::id();
    plan.push(
        spl_token::instruction::initialize_mint(&token_program, &mint.pubkey(), &buyer, Some(&buyer), 0)
            .map_err(|e| HeroError::validation(format!("initialize_mint: {}", e)))?,
    );
    let buyer_token_account = token_wallet_address(&buyer, &mint.pubkey());
    plan.push(create_associated_token_account(
        &buyer,
        &buyer,
        &mint.pubkey(),
        &token_program,
    ));

    let metadata_account = metadata_address(&mint.pubkey());
    plan.push(create_metadata_instruction(
        &metadata_account,
        &mint.pubkey(),
        &buyer,
        &buyer,
        &buyer,
        &CreateMetadataArgs {
            data: MetadataData {
                name: metadata.name.clone(),
                symbol: metadata.symbol.clone(),
                uri: metadata_uri.clone(),
                seller_fee_basis_points: metadata.seller_fee_basis_points,
                creators: Some(vec![
                    Creator {
                        address: buyer,
                        verified: true,
                        share: 100,
                    },
                    Creator {
                        address: ctx.program_id,
                        verified: false,
                        share: 0,
                    },
                ]),
            },
            is_mutable: false,
        },
    )?);
    plan.push(
        spl_token::instruction::mint_to(
            &token_program,
            &mint.pubkey(),
            &buyer_token_account,
            &buyer,
            &[],
            1,
        )
        .map_err(|e| HeroError::validation(format!("mint_to: {}", e)))?,
    );
    plan.push(create_master_edition_instruction(
        &metadata_account,
        &master_edition_address(&mint.pubkey()),
        &mint.pubkey(),
        &buyer,
        &buyer,
        &buyer,
        &CreateMasterEditionArgs { max_supply: Some(0) },
    )?);
    sanity_check_mint_order(&plan)?;

    // Submitting
    let signature: Signature = ctx
        .submitter
        .submit_plan(&plan, wallet.keypair(), &[&mint], logger)
        .await?;

    // Confirming
    ctx.submitter.confirm_best_effort(&signature, logger).await;
    logger.info(&format!("Purchase NFT minted: {}", signature));

    Ok(PurchasedHero {
        metadata: metadata_account,
        mint: mint.pubkey(),
        signature: signature.to_string(),
        metadata_uri,
    })
}
