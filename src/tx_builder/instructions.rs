//! Instruction construction and plan ordering checks
//!
//! The `*_with_data` builders lay out account metas around an already
//! encoded payload and never look inside it. The typed builders encode their
//! args with the hero schema and delegate to them. Semantic validation (ids,
//! prices, ownership) happens in the flows before any of these are called.
//!
//! Account order is positional and must match what the programs read:
//! - create: hero (w), payer (s, w), system program, rent sysvar
//! - update price: hero (w), payer (s), owner token account
//! - purchase: hero (w), payer (s, w), previous owner (w), owner token
//!   account, new mint, system program

use crate::errors::{HeroError, HeroResult};
use crate::pda::TOKEN_METADATA_PROGRAM_ID;
use crate::state::{
    hero_schema, CreateHeroArgs, CreateMasterEditionArgs, CreateMetadataArgs, HeroInstruction,
    PurchaseHeroArgs, UpdateHeroPriceArgs,
};
use crate::codec;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};

/// Ordered instructions plus the keys that must sign them
#[derive(Debug, Clone, Default)]
pub struct InstructionPlan {
    pub instructions: Vec<Instruction>,

    /// Signers beyond the fee payer (e.g. a freshly generated mint)
    pub extra_signers: Vec<Pubkey>,
}

impl InstructionPlan {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            extra_signers: Vec::new(),
        }
    }

    pub fn push(&mut self, ix: Instruction) {
        self.instructions.push(ix);
    }

    pub fn with_signer(mut self, signer: Pubkey) -> Self {
        if !self.extra_signers.contains(&signer) {
            self.extra_signers.push(signer);
        }
        self
    }

    /// Every key marked as signer in any instruction, in first-seen order
    pub fn required_signers(&self) -> Vec<Pubkey> {
        let mut keys = Vec::new();
        for meta in self.instructions.iter().flat_map(|ix| ix.accounts.iter()) {
            if meta.is_signer && !keys.contains(&meta.pubkey) {
                keys.push(meta.pubkey);
            }
        }
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }
}

/// Hero program create instruction over an encoded payload
pub fn create_hero_instruction_with_data(program: &Pubkey, hero: &Pubkey, payer: &Pubkey, data: Vec<u8>) -> Instruction {
    Instruction {
        program_id: *program,
        accounts: vec![
            AccountMeta::new(*hero, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
        data,
    }
}

pub fn create_hero_instruction(
    program: &Pubkey,
    hero: &Pubkey,
    payer: &Pubkey,
    args: CreateHeroArgs,
) -> HeroResult<Instruction> {
    let data = HeroInstruction::Create(args).to_bytes()?;
    Ok(create_hero_instruction_with_data(program, hero, payer, data))
}

/// Hero program update-price instruction over an encoded payload
pub fn update_hero_price_instruction_with_data(
    program: &Pubkey,
    hero: &Pubkey,
    payer: &Pubkey,
    owner_token_account: &Pubkey,
    data: Vec<u8>,
) -> Instruction {
    Instruction {
        program_id: *program,
        accounts: vec![
            AccountMeta::new(*hero, false),
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new_readonly(*owner_token_account, false),
        ],
        data,
    }
}

pub fn update_hero_price_instruction(
    program: &Pubkey,
    hero: &Pubkey,
    payer: &Pubkey,
    owner_token_account: &Pubkey,
    args: UpdateHeroPriceArgs,
) -> HeroResult<Instruction> {
    let data = HeroInstruction::UpdatePrice(args).to_bytes()?;
    Ok(update_hero_price_instruction_with_data(
        program,
        hero,
        payer,
        owner_token_account,
        data,
    ))
}

/// Hero program purchase instruction over an encoded payload
pub fn purchase_hero_instruction_with_data(
    program: &Pubkey,
    hero: &Pubkey,
    payer: &Pubkey,
    previous_owner: &Pubkey,
    owner_token_account: &Pubkey,
    new_mint: &Pubkey,
    data: Vec<u8>,
) -> Instruction {
    Instruction {
        program_id: *program,
        accounts: vec![
            AccountMeta::new(*hero, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new(*previous_owner, false),
            AccountMeta::new_readonly(*owner_token_account, false),
            AccountMeta::new_readonly(*new_mint, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    }
}

pub fn purchase_hero_instruction(
    program: &Pubkey,
    hero: &Pubkey,
    payer: &Pubkey,
    previous_owner: &Pubkey,
    owner_token_account: &Pubkey,
    new_mint: &Pubkey,
    args: PurchaseHeroArgs,
) -> HeroResult<Instruction> {
    let data = HeroInstruction::Purchase(args).to_bytes()?;
    Ok(purchase_hero_instruction_with_data(
        program,
        hero,
        payer,
        previous_owner,
        owner_token_account,
        new_mint,
        data,
    ))
}

/// Token Metadata create-metadata instruction
pub fn create_metadata_instruction(
    metadata: &Pubkey,
    mint: &Pubkey,
    mint_authority: &Pubkey,
    payer: &Pubkey,
    update_authority: &Pubkey,
    args: &CreateMetadataArgs,
) -> HeroResult<Instruction> {
    Ok(Instruction {
        program_id: TOKEN_METADATA_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*metadata, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(*mint_authority, true),
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new_readonly(*update_authority, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
        data: codec::encode(hero_schema(), args)?,
    })
}

/// Token Metadata create-master-edition instruction
pub fn create_master_edition_instruction(
    metadata: &Pubkey,
    edition: &Pubkey,
    mint: &Pubkey,
    update_authority: &Pubkey,
    mint_authority: &Pubkey,
    payer: &Pubkey,
    args: &CreateMasterEditionArgs,
) -> HeroResult<Instruction> {
    Ok(Instruction {
        program_id: TOKEN_METADATA_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*edition, false),
            AccountMeta::new(*mint, false),
            AccountMeta::new_readonly(*update_authority, true),
            AccountMeta::new_readonly(*mint_authority, true),
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new_readonly(*metadata, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
        data: codec::encode(hero_schema(), args)?,
    })
}

/// Check the NFT minting steps of a purchase plan appear in dependency order
///
/// The mint must be initialized before its ATA, metadata before minting,
/// and the master edition last. Only compiled with debug assertions.
#[cfg(debug_assertions)]
pub fn sanity_check_mint_order(plan: &InstructionPlan) -> HeroResult<()> {
    if plan.is_empty() {
        return Err(HeroError::validation("Instruction plan is empty"));
    }

    let position = |pred: &dyn Fn(&Instruction) -> bool| plan.instructions.iter().position(pred);

    let init_mint = position(&|ix| ix.program_id == spl_token::id() && ix.data.first() == Some(&0));
    let create_ata = position(&|ix| ix.program_id == spl_associated_token_account::id());
    let metadata = position(&|ix| {
        ix.program_id == TOKEN_METADATA_PROGRAM_ID
            && ix.data.first() == Some(&crate::state::CREATE_METADATA_DISCRIMINANT)
    });
    let mint_to = position(&|ix| ix.program_id == spl_token::id() && ix.data.first() == Some(&7));
    let edition = position(&|ix| {
        ix.program_id == TOKEN_METADATA_PROGRAM_ID
            && ix.data.first() == Some(&crate::state::CREATE_MASTER_EDITION_DISCRIMINANT)
    });

    let steps = [
        ("initialize_mint", init_mint),
        ("create_associated_token_account", create_ata),
        ("create_metadata", metadata),
        ("mint_to", mint_to),
        ("create_master_edition", edition),
    ];

    let mut last: Option<(&str, usize)> = None;
    for (name, idx) in steps {
        let idx = idx.ok_or_else(|| HeroError::validation(format!("Plan is missing {}", name)))?;
        if let Some((prev, prev_idx)) = last {
            if idx < prev_idx {
                return Err(HeroError::validation(format!(
                    "{} (position {}) must come after {} (position {})",
                    name, idx, prev, prev_idx
                )));
            }
        }
        last = Some((name, idx));
    }
    Ok(())
}

#[cfg(not(debug_assertions))]
#[inline]
pub fn sanity_check_mint_order(_plan: &InstructionPlan) -> HeroResult<()> {
    Ok(())
}
