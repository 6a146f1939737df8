//! On-chain record and instruction layouts
//!
//! Hero program structures plus the Token Metadata program structures used by
//! the purchase flow, all registered in one schema table.
//!
//! Hero identifiers are u32 on the wire. The first program revision used a
//! single byte, which capped a deployment at 255 heroes.

use crate::codec::{self, CodecError, CodecResult, FieldType, Fields, Schema, SchemaType, Value};
use once_cell::sync::Lazy;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

pub const CREATE_HERO_DISCRIMINANT: u8 = 0;
pub const UPDATE_HERO_PRICE_DISCRIMINANT: u8 = 1;
pub const PURCHASE_HERO_DISCRIMINANT: u8 = 2;

pub const CREATE_METADATA_DISCRIMINANT: u8 = 0;
pub const CREATE_MASTER_EDITION_DISCRIMINANT: u8 = 10;

static HERO_SCHEMA: Lazy<Schema> = Lazy::new(build_hero_schema);

/// Shared schema table for every structure this crate puts on the wire
pub fn hero_schema() -> &'static Schema {
    &HERO_SCHEMA
}

fn build_hero_schema() -> Schema {
    Schema::builder()
        .register(
            HeroRecord::TYPE_NAME,
            vec![
                ("id", FieldType::U32),
                ("name", FieldType::String),
                ("uri", FieldType::String),
                ("last_price", FieldType::U64),
                ("listed_price", FieldType::U64),
                ("owner_nft_address", FieldType::FixedBytes(32)),
            ],
        )
        .register(
            CreateHeroArgs::TYPE_NAME,
            vec![
                ("instruction", FieldType::U8),
                ("data", FieldType::Struct(HeroRecord::TYPE_NAME)),
                ("id", FieldType::U32),
            ],
        )
        .register(
            UpdateHeroPriceArgs::TYPE_NAME,
            vec![
                ("instruction", FieldType::U8),
                ("id", FieldType::U32),
                ("price", FieldType::U64),
            ],
        )
        .register(
            PurchaseHeroArgs::TYPE_NAME,
            vec![
                ("instruction", FieldType::U8),
                ("id", FieldType::U32),
                ("new_name", FieldType::option(FieldType::String)),
                ("new_uri", FieldType::option(FieldType::String)),
                ("new_price", FieldType::option(FieldType::U64)),
            ],
        )
        .register(
            Creator::TYPE_NAME,
            vec![
                ("address", FieldType::Pubkey),
                ("verified", FieldType::U8),
                ("share", FieldType::U8),
            ],
        )
        .register(
            MetadataData::TYPE_NAME,
            vec![
                ("name", FieldType::String),
                ("symbol", FieldType::String),
                ("uri", FieldType::String),
                ("seller_fee_basis_points", FieldType::U16),
                (
                    "creators",
                    FieldType::option(FieldType::vec(FieldType::Struct(Creator::TYPE_NAME))),
                ),
            ],
        )
        .register(
            CreateMetadataArgs::TYPE_NAME,
            vec![
                ("instruction", FieldType::U8),
                ("data", FieldType::Struct(MetadataData::TYPE_NAME)),
                ("is_mutable", FieldType::U8),
            ],
        )
        .register(
            CreateMasterEditionArgs::TYPE_NAME,
            vec![
                ("instruction", FieldType::U8),
                ("max_supply", FieldType::option(FieldType::U64)),
            ],
        )
        .build()
}

/// Cut a program-padded string at its first NUL
fn trim_nul(mut s: String) -> String {
    if let Some(pos) = s.find('\0') {
        s.truncate(pos);
    }
    s
}

/// One minted hero as stored in its program account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeroRecord {
    pub id: u32,
    pub name: String,
    pub uri: String,
    /// Lamports paid in the most recent sale
    pub last_price: u64,
    /// Lamports asked by the current owner
    pub listed_price: u64,
    /// Mint of the NFT whose holder owns this hero
    #[serde(serialize_with = "serialize_pubkey")]
    pub owner_nft_mint: Pubkey,
}

pub(crate) fn serialize_pubkey<S: serde::Serializer>(key: &Pubkey, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&key.to_string())
}

impl HeroRecord {
    /// Decode account data; trailing allocation padding is ignored
    pub fn from_account_data(data: &[u8]) -> CodecResult<Self> {
        codec::decode_prefix(hero_schema(), data)
    }
}

impl SchemaType for HeroRecord {
    const TYPE_NAME: &'static str = "HeroRecord";

    fn to_value(&self) -> Value {
        Fields::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
            .with("uri", self.uri.as_str())
            .with("last_price", self.last_price)
            .with("listed_price", self.listed_price)
            .with("owner_nft_address", Value::Bytes(self.owner_nft_mint.to_bytes().to_vec()))
            .into()
    }

    fn from_value(value: Value) -> CodecResult<Self> {
        let mut f = value.into_fields(Self::TYPE_NAME)?;
        Ok(Self {
            id: f.take_u32("id")?,
            name: trim_nul(f.take_string("name")?),
            uri: trim_nul(f.take_string("uri")?),
            last_price: f.take_u64("last_price")?,
            listed_price: f.take_u64("listed_price")?,
            owner_nft_mint: f.take_pubkey("owner_nft_address")?,
        })
    }
}

/// Arguments of the create instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateHeroArgs {
    pub data: HeroRecord,
    pub id: u32,
}

impl SchemaType for CreateHeroArgs {
    const TYPE_NAME: &'static str = "CreateHeroArgs";

    fn to_value(&self) -> Value {
        Fields::new()
            .with("instruction", CREATE_HERO_DISCRIMINANT)
            .with("data", self.data.to_value())
            .with("id", self.id)
            .into()
    }

    fn from_value(value: Value) -> CodecResult<Self> {
        let mut f = value.into_fields(Self::TYPE_NAME)?;
        f.expect_discriminant("instruction", CREATE_HERO_DISCRIMINANT)?;
        Ok(Self {
            data: f.take_struct("data")?,
            id: f.take_u32("id")?,
        })
    }
}

/// Arguments of the update-price instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateHeroPriceArgs {
    pub id: u32,
    pub price: u64,
}

impl SchemaType for UpdateHeroPriceArgs {
    const TYPE_NAME: &'static str = "UpdateHeroPriceArgs";

    fn to_value(&self) -> Value {
        Fields::new()
            .with("instruction", UPDATE_HERO_PRICE_DISCRIMINANT)
            .with("id", self.id)
            .with("price", self.price)
            .into()
    }

    fn from_value(value: Value) -> CodecResult<Self> {
        let mut f = value.into_fields(Self::TYPE_NAME)?;
        f.expect_discriminant("instruction", UPDATE_HERO_PRICE_DISCRIMINANT)?;
        Ok(Self {
            id: f.take_u32("id")?,
            price: f.take_u64("price")?,
        })
    }
}

/// Arguments of the purchase instruction; absent fields keep the current value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseHeroArgs {
    pub id: u32,
    pub new_name: Option<String>,
    pub new_uri: Option<String>,
    pub new_price: Option<u64>,
}

impl SchemaType for PurchaseHeroArgs {
    const TYPE_NAME: &'static str = "PurchaseHeroArgs";

    fn to_value(&self) -> Value {
        Fields::new()
            .with("instruction", PURCHASE_HERO_DISCRIMINANT)
            .with("id", self.id)
            .with("new_name", Value::from_option(self.new_name.clone()))
            .with("new_uri", Value::from_option(self.new_uri.clone()))
            .with("new_price", Value::from_option(self.new_price))
            .into()
    }

    fn from_value(value: Value) -> CodecResult<Self> {
        let mut f = value.into_fields(Self::TYPE_NAME)?;
        f.expect_discriminant("instruction", PURCHASE_HERO_DISCRIMINANT)?;
        Ok(Self {
            id: f.take_u32("id")?,
            new_name: f.take_option("new_name", Value::into_string)?,
            new_uri: f.take_option("new_uri", Value::into_string)?,
            new_price: f.take_option("new_price", Value::into_u64)?,
        })
    }
}

/// Any hero program instruction payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeroInstruction {
    Create(CreateHeroArgs),
    UpdatePrice(UpdateHeroPriceArgs),
    Purchase(PurchaseHeroArgs),
}

impl HeroInstruction {
    pub fn discriminant(&self) -> u8 {
        match self {
            Self::Create(_) => CREATE_HERO_DISCRIMINANT,
            Self::UpdatePrice(_) => UPDATE_HERO_PRICE_DISCRIMINANT,
            Self::Purchase(_) => PURCHASE_HERO_DISCRIMINANT,
        }
    }

    pub fn hero_id(&self) -> u32 {
        match self {
            Self::Create(a) => a.id,
            Self::UpdatePrice(a) => a.id,
            Self::Purchase(a) => a.id,
        }
    }

    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        let schema = hero_schema();
        match self {
            Self::Create(a) => codec::encode(schema, a),
            Self::UpdatePrice(a) => codec::encode(schema, a),
            Self::Purchase(a) => codec::encode(schema, a),
        }
    }

    /// Decode an instruction payload, dispatching on its leading byte
    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        let schema = hero_schema();
        match bytes.first() {
            Some(&CREATE_HERO_DISCRIMINANT) => codec::decode(schema, bytes).map(Self::Create),
            Some(&UPDATE_HERO_PRICE_DISCRIMINANT) => {
                codec::decode(schema, bytes).map(Self::UpdatePrice)
            }
            Some(&PURCHASE_HERO_DISCRIMINANT) => codec::decode(schema, bytes).map(Self::Purchase),
            Some(&other) => Err(CodecError::UnexpectedDiscriminant {
                expected: CREATE_HERO_DISCRIMINANT,
                found: other,
            }),
            None => Err(CodecError::UnexpectedEof {
                needed: 1,
                remaining: 0,
            }),
        }
    }
}

/// Token Metadata creator entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub address: Pubkey,
    pub verified: bool,
    /// Percentage of royalties, all creators sum to 100
    pub share: u8,
}

impl SchemaType for Creator {
    const TYPE_NAME: &'static str = "Creator";

    fn to_value(&self) -> Value {
        Fields::new()
            .with("address", self.address)
            .with("verified", u8::from(self.verified))
            .with("share", self.share)
            .into()
    }

    fn from_value(value: Value) -> CodecResult<Self> {
        let mut f = value.into_fields(Self::TYPE_NAME)?;
        Ok(Self {
            address: f.take_pubkey("address")?,
            verified: f.take_u8("verified")? != 0,
            share: f.take_u8("share")?,
        })
    }
}

/// Token Metadata `Data` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataData {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub creators: Option<Vec<Creator>>,
}

impl SchemaType for MetadataData {
    const TYPE_NAME: &'static str = "MetadataData";

    fn to_value(&self) -> Value {
        let creators = self
            .creators
            .as_ref()
            .map(|list| Value::Vec(list.iter().map(Creator::to_value).collect()));
        Fields::new()
            .with("name", self.name.as_str())
            .with("symbol", self.symbol.as_str())
            .with("uri", self.uri.as_str())
            .with("seller_fee_basis_points", self.seller_fee_basis_points)
            .with("creators", Value::Option(creators.map(Box::new)))
            .into()
    }

    fn from_value(value: Value) -> CodecResult<Self> {
        let mut f = value.into_fields(Self::TYPE_NAME)?;
        Ok(Self {
            name: f.take_string("name")?,
            symbol: f.take_string("symbol")?,
            uri: f.take_string("uri")?,
            seller_fee_basis_points: f.take_u16("seller_fee_basis_points")?,
            creators: f.take_option("creators", |v, name| {
                v.into_vec(name)?
                    .into_iter()
                    .map(|c| c.into_struct::<Creator>(name))
                    .collect()
            })?,
        })
    }
}

/// Token Metadata create-metadata instruction payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMetadataArgs {
    pub data: MetadataData,
    pub is_mutable: bool,
}

impl SchemaType for CreateMetadataArgs {
    const TYPE_NAME: &'static str = "CreateMetadataArgs";

    fn to_value(&self) -> Value {
        Fields::new()
            .with("instruction", CREATE_METADATA_DISCRIMINANT)
            .with("data", self.data.to_value())
            .with("is_mutable", u8::from(self.is_mutable))
            .into()
    }

    fn from_value(value: Value) -> CodecResult<Self> {
        let mut f = value.into_fields(Self::TYPE_NAME)?;
        f.expect_discriminant("instruction", CREATE_METADATA_DISCRIMINANT)?;
        Ok(Self {
            data: f.take_struct("data")?,
            is_mutable: f.take_u8("is_mutable")? != 0,
        })
    }
}

/// Token Metadata create-master-edition instruction payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMasterEditionArgs {
    /// `Some(0)` makes the edition unique
    pub max_supply: Option<u64>,
}

impl SchemaType for CreateMasterEditionArgs {
    const TYPE_NAME: &'static str = "CreateMasterEditionArgs";

    fn to_value(&self) -> Value {
        Fields::new()
            .with("instruction", CREATE_MASTER_EDITION_DISCRIMINANT)
            .with("max_supply", Value::from_option(self.max_supply))
            .into()
    }

    fn from_value(value: Value) -> CodecResult<Self> {
        let mut f = value.into_fields(Self::TYPE_NAME)?;
        f.expect_discriminant("instruction", CREATE_MASTER_EDITION_DISCRIMINANT)?;
        Ok(Self {
            max_supply: f.take_option("max_supply", Value::into_u64)?,
        })
    }
}
