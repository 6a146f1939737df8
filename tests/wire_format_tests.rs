//! Hero program wire format checked against borsh derive output

use borsh::BorshSerialize;
use hero_nft::codec;
use hero_nft::state::{
    hero_schema, CreateHeroArgs, HeroInstruction, HeroRecord, PurchaseHeroArgs,
    UpdateHeroPriceArgs,
};
use hero_nft::Pubkey;
use proptest::prelude::*;

#[derive(BorshSerialize)]
struct BorshHero {
    id: u32,
    name: String,
    uri: String,
    last_price: u64,
    listed_price: u64,
    owner_nft_address: [u8; 32],
}

#[derive(BorshSerialize)]
struct BorshCreate {
    instruction: u8,
    data: BorshHero,
    id: u32,
}

#[derive(BorshSerialize)]
struct BorshUpdatePrice {
    instruction: u8,
    id: u32,
    price: u64,
}

#[derive(BorshSerialize)]
struct BorshPurchase {
    instruction: u8,
    id: u32,
    new_name: Option<String>,
    new_uri: Option<String>,
    new_price: Option<u64>,
}

fn borsh_hero(record: &HeroRecord) -> BorshHero {
    BorshHero {
        id: record.id,
        name: record.name.clone(),
        uri: record.uri.clone(),
        last_price: record.last_price,
        listed_price: record.listed_price,
        owner_nft_address: record.owner_nft_mint.to_bytes(),
    }
}

fn record_strategy() -> impl Strategy<Value = HeroRecord> {
    (
        any::<u32>(),
        "[a-zA-Z0-9 ]{1,32}",
        "https://[a-z]{1,20}\\.net/[a-zA-Z0-9]{0,43}",
        any::<u64>(),
        any::<u64>(),
        any::<[u8; 32]>(),
    )
        .prop_map(|(id, name, uri, last_price, listed_price, mint)| HeroRecord {
            id,
            name,
            uri,
            last_price,
            listed_price,
            owner_nft_mint: Pubkey::new_from_array(mint),
        })
}

proptest! {
    #[test]
    fn record_layout_matches_borsh(record in record_strategy()) {
        let ours = codec::encode(hero_schema(), &record).unwrap();
        let theirs = borsh::to_vec(&borsh_hero(&record)).unwrap();
        prop_assert_eq!(&ours, &theirs);
        prop_assert_eq!(HeroRecord::from_account_data(&ours).unwrap(), record);
    }

    #[test]
    fn create_instruction_matches_borsh(record in record_strategy()) {
        let id = record.id;
        let ours = HeroInstruction::Create(CreateHeroArgs { data: record.clone(), id })
            .to_bytes()
            .unwrap();
        let theirs = borsh::to_vec(&BorshCreate {
            instruction: 0,
            data: borsh_hero(&record),
            id,
        })
        .unwrap();
        prop_assert_eq!(ours, theirs);
    }

    #[test]
    fn purchase_instruction_matches_borsh(
        id in any::<u32>(),
        new_name in proptest::option::of("[a-zA-Z ]{1,16}"),
        new_uri in proptest::option::of("ipfs://[a-z0-9]{1,46}"),
        new_price in proptest::option::of(any::<u64>()),
    ) {
        let args = PurchaseHeroArgs {
            id,
            new_name: new_name.clone(),
            new_uri: new_uri.clone(),
            new_price,
        };
        let ours = HeroInstruction::Purchase(args.clone()).to_bytes().unwrap();
        let theirs = borsh::to_vec(&BorshPurchase {
            instruction: 2,
            id,
            new_name,
            new_uri,
            new_price,
        })
        .unwrap();
        prop_assert_eq!(&ours, &theirs);
        prop_assert_eq!(HeroInstruction::from_bytes(&ours).unwrap(), HeroInstruction::Purchase(args));
    }
}

#[test]
fn update_price_instruction_matches_borsh() {
    let ours = HeroInstruction::UpdatePrice(UpdateHeroPriceArgs {
        id: 300,
        price: 1_500_000_000,
    })
    .to_bytes()
    .unwrap();
    let theirs = borsh::to_vec(&BorshUpdatePrice {
        instruction: 1,
        id: 300,
        price: 1_500_000_000,
    })
    .unwrap();
    assert_eq!(ours, theirs);
}

#[test]
fn ids_above_255_survive() {
    let record = HeroRecord {
        id: 70_000,
        name: "Loki".to_string(),
        uri: "ipfs://loki".to_string(),
        last_price: 0,
        listed_price: 1,
        owner_nft_mint: Pubkey::new_unique(),
    };
    let bytes = codec::encode(hero_schema(), &record).unwrap();
    assert_eq!(&bytes[..4], &70_000u32.to_le_bytes());
    assert_eq!(HeroRecord::from_account_data(&bytes).unwrap().id, 70_000);
}

#[test]
fn strict_decode_rejects_padding_that_prefix_decode_accepts() {
    let record = HeroRecord {
        id: 1,
        name: "Freya".to_string(),
        uri: "ipfs://freya".to_string(),
        last_price: 0,
        listed_price: 1,
        owner_nft_mint: Pubkey::new_unique(),
    };
    let mut bytes = codec::encode(hero_schema(), &record).unwrap();
    bytes.extend_from_slice(&[0u8; 16]);

    assert!(matches!(
        codec::decode::<HeroRecord>(hero_schema(), &bytes),
        Err(codec::CodecError::TrailingBytes(16))
    ));
    assert_eq!(codec::decode_prefix::<HeroRecord>(hero_schema(), &bytes).unwrap(), record);
}
