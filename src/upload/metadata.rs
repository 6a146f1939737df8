//! Off-chain NFT metadata document

use crate::errors::{HeroError, HeroResult};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFile {
    pub uri: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataCreator {
    pub address: String,
    pub share: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataProperties {
    pub files: Vec<MetadataFile>,
    pub category: String,
    pub creators: Vec<MetadataCreator>,
}

/// JSON document the on-chain metadata `uri` points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub seller_fee_basis_points: u16,
    pub image: String,
    #[serde(default)]
    pub attributes: Vec<serde_json::Value>,
    #[serde(default)]
    pub collection: serde_json::Map<String, serde_json::Value>,
    pub properties: Option<MetadataProperties>,
}

impl NftMetadata {
    /// Metadata for a purchased hero: the buyer holds all royalties, the
    /// program is listed as a zero-share creator.
    pub fn for_hero(name: &str, image: &str, buyer: &Pubkey, program: &Pubkey) -> Self {
        Self {
            name: name.to_string(),
            symbol: String::new(),
            description: String::new(),
            seller_fee_basis_points: 0,
            image: image.to_string(),
            attributes: Vec::new(),
            collection: serde_json::Map::new(),
            properties: Some(MetadataProperties {
                files: vec![MetadataFile {
                    uri: image.to_string(),
                    content_type: "image/png".to_string(),
                }],
                category: "image".to_string(),
                creators: vec![
                    MetadataCreator {
                        address: buyer.to_string(),
                        share: 100,
                    },
                    MetadataCreator {
                        address: program.to_string(),
                        share: 0,
                    },
                ],
            }),
        }
    }

    pub fn validate(&self) -> HeroResult<()> {
        if self.name.is_empty() {
            return Err(HeroError::validation("metadata has no name"));
        }
        if self.image.is_empty() {
            return Err(HeroError::validation("metadata has no image"));
        }
        let properties = self
            .properties
            .as_ref()
            .ok_or_else(|| HeroError::validation("metadata has no properties"))?;
        if !properties.creators.is_empty() {
            let total: u32 = properties.creators.iter().map(|c| u32::from(c.share)).sum();
            if total != 100 {
                return Err(HeroError::validation(format!(
                    "creator shares sum to {}, expected 100",
                    total
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_hero_shape() {
        let buyer = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let meta = NftMetadata::for_hero("Thor", "https://arweave.net/img", &buyer, &program);
        assert!(meta.validate().is_ok());

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["properties"]["files"][0]["type"], "image/png");
        assert_eq!(json["properties"]["creators"][0]["address"], buyer.to_string());
        assert_eq!(json["properties"]["creators"][1]["share"], 0);
        assert_eq!(json["collection"], serde_json::json!({}));
    }

    #[test]
    fn test_validation_failures() {
        let key = Pubkey::new_unique();
        let mut meta = NftMetadata::for_hero("", "img", &key, &key);
        assert!(meta.validate().is_err());

        meta.name = "Thor".to_string();
        meta.image.clear();
        assert!(meta.validate().is_err());

        meta.image = "img".to_string();
        meta.properties = None;
        assert!(meta.validate().is_err());
    }
}
