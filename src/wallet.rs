//! Wallet management module

use crate::errors::{HeroError, HeroResult};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const KEYPAIR_LEN: usize = 64;

/// Wallet holding the fee payer and signing keypair
#[derive(Clone)]
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

impl WalletManager {
    /// Create a new wallet manager from a keypair file
    ///
    /// Accepts the Solana CLI JSON array format, 64 raw bytes, or a
    /// base58 secret key string as exported by browser wallets.
    pub fn from_file(path: &str) -> HeroResult<Self> {
        let path = expand_home(path);
        let keypair_bytes = std::fs::read(&path).map_err(|e| {
            HeroError::validation(format!("Failed to read keypair file {}: {}", path.display(), e))
        })?;

        let raw = if keypair_bytes.len() == KEYPAIR_LEN {
            keypair_bytes
        } else if keypair_bytes.trim_ascii_start().starts_with(b"[") {
            serde_json::from_slice::<Vec<u8>>(&keypair_bytes)
                .map_err(|e| HeroError::validation(format!("Failed to parse keypair JSON: {}", e)))?
        } else {
            let text = std::str::from_utf8(&keypair_bytes)
                .map_err(|_| HeroError::validation("Keypair file is neither JSON nor base58"))?;
            bs58::decode(text.trim())
                .into_vec()
                .map_err(|e| HeroError::validation(format!("Failed to decode base58 keypair: {}", e)))?
        };

        Ok(Self::from_keypair(keypair_from_bytes(&raw)?))
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Shared handle for components that sign on their own (storage payments)
    pub fn keypair_arc(&self) -> Arc<Keypair> {
        Arc::clone(&self.keypair)
    }
}

fn keypair_from_bytes(raw: &[u8]) -> HeroResult<Keypair> {
    if raw.len() != KEYPAIR_LEN {
        return Err(HeroError::validation(format!(
            "Invalid keypair length: expected {} bytes, got {}",
            KEYPAIR_LEN,
            raw.len()
        )));
    }
    if raw.iter().all(|&b| b == 0) {
        return Err(HeroError::validation("Invalid keypair: all-zero key rejected"));
    }
    Keypair::try_from(raw).map_err(|e| HeroError::validation(format!("Invalid keypair bytes: {}", e)))
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => Path::new(&home).join(rest),
        _ if path == "~" => std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_json_keypair() {
        let keypair = Keypair::new();
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let wallet = WalletManager::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_raw_keypair() {
        let keypair = Keypair::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&keypair.to_bytes()).unwrap();

        let wallet = WalletManager::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_base58_keypair() {
        let keypair = Keypair::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", bs58::encode(keypair.to_bytes()).into_string()).unwrap();

        let wallet = WalletManager::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_rejects_zero_and_short_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 64]).unwrap();
        assert!(WalletManager::from_file(file.path().to_str().unwrap()).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[1,2,3]").unwrap();
        assert!(matches!(
            WalletManager::from_file(file.path().to_str().unwrap()),
            Err(HeroError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(WalletManager::from_file("/nonexistent/id.json").is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/id.json"), PathBuf::from("/abs/id.json"));
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(expand_home("~/id.json"), Path::new(&home).join("id.json"));
        }
    }
}
