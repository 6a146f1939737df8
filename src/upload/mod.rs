//! Off-chain storage for images and NFT metadata
//!
//! Two backends are supported: Arweave (paid per upload through a system
//! transfer) and IPFS (content addressed). Every upload runs under the
//! bounded retry of [`upload_with_retry`].

pub mod arweave;
pub mod ipfs;
pub mod metadata;

pub use arweave::ArweaveUploader;
pub use ipfs::{IpfsCredentials, IpfsUploader};
pub use metadata::{MetadataCreator, MetadataFile, MetadataProperties, NftMetadata};

use crate::errors::{HeroError, HeroResult};
use crate::retry::{retry_with_backoff, RetryPolicy, Transient};
use crate::structured_logging::OperationLogger;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// File name the Arweave bundler reports for an uploaded manifest
pub const MANIFEST_LINK_FILE: &str = "manifest.json";
/// File name the manifest is posted under
pub const MANIFEST_FILE: &str = "metadata.json";

/// Failure of one upload attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Storage payment failed: {message}")]
    Payment { message: String, retryable: bool },

    #[error("Response carried no link for {0}")]
    MissingLink(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl UploadError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::MissingLink(_) => true,
            Self::Http { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Payment { retryable, .. } => *retryable,
            Self::MalformedResponse(_) | Self::Credentials(_) | Self::InvalidRequest(_) => false,
        }
    }
}

impl Transient for UploadError {
    fn is_transient(&self) -> bool {
        self.is_retryable()
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// What is being stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Metadata,
}

/// One payload headed for storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadContent {
    pub kind: UploadKind,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// Image bundled next to a metadata manifest on Arweave
    pub cover_image: Option<Vec<u8>>,
}

impl UploadContent {
    /// Image content; only `.png` and `.jpg` are accepted
    pub fn image(path: &Path, bytes: Vec<u8>) -> HeroResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let content_type = match ext.as_deref() {
            Some("png") => "image/png",
            Some("jpg") => "image/jpeg",
            _ => {
                return Err(HeroError::validation(format!(
                    "{} is not a .png or .jpg file",
                    path.display()
                )))
            }
        };
        let ext = ext.unwrap_or_default();
        Ok(Self {
            kind: UploadKind::Image,
            file_name: format!("image.{}", ext),
            content_type: content_type.to_string(),
            bytes,
            cover_image: None,
        })
    }

    /// Metadata manifest content
    pub fn metadata(metadata: &NftMetadata, cover_image: Option<Vec<u8>>) -> HeroResult<Self> {
        metadata.validate()?;
        let bytes = serde_json::to_vec(metadata)
            .map_err(|e| HeroError::validation(format!("metadata does not serialize: {}", e)))?;
        Ok(Self {
            kind: UploadKind::Metadata,
            file_name: MANIFEST_FILE.to_string(),
            content_type: "application/json".to_string(),
            bytes,
            cover_image,
        })
    }

    /// SHA-256 of the payload, hex encoded
    pub fn content_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        if let Some(cover) = &self.cover_image {
            hasher.update(cover);
        }
        hex::encode(hasher.finalize())
    }
}

/// Storage backend contract
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Backend label for logs
    fn name(&self) -> &'static str;

    /// Store `content` once and return its public link
    async fn upload(&self, content: &UploadContent, logger: &OperationLogger) -> Result<String, UploadError>;
}

/// Storage backend chosen on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Arweave,
    Ipfs,
}

impl FromStr for StorageKind {
    type Err = HeroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arweave" => Ok(Self::Arweave),
            "ipfs" => Ok(Self::Ipfs),
            "aws" => Err(HeroError::validation(
                "aws storage is not supported; use arweave or ipfs",
            )),
            other => Err(HeroError::validation(format!(
                "unknown storage '{}'; use arweave or ipfs",
                other
            ))),
        }
    }
}

/// Upload with bounded exponential backoff
pub async fn upload_with_retry(
    uploader: &dyn Uploader,
    content: &UploadContent,
    policy: &RetryPolicy,
    logger: &OperationLogger,
) -> HeroResult<String> {
    let logger = logger.child(uploader.name());
    let content_id = content.content_id();
    logger.debug(&format!(
        "Uploading {} ({} bytes, content id {})",
        content.file_name,
        content.bytes.len(),
        content_id
    ));

    match retry_with_backoff(&logger, policy, |_| uploader.upload(content, &logger)).await {
        Ok((link, _)) => {
            logger.log_uploaded(&content_id, &link);
            Ok(link)
        }
        Err(failure) => Err(HeroError::Upload {
            attempts: failure.attempts,
            last_error: failure.error.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockUploader;

    #[test]
    fn test_image_extension_check() {
        assert!(UploadContent::image(Path::new("a/hero.png"), vec![1]).is_ok());
        let jpg = UploadContent::image(Path::new("hero.JPG"), vec![1]).unwrap();
        assert_eq!(jpg.content_type, "image/jpeg");
        assert_eq!(jpg.file_name, "image.jpg");
        assert!(matches!(
            UploadContent::image(Path::new("hero.gif"), vec![1]),
            Err(HeroError::Validation(_))
        ));
        assert!(UploadContent::image(Path::new("hero"), vec![1]).is_err());
    }

    #[test]
    fn test_content_id_is_sha256() {
        let content = UploadContent::image(Path::new("x.png"), b"abc".to_vec()).unwrap();
        assert_eq!(
            content.content_id(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_storage_kind_parsing() {
        assert_eq!("arweave".parse::<StorageKind>().unwrap(), StorageKind::Arweave);
        assert_eq!("ipfs".parse::<StorageKind>().unwrap(), StorageKind::Ipfs);
        assert!(matches!("aws".parse::<StorageKind>(), Err(HeroError::Validation(_))));
        assert!("s3".parse::<StorageKind>().is_err());
    }

    #[test]
    fn test_upload_error_classification() {
        assert!(UploadError::Transport("reset".into()).is_retryable());
        assert!(UploadError::Http { status: 503, body: String::new() }.is_retryable());
        assert!(UploadError::Http { status: 429, body: String::new() }.is_retryable());
        assert!(!UploadError::Http { status: 401, body: String::new() }.is_retryable());
        assert!(!UploadError::Credentials("bad".into()).is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let uploader = MockUploader::new("https://arweave.net/abc");
        uploader.fail_next(vec![UploadError::Transport("reset".into()); 2]);
        let content = UploadContent::image(Path::new("x.png"), vec![1, 2]).unwrap();

        let link = upload_with_retry(&uploader, &content, &RetryPolicy::upload(), &OperationLogger::new("test"))
            .await
            .unwrap();

        assert_eq!(link, "https://arweave.net/abc");
        assert_eq!(uploader.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_upload_error() {
        let uploader = MockUploader::new("unused");
        uploader.fail_next(vec![UploadError::Transport("reset".into()); 10]);
        let content = UploadContent::image(Path::new("x.png"), vec![1, 2]).unwrap();

        let err = upload_with_retry(&uploader, &content, &RetryPolicy::immediate(4), &OperationLogger::new("test"))
            .await
            .unwrap_err();

        assert!(matches!(err, HeroError::Upload { attempts: 4, .. }));
        assert_eq!(uploader.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let uploader = MockUploader::new("unused");
        uploader.fail_next(vec![UploadError::Credentials("401".into())]);
        let content = UploadContent::image(Path::new("x.png"), vec![1]).unwrap();

        let err = upload_with_retry(&uploader, &content, &RetryPolicy::upload(), &OperationLogger::new("test"))
            .await
            .unwrap_err();

        assert!(matches!(err, HeroError::Upload { attempts: 1, .. }));
    }
}
