//! Arweave uploads through the bundling cloud function
//!
//! The function accepts a multipart form carrying a payment transaction
//! signature, the cluster name and the files. The storage fee is paid with
//! a system transfer before the first attempt for a given content id and
//! reused on every retry of that content.

use super::{UploadContent, UploadError, UploadKind, Uploader, MANIFEST_FILE, MANIFEST_LINK_FILE};
use crate::errors::HeroError;
use crate::rpc::HeroRpc;
use crate::structured_logging::OperationLogger;
use crate::tx_builder::TransactionSubmitter;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use solana_sdk::{
    pubkey,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const ARWEAVE_PAYMENT_WALLET: Pubkey = pubkey!("6FKvsq4ydWFci6nGq9ckbjYMtnmaqAoatz5c9XWjiDuS");
pub const DEFAULT_ARWEAVE_ENDPOINT: &str =
    "https://us-central1-principal-lane-200702.cloudfunctions.net/uploadFile4";
/// Lamports paid per uploaded file
pub const STORAGE_COST_LAMPORTS: u64 = 2_300_000;

const ARWEAVE_GATEWAY: &str = "https://arweave.net";
const COVER_IMAGE_FILE: &str = "meta_image.png";

#[derive(Debug, Deserialize)]
struct BundleResponse {
    #[serde(default)]
    messages: Vec<BundleMessage>,
}

#[derive(Debug, Deserialize)]
struct BundleMessage {
    filename: String,
    #[serde(rename = "transactionId")]
    transaction_id: Option<String>,
}

pub struct ArweaveUploader {
    http: reqwest::Client,
    endpoint: String,
    env: String,
    storage_cost: u64,
    payer: Arc<Keypair>,
    submitter: Arc<TransactionSubmitter<dyn HeroRpc>>,
    /// Payment signature per content id
    payments: Mutex<HashMap<String, Signature>>,
}

impl ArweaveUploader {
    pub fn new(
        endpoint: &str,
        env: &str,
        storage_cost: u64,
        payer: Arc<Keypair>,
        submitter: Arc<TransactionSubmitter<dyn HeroRpc>>,
        timeout: Duration,
    ) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            env: env.to_string(),
            storage_cost,
            payer,
            submitter,
            payments: Mutex::new(HashMap::new()),
        })
    }

    /// Payment already made for this content, if any
    pub fn payment_for(&self, content_id: &str) -> Option<Signature> {
        self.payments.lock().get(content_id).copied()
    }

    async fn pay_once(&self, content_id: &str, logger: &OperationLogger) -> Result<Signature, UploadError> {
        if let Some(signature) = self.payment_for(content_id) {
            logger.debug(&format!("Reusing storage payment {}", signature));
            return Ok(signature);
        }

        let transfer = system_instruction::transfer(
            &self.payer.pubkey(),
            &ARWEAVE_PAYMENT_WALLET,
            self.storage_cost,
        );
        let signature = self
            .submitter
            .submit(&[transfer], &self.payer, &[], logger)
            .await
            .map_err(|e| UploadError::Payment {
                retryable: !matches!(e, HeroError::Rejected { .. }) && e.is_retryable(),
                message: e.to_string(),
            })?;

        logger.info(&format!("Storage payment sent: {}", signature));
        self.payments.lock().insert(content_id.to_string(), signature);
        Ok(signature)
    }

    fn build_form(&self, content: &UploadContent, payment: &Signature) -> Result<Form, UploadError> {
        let part = |bytes: Vec<u8>, name: &str, mime: &str| {
            Part::bytes(bytes)
                .file_name(name.to_string())
                .mime_str(mime)
                .map_err(|e| UploadError::InvalidRequest(e.to_string()))
        };

        let mut form = Form::new()
            .text("transaction", payment.to_string())
            .text("env", self.env.clone());

        match content.kind {
            UploadKind::Image => {
                form = form
                    .part("file[]", part(content.bytes.clone(), &content.file_name, &content.content_type)?)
                    .part("file[]", part(b"{}".to_vec(), MANIFEST_FILE, "application/json")?);
            }
            UploadKind::Metadata => {
                if let Some(cover) = &content.cover_image {
                    form = form.part("file[]", part(cover.clone(), COVER_IMAGE_FILE, "image/png")?);
                }
                form = form.part(
                    "file[]",
                    part(content.bytes.clone(), MANIFEST_FILE, "application/json")?,
                );
            }
        }
        Ok(form)
    }
}

#[async_trait]
impl Uploader for ArweaveUploader {
    fn name(&self) -> &'static str {
        "arweave"
    }

    async fn upload(&self, content: &UploadContent, logger: &OperationLogger) -> Result<String, UploadError> {
        let payment = self.pay_once(&content.content_id(), logger).await?;
        let form = self.build_form(content, &payment)?;

        let response = self.http.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bundle: BundleResponse = response.json().await?;
        let link_file = match content.kind {
            UploadKind::Image => content.file_name.as_str(),
            UploadKind::Metadata => MANIFEST_LINK_FILE,
        };
        let transaction_id = bundle
            .messages
            .into_iter()
            .find(|m| m.filename == link_file)
            .and_then(|m| m.transaction_id)
            .ok_or_else(|| UploadError::MissingLink(link_file.to_string()))?;

        Ok(format!("{}/{}", ARWEAVE_GATEWAY, transaction_id))
    }
}
