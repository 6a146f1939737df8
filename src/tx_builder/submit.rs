//! Transaction submission with bounded retry
//!
//! Each attempt sends a signed transaction, then polls its signature until it
//! reaches the configured commitment or the ack timeout passes. The same
//! signed transaction is resent while its blockhash is valid; a fresh one is
//! signed only after expiry. Transient failures back off and retry;
//! rejections surface unless an earlier attempt is found landed.

use super::instructions::InstructionPlan;
use crate::errors::{HeroError, HeroResult};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::rpc::{HeroRpc, RpcError, SignatureState};
use crate::structured_logging::OperationLogger;
use parking_lot::Mutex;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Timing knobs for acknowledgement polling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfirmSettings {
    pub commitment: CommitmentConfig,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for ConfirmSettings {
    fn default() -> Self {
        Self {
            commitment: CommitmentConfig::confirmed(),
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Sends instruction batches as signed transactions
pub struct TransactionSubmitter<R: HeroRpc + ?Sized> {
    rpc: Arc<R>,
    policy: RetryPolicy,
    confirm: ConfirmSettings,
}

impl<R: HeroRpc + ?Sized> TransactionSubmitter<R> {
    pub fn new(rpc: Arc<R>, policy: RetryPolicy, confirm: ConfirmSettings) -> Self {
        Self {
            rpc,
            policy,
            confirm,
        }
    }

    pub fn rpc(&self) -> &Arc<R> {
        &self.rpc
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Submit `instructions` paid by `payer` and signed by `payer` plus `signers`
    ///
    /// Returns the signature of the first attempt seen landing. Every
    /// signature handed to the cluster is remembered; before a resend and
    /// before any failure is reported, all of them are checked, so a late
    /// landing is never reported as a rejection.
    pub async fn submit(
        &self,
        instructions: &[Instruction],
        payer: &Keypair,
        signers: &[&Keypair],
        logger: &OperationLogger,
    ) -> HeroResult<Signature> {
        if instructions.is_empty() {
            return Err(HeroError::validation("Refusing to submit an empty transaction"));
        }

        let logger = logger.child("submit");
        let started = Instant::now();
        let sent: Mutex<Vec<Signature>> = Mutex::new(Vec::new());
        // Signed transaction resent as is while its blockhash stays valid
        let prepared: Mutex<Option<Transaction>> = Mutex::new(None);

        let result = retry_with_backoff(&logger, &self.policy, |attempt| {
            let sent = &sent;
            let prepared = &prepared;
            let logger = &logger;
            async move {
                if attempt > 0 {
                    let earlier = sent.lock().clone();
                    if let Some(landed) = self.find_landed(&earlier, logger).await {
                        return Ok(landed);
                    }
                }

                let tx = self.prepare(prepared, instructions, payer, signers).await?;
                let signature = tx.signatures.first().copied().ok_or_else(|| {
                    RpcError::Internal("signed transaction carries no signature".to_string())
                })?;
                {
                    let mut sent = sent.lock();
                    if !sent.contains(&signature) {
                        sent.push(signature);
                    }
                }

                if let Err(err) = self.rpc.send_transaction(&tx).await {
                    if matches!(err, RpcError::BlockhashNotFound { .. }) {
                        *prepared.lock() = None;
                    }
                    return Err(err);
                }
                self.await_ack(&signature).await?;
                Ok(signature)
            }
        })
        .await;

        let result = match result {
            Err(failure) => {
                let earlier = sent.lock().clone();
                match self.find_landed(&earlier, &logger).await {
                    Some(landed) => Ok((landed, failure.attempts)),
                    None => Err(failure),
                }
            }
            ok => ok,
        };

        match result {
            Ok((signature, attempts)) => {
                logger.log_submitted(
                    &signature.to_string(),
                    attempts,
                    started.elapsed().as_millis() as u64,
                );
                Ok(signature)
            }
            Err(failure) if failure.exhausted => Err(HeroError::Submission {
                attempts: failure.attempts,
                last_error: failure.error,
            }),
            Err(failure) => {
                logger.error(&format!(
                    "Submission stopped after {} attempt(s): {}",
                    failure.attempts, failure.error
                ));
                Err(HeroError::from_rpc(failure.error))
            }
        }
    }

    /// Submit `plan`, refusing before any network call when a key it needs
    /// to sign has no keypair among `payer` and `signers`
    pub async fn submit_plan(
        &self,
        plan: &InstructionPlan,
        payer: &Keypair,
        signers: &[&Keypair],
        logger: &OperationLogger,
    ) -> HeroResult<Signature> {
        let available: Vec<_> = std::iter::once(payer.pubkey())
            .chain(signers.iter().map(|k| k.pubkey()))
            .collect();
        if let Some(missing) = plan
            .required_signers()
            .iter()
            .chain(plan.extra_signers.iter())
            .find(|key| !available.contains(key))
        {
            return Err(HeroError::validation(format!(
                "No keypair for required signer {}",
                missing
            )));
        }
        self.submit(&plan.instructions, payer, signers, logger).await
    }

    /// First of `signatures` that reached the configured commitment
    async fn find_landed(&self, signatures: &[Signature], logger: &OperationLogger) -> Option<Signature> {
        for signature in signatures {
            match self
                .rpc
                .signature_status(signature, self.confirm.commitment)
                .await
            {
                Ok(SignatureState::Confirmed) => {
                    logger.info(&format!("Earlier attempt {} landed late", signature));
                    return Some(*signature);
                }
                Ok(_) => {}
                Err(err) => logger.debug(&format!("Status check for {} failed: {}", signature, err)),
            }
        }
        None
    }

    /// Reuse the cached transaction if its blockhash is still valid, else sign a fresh one
    async fn prepare(
        &self,
        prepared: &Mutex<Option<Transaction>>,
        instructions: &[Instruction],
        payer: &Keypair,
        signers: &[&Keypair],
    ) -> Result<Transaction, RpcError> {
        let cached = prepared.lock().clone();
        if let Some(tx) = cached {
            if self.rpc.is_blockhash_valid(&tx.message.recent_blockhash).await? {
                return Ok(tx);
            }
        }

        let blockhash = self.rpc.latest_blockhash().await?;

        let mut all_signers: Vec<&Keypair> = Vec::with_capacity(signers.len() + 1);
        all_signers.push(payer);
        for &signer in signers {
            if signer.pubkey() != payer.pubkey() {
                all_signers.push(signer);
            }
        }

        let mut tx = Transaction::new_with_payer(instructions, Some(&payer.pubkey()));
        tx.try_sign(all_signers.as_slice(), blockhash)
            .map_err(|e| RpcError::Internal(format!("Signing failed: {}", e)))?;

        *prepared.lock() = Some(tx.clone());
        Ok(tx)
    }

    async fn await_ack(&self, signature: &Signature) -> Result<(), RpcError> {
        let deadline = Instant::now() + self.confirm.timeout;
        loop {
            match self
                .rpc
                .signature_status(signature, self.confirm.commitment)
                .await?
            {
                SignatureState::Confirmed => return Ok(()),
                SignatureState::Failed(err) => {
                    return Err(RpcError::from_transaction_error(&err, self.rpc.endpoint()))
                }
                SignatureState::Pending => {}
            }

            if Instant::now() >= deadline {
                return Err(RpcError::Timeout {
                    endpoint: self.rpc.endpoint().to_string(),
                    timeout_ms: self.confirm.timeout.as_millis() as u64,
                });
            }
            sleep(self.confirm.poll_interval).await;
        }
    }

    /// Wait for `signature` to finalize; failures are logged and ignored
    ///
    /// Returns `true` when the signature was seen finalized.
    pub async fn confirm_best_effort(&self, signature: &Signature, logger: &OperationLogger) -> bool {
        let deadline = Instant::now() + self.confirm.timeout;
        loop {
            match self
                .rpc
                .signature_status(signature, CommitmentConfig::finalized())
                .await
            {
                Ok(SignatureState::Confirmed) => {
                    logger.info(&format!("Transaction {} finalized", signature));
                    return true;
                }
                Ok(SignatureState::Failed(err)) => {
                    logger.warn(&format!("Transaction {} failed after ack: {}", signature, err));
                    return false;
                }
                Ok(SignatureState::Pending) => {}
                Err(err) => {
                    logger.warn(&format!("Finalization check for {} failed: {}", signature, err));
                    return false;
                }
            }

            if Instant::now() >= deadline {
                logger.warn(&format!(
                    "Transaction {} not finalized within {:?}",
                    signature, self.confirm.timeout
                ));
                return false;
            }
            sleep(self.confirm.poll_interval).await;
        }
    }
}
