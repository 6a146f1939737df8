//! Test Utilities Module
//!
//! In-memory doubles for the RPC and storage seams. Every flow can be run
//! end to end against these without a cluster or network access.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use crate::rpc::{AccountFilter, HeroRpc, RawAccount, RpcError, SignatureState};
use crate::structured_logging::OperationLogger;
use crate::upload::{UploadContent, UploadError, Uploader};
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use spl_token::solana_program::program_pack::Pack;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone)]
struct StoredAccount {
    address: Pubkey,
    owner: Pubkey,
    data: Vec<u8>,
}

#[derive(Debug, Clone)]
struct ScriptedSendFailure {
    error: RpcError,
    /// Account that appears on chain when this failure fires
    side_effect: Option<StoredAccount>,
}

#[derive(Default)]
struct MockState {
    accounts: Vec<StoredAccount>,
    send_failures: VecDeque<ScriptedSendFailure>,
    sent: Vec<Transaction>,
    pending_polls: u32,
    /// Status answers keyed by the position of the transaction in `sent`
    scripted_statuses: HashMap<usize, VecDeque<SignatureState>>,
    blockhashes_expire: bool,
    execution_failure: Option<TransactionError>,
}

/// Scriptable in-memory [`HeroRpc`]
#[derive(Default)]
pub struct MockRpc {
    state: Mutex<MockState>,
    send_attempts: AtomicU32,
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an account owned by `owner`
    pub fn add_account(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        self.state.lock().accounts.push(StoredAccount {
            address,
            owner,
            data,
        });
    }

    /// Fail the next sends with these errors, in order
    pub fn fail_next_sends(&self, errors: Vec<RpcError>) {
        let mut state = self.state.lock();
        state.send_failures.extend(errors.into_iter().map(|error| ScriptedSendFailure {
            error,
            side_effect: None,
        }));
    }

    /// Next send is rejected because another writer created `address` first
    pub fn lose_race_on_next_send(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        self.state.lock().send_failures.push_back(ScriptedSendFailure {
            error: RpcError::Rejected {
                reason: "account already in use".to_string(),
                code: Some(0),
            },
            side_effect: Some(StoredAccount {
                address,
                owner,
                data,
            }),
        });
    }

    /// Answer `Pending` to the next `polls` status queries
    pub fn delay_confirmations(&self, polls: u32) {
        self.state.lock().pending_polls = polls;
    }

    /// Answer status queries for the `send_index`-th accepted transaction
    /// from `statuses` in order; the last answer repeats
    pub fn script_statuses(&self, send_index: usize, statuses: Vec<SignatureState>) {
        self.state
            .lock()
            .scripted_statuses
            .insert(send_index, statuses.into());
    }

    /// Report every blockhash as expired, forcing a fresh signature per attempt
    pub fn expire_blockhashes(&self) {
        self.state.lock().blockhashes_expire = true;
    }

    /// Report every sent transaction as failed during execution
    pub fn fail_execution(&self, error: TransactionError) {
        self.state.lock().execution_failure = Some(error);
    }

    /// Calls to `send_transaction`, failed ones included
    pub fn send_attempts(&self) -> u32 {
        self.send_attempts.load(Ordering::SeqCst)
    }

    /// Transactions accepted by `send_transaction`
    pub fn sent_transactions(&self) -> Vec<Transaction> {
        self.state.lock().sent.clone()
    }
}

#[async_trait]
impl HeroRpc for MockRpc {
    fn endpoint(&self) -> &str {
        "mock"
    }

    async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
        Ok(Hash::new_unique())
    }

    async fn is_blockhash_valid(&self, _blockhash: &Hash) -> Result<bool, RpcError> {
        Ok(!self.state.lock().blockhashes_expire)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, RpcError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if let Some(failure) = state.send_failures.pop_front() {
            if let Some(account) = failure.side_effect {
                state.accounts.push(account);
            }
            return Err(failure.error);
        }
        let signature = transaction.signatures.first().copied().ok_or_else(|| {
            RpcError::Internal("transaction carries no signature".to_string())
        })?;
        // The cluster drops duplicates of an accepted transaction
        if !state.sent.iter().any(|tx| tx.signatures.first() == Some(&signature)) {
            state.sent.push(transaction.clone());
        }
        Ok(signature)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> Result<SignatureState, RpcError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let position = state
            .sent
            .iter()
            .position(|tx| tx.signatures.first() == Some(signature));
        if let Some(queue) = position.and_then(|i| state.scripted_statuses.get_mut(&i)) {
            let scripted = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            if let Some(status) = scripted {
                return Ok(status);
            }
        }
        if state.pending_polls > 0 {
            state.pending_polls -= 1;
            return Ok(SignatureState::Pending);
        }
        let known = state.sent.iter().any(|tx| tx.signatures.first() == Some(signature));
        Ok(match (known, &state.execution_failure) {
            (false, _) => SignatureState::Pending,
            (true, Some(err)) => SignatureState::Failed(err.clone()),
            (true, None) => SignatureState::Confirmed,
        })
    }

    async fn program_accounts(
        &self,
        program: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<RawAccount>, RpcError> {
        Ok(self
            .state
            .lock()
            .accounts
            .iter()
            .filter(|a| a.owner == *program && filters.iter().all(|f| f.matches(&a.data)))
            .map(|a| RawAccount {
                pubkey: a.address,
                data: a.data.clone(),
            })
            .collect())
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, RpcError> {
        Ok(self.state.lock().accounts.iter().any(|a| a.address == *address))
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, RpcError> {
        Ok(890_880 + 6_960 * data_len as u64)
    }
}

/// Packed SPL token account holding `amount` of `mint` for `owner`
pub fn token_account_data(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Vec<u8> {
    let account = spl_token::state::Account {
        mint: *mint,
        owner: *owner,
        amount,
        state: spl_token::state::AccountState::Initialized,
        ..Default::default()
    };
    let mut data = vec![0u8; spl_token::state::Account::LEN];
    account.pack_into_slice(&mut data);
    data
}

/// Scriptable in-memory [`Uploader`]
pub struct MockUploader {
    link: String,
    failures: Mutex<VecDeque<UploadError>>,
    uploads: Mutex<Vec<UploadContent>>,
    calls: AtomicU32,
}

impl MockUploader {
    pub fn new(link: &str) -> Self {
        Self {
            link: link.to_string(),
            failures: Mutex::new(VecDeque::new()),
            uploads: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn fail_next(&self, errors: Vec<UploadError>) {
        self.failures.lock().extend(errors);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Contents of successful uploads
    pub fn uploads(&self) -> Vec<UploadContent> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl Uploader for MockUploader {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn upload(&self, content: &UploadContent, _logger: &OperationLogger) -> Result<String, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().pop_front() {
            return Err(err);
        }
        self.uploads.lock().push(content.clone());
        Ok(self.link.clone())
    }
}
