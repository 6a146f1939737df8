//! Structured logging context for hero flows
//!
//! Components never touch the global subscriber. Each flow builds an
//! [`OperationLogger`] and hands it down; every event it emits carries the
//! operation name and a correlation id.

use uuid::Uuid;

/// Structured logger for one CLI flow
#[derive(Debug, Clone)]
pub struct OperationLogger {
    operation: String,
    correlation_id: String,
}

impl OperationLogger {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    /// Child logger sharing the correlation id
    pub fn child(&self, operation: &str) -> Self {
        Self {
            operation: format!("{}.{}", self.operation, operation),
            correlation_id: self.correlation_id.clone(),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn info(&self, message: &str) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            "{}",
            message
        );
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            "{}",
            message
        );
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            "{}",
            message
        );
    }

    pub fn error(&self, message: &str) {
        tracing::error!(
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            "{}",
            message
        );
    }

    pub fn log_attempt(&self, attempt: u32, max_attempts: u32) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            attempt,
            max_attempts,
            "Attempt started"
        );
    }

    pub fn log_retry(&self, attempt: u32, backoff_ms: u64, error: &str) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            attempt,
            backoff_ms,
            error = %error,
            "Transient failure, backing off before retry"
        );
    }

    pub fn log_submitted(&self, signature: &str, attempts: u32, latency_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            signature = %signature,
            attempts,
            latency_ms,
            "Transaction acknowledged"
        );
    }

    pub fn log_decode_skipped(&self, account: &str, error: &str) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            account = %account,
            error = %error,
            "Skipping account that does not decode as a hero record"
        );
    }

    pub fn log_uploaded(&self, content_id: &str, link: &str) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            content_id = %content_id,
            link = %link,
            "Upload succeeded"
        );
    }
}
