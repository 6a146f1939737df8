use solana_client::client_error::ClientError;
use solana_sdk::{instruction::InstructionError, transaction::TransactionError};
use thiserror::Error;

/// Classified failure of a single RPC call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// Transport-level errors (network, connection)
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    #[error("Timeout after {timeout_ms}ms (endpoint: {endpoint})")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("Rate limit exceeded (endpoint: {endpoint})")]
    RateLimited { endpoint: String },

    /// The transaction referenced a block the cluster no longer knows
    #[error("Blockhash not found (endpoint: {endpoint})")]
    BlockhashNotFound { endpoint: String },

    /// The cluster executed or simulated the transaction and refused it
    #[error("Transaction rejected: {reason}")]
    Rejected { reason: String, code: Option<u32> },

    #[error("Insufficient funds (endpoint: {endpoint})")]
    InsufficientFunds { endpoint: String },

    #[error("Account not found: {account} (endpoint: {endpoint})")]
    AccountNotFound { account: String, endpoint: String },

    /// RPC server answered with an error not covered above
    #[error("RPC response error: {message} (endpoint: {endpoint}, code: {code:?})")]
    RpcResponse {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RpcError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Transport { .. } => true,
            RpcError::Timeout { .. } => true,
            RpcError::RateLimited { .. } => true,
            RpcError::BlockhashNotFound { .. } => true,

            RpcError::Rejected { .. } => false,
            RpcError::InsufficientFunds { .. } => false,
            RpcError::AccountNotFound { .. } => false,
            RpcError::Internal(_) => false,

            // Retry on server errors (5xx)
            RpcError::RpcResponse { code, .. } => {
                matches!(code, Some(c) if (500..600).contains(c))
            }
        }
    }

    /// Semantic refusal by the cluster or program; never retried blindly
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            RpcError::Rejected { .. } | RpcError::InsufficientFunds { .. }
        )
    }

    /// Program-defined error code, when the rejection carried one
    pub fn code(&self) -> Option<u32> {
        match self {
            RpcError::Rejected { code, .. } => *code,
            _ => None,
        }
    }

    /// Classify a transaction-level error reported by the cluster
    pub fn from_transaction_error(err: &TransactionError, endpoint: &str) -> Self {
        match err {
            TransactionError::BlockhashNotFound => RpcError::BlockhashNotFound {
                endpoint: endpoint.to_string(),
            },
            TransactionError::InsufficientFundsForFee
            | TransactionError::InsufficientFundsForRent { .. } => RpcError::InsufficientFunds {
                endpoint: endpoint.to_string(),
            },
            TransactionError::InstructionError(_, InstructionError::Custom(code)) => {
                RpcError::Rejected {
                    reason: err.to_string(),
                    code: Some(*code),
                }
            }
            _ => RpcError::Rejected {
                reason: err.to_string(),
                code: None,
            },
        }
    }

    /// Create from ClientError with context
    pub fn from_client_error(err: &ClientError, endpoint: &str) -> Self {
        if let Some(tx_err) = err.get_transaction_error() {
            return Self::from_transaction_error(&tx_err, endpoint);
        }
        Self::from_message(&err.to_string(), endpoint)
    }

    /// Classify based on error message
    pub fn from_message(message: &str, endpoint: &str) -> Self {
        let err_str = message.to_lowercase();
        let endpoint = endpoint.to_string();

        if err_str.contains("blockhash not found") || err_str.contains("block height exceeded") {
            RpcError::BlockhashNotFound { endpoint }
        } else if err_str.contains("insufficient funds") || err_str.contains("insufficient lamports")
        {
            RpcError::InsufficientFunds { endpoint }
        } else if err_str.contains("account not found") {
            RpcError::AccountNotFound {
                account: "unknown".to_string(),
                endpoint,
            }
        } else if err_str.contains("rate limit")
            || err_str.contains("too many requests")
            || err_str.contains("429")
        {
            RpcError::RateLimited { endpoint }
        } else if err_str.contains("timeout") || err_str.contains("timed out") {
            RpcError::Timeout {
                endpoint,
                timeout_ms: 0,
            }
        } else if err_str.contains("connection")
            || err_str.contains("error sending request")
            || err_str.contains("dns")
            || err_str.contains("io error")
        {
            RpcError::Transport {
                endpoint,
                message: message.to_string(),
            }
        } else {
            // Extract error code if available
            let code = err_str
                .split("code:")
                .nth(1)
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.trim_matches(|c: char| !c.is_ascii_digit() && c != '-').parse::<i64>().ok());

            RpcError::RpcResponse {
                endpoint,
                message: message.to_string(),
                code,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(RpcError::Transport {
            endpoint: "test".to_string(),
            message: "connection failed".to_string(),
        }
        .is_retryable());
        assert!(RpcError::BlockhashNotFound {
            endpoint: "test".to_string()
        }
        .is_retryable());

        assert!(!RpcError::Rejected {
            reason: "custom program error: 0x1".to_string(),
            code: Some(1),
        }
        .is_retryable());
        assert!(!RpcError::InsufficientFunds {
            endpoint: "test".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_server_errors_retry_client_errors_do_not() {
        let server = RpcError::RpcResponse {
            endpoint: "e".to_string(),
            message: "bad gateway".to_string(),
            code: Some(502),
        };
        let client = RpcError::RpcResponse {
            endpoint: "e".to_string(),
            message: "invalid params".to_string(),
            code: Some(-32602),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
    }

    #[test]
    fn test_transaction_error_classification() {
        let err = RpcError::from_transaction_error(&TransactionError::BlockhashNotFound, "e");
        assert!(err.is_retryable());

        let err = RpcError::from_transaction_error(
            &TransactionError::InstructionError(0, InstructionError::Custom(6)),
            "e",
        );
        assert!(err.is_rejection());
        assert_eq!(err.code(), Some(6));

        let err = RpcError::from_transaction_error(&TransactionError::InsufficientFundsForFee, "e");
        assert!(err.is_rejection());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_message_classification() {
        assert!(matches!(
            RpcError::from_message("HTTP status 429 Too Many Requests", "e"),
            RpcError::RateLimited { .. }
        ));
        assert!(matches!(
            RpcError::from_message("operation timed out", "e"),
            RpcError::Timeout { .. }
        ));
        assert!(matches!(
            RpcError::from_message("error sending request for url", "e"),
            RpcError::Transport { .. }
        ));
        assert!(matches!(
            RpcError::from_message("something odd", "e"),
            RpcError::RpcResponse { code: None, .. }
        ));
    }
}
