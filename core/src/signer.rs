//! Signing and submission.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::transaction::{PlannedTransaction, Receipt, SignedTransaction};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("timed out waiting for confirmation")]
    Timeout,
    #[error("rate limited by the RPC provider")]
    RateLimited,
    #[error("network error: {0}")]
    Network(String),
    #[error("reverted: {0}")]
    Reverted(String),
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("nonce conflict: {0}")]
    NonceConflict(String),
    #[error("rejected by signer: {0}")]
    Rejected(String),
}

impl SubmitError {
    /// Transient errors are worth retrying; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SubmitError::Timeout | SubmitError::RateLimited | SubmitError::Network(_)
        )
    }
}

/// Signs and submits transactions. Only the executor talks to a signer.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, transaction: &PlannedTransaction) -> Result<SignedTransaction, SubmitError>;

    /// Submits and waits for confirmation.
    async fn send(&self, signed: SignedTransaction) -> Result<Receipt, SubmitError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(SubmitError::Timeout.is_transient());
        assert!(SubmitError::RateLimited.is_transient());
        assert!(SubmitError::Network("reset".into()).is_transient());
        assert!(!SubmitError::Reverted("x".into()).is_transient());
        assert!(!SubmitError::InsufficientFunds.is_transient());
        assert!(!SubmitError::NonceConflict("low".into()).is_transient());
        assert!(!SubmitError::Rejected("user".into()).is_transient());
    }
}
