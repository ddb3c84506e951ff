//! Recovery hook: the collaborator invoked by the driver whenever a chunk send fails
//! with a retryable error and the retry policy has attempts remaining.

use crate::error::UploadError;

/// What the driver should do next after a retryable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Rebuild the chunk request at the current `bytes_sent` and resend immediately.
    Proceed,
    /// Issue a status-query request first, reconcile `bytes_sent` from its response,
    /// then resend.
    QueryStatus,
}

/// Decides how the driver should recover from a retryable chunk-send failure.
///
/// Invoked inline from the chunk loop. There is no shared HTTP interceptor chain to
/// register into, since the driver talks to `reqwest::Client` directly rather than
/// through a middleware abstraction of its own. The hook's lifetime is exactly one
/// `upload`/`upload_async` call.
pub trait RecoveryHook: Send + Sync {
    fn decide(&self, error: &UploadError) -> RecoveryAction;
}

/// Always queries the server's authoritative cursor after a transient failure before
/// resuming. The right default for this protocol: the client cannot otherwise tell how
/// much of the failed chunk the server durably received.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusQueryRecovery;

impl RecoveryHook for StatusQueryRecovery {
    fn decide(&self, _error: &UploadError) -> RecoveryAction {
        RecoveryAction::QueryStatus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_query_recovery_always_queries() {
        let hook = StatusQueryRecovery;
        assert_eq!(
            hook.decide(&UploadError::Transient("503".into())),
            RecoveryAction::QueryStatus
        );
    }
}
