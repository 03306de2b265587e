//! Gateway error taxonomy
//!
//! Typed errors for provider and contract operations. Every gateway failure
//! surfaces to the UI as a status update; none is thrown past the sync core.

use thiserror::Error;

/// Errors reported by the provider and contract gateways
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No wallet provider is present. Fatal to connecting, not to reading.
    #[error("No wallet provider found. Install a wallet to connect.")]
    NoProvider,

    /// The user declined the access request or transaction signature.
    #[error("Request was rejected in the wallet.")]
    UserRejected,

    /// The provider failed for some other reason.
    #[error("Wallet provider error: {0}")]
    Provider(String),

    /// Reading the contract value failed (node or network failure).
    #[error("Could not read the current message: {0}")]
    Read(String),

    /// The node rejected the submitted transaction.
    #[error("Update was not accepted: {0}")]
    Submission(String),

    /// The submitting account was empty. Guarded earlier by the connected
    /// check, so reaching this indicates a caller bug.
    #[error("Cannot submit from an empty account.")]
    InvalidAccount,
}

impl GatewayError {
    /// Whether the user can reasonably retry the failed operation
    ///
    /// Provider absence is terminal until the page/session restarts; every
    /// other failure is either a user decision or a transient infrastructure
    /// problem.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GatewayError::NoProvider)
    }

    /// A short hint appended to the displayed status for recoverable errors
    pub fn recovery_hint(&self) -> Option<&'static str> {
        match self {
            GatewayError::NoProvider => None,
            GatewayError::UserRejected => Some("You can try again from the wallet prompt."),
            GatewayError::InvalidAccount => None,
            _ => Some("Check your connection and try again."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_provider_is_terminal() {
        assert!(!GatewayError::NoProvider.is_recoverable());
        assert!(GatewayError::NoProvider.recovery_hint().is_none());
    }

    #[test]
    fn test_transient_errors_are_recoverable() {
        assert!(GatewayError::UserRejected.is_recoverable());
        assert!(GatewayError::Read("timeout".into()).is_recoverable());
        assert!(GatewayError::Submission("nonce too low".into()).is_recoverable());
        assert!(GatewayError::Read("timeout".into()).recovery_hint().is_some());
    }

    #[test]
    fn test_error_display() {
        let err = GatewayError::Submission("nonce too low".into());
        let msg = err.to_string();
        assert!(msg.contains("not accepted"));
        assert!(msg.contains("nonce too low"));
    }
}
