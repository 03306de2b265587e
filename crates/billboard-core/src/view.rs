//! View-model projection
//!
//! Pure, synchronous mapping of sync core state to the fields a front end
//! displays. No failure modes of its own and no invented values: a connected
//! state with an empty account is a contract violation of the core, surfaced
//! here as an internal-error status rather than papered over.

use crate::sync::{ConnectionState, MessageState, Status};

/// Display fields consumed by a front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel {
    /// Text for the connect button / connection indicator
    pub connection_label: String,
    /// Last confirmed on-chain message
    pub message: String,
    /// The in-progress edit buffer
    pub pending: String,
    /// Human-readable outcome of the latest operation
    pub status: String,
    /// Whether a submit would pass the connection guard
    pub can_submit: bool,
}

/// Project core state into display fields
pub fn project(connection: &ConnectionState, message: &MessageState, status: &Status) -> ViewModel {
    let (connection_label, can_submit, violation) = match connection {
        ConnectionState::Disconnected => ("Connect Wallet".to_string(), false, false),
        ConnectionState::Connecting => ("Connecting...".to_string(), false, false),
        ConnectionState::Connected(account) if account.is_empty() => {
            ("Connected".to_string(), false, true)
        }
        ConnectionState::Connected(account) => {
            (format!("Connected: {}", shorten(account)), true, false)
        }
        ConnectionState::Unavailable => ("Wallet Unavailable".to_string(), false, false),
    };

    let status = if violation {
        "Internal error: connected without an account.".to_string()
    } else {
        status_text(status)
    };

    ViewModel {
        connection_label,
        message: message.current.clone(),
        pending: message.pending.clone(),
        status,
        can_submit,
    }
}

/// Status text with a retry hint appended for recoverable failures
fn status_text(status: &Status) -> String {
    let mut text = status.to_string();
    if let Status::Failed(err) = status {
        if let Some(hint) = err.recovery_hint() {
            text.push(' ');
            text.push_str(hint);
        }
    }
    text
}

/// Shorten an address to its leading and trailing characters
///
/// `0x7f3b9a1c...` style addresses render as `0x7f3b...9a1c`; anything too
/// short to shorten is shown as-is.
fn shorten(account: &str) -> String {
    let tail_start = account.len().saturating_sub(4);
    match (account.get(..6), account.get(tail_start..)) {
        (Some(head), Some(tail)) if account.len() > 12 => format!("{head}...{tail}"),
        _ => account.to_string(),
    }
}
