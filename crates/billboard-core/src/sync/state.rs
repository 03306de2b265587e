//! Sync core state types

use std::fmt;

use crate::error::GatewayError;
use crate::gateway::Account;

/// Wallet connection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No active connection; the user may connect
    Disconnected,
    /// A connect attempt is in flight
    Connecting,
    /// Connected with the given account (non-empty by contract)
    Connected(Account),
    /// No wallet provider is present; stable until the session restarts
    Unavailable,
}

impl ConnectionState {
    /// The connected account, if any
    pub fn account(&self) -> Option<&Account> {
        match self {
            ConnectionState::Connected(account) => Some(account),
            _ => None,
        }
    }
}

/// The shared message as this client sees it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageState {
    /// Last confirmed on-chain value
    ///
    /// Only ever set by a successful read or a confirmed update event, never
    /// by local optimistic assumption.
    pub current: String,
    /// The user's in-progress edit; never written on-chain until submitted
    pub pending: String,
}

/// Latest operation outcome shown to the user
///
/// Exactly one status is current at a time; each new event overwrites it.
/// This is not a log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Nothing has happened yet
    Idle,
    /// Wallet connected via an explicit connect
    Connected,
    /// No provider detected; prompt to install one
    InstallPrompt,
    /// Provider reported an empty account set; prompt to connect
    ConnectPrompt,
    /// Provider reported an active account; ready for input
    ReadyToWrite,
    /// Update accepted for processing, awaiting on-chain confirmation
    Submitted,
    /// A confirmed update event was applied
    Confirmed,
    /// Submit attempted without a connection; nothing was sent
    NotConnected,
    /// A gateway operation failed
    Failed(GatewayError),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Idle => Ok(()),
            Status::Connected => write!(f, "Wallet connected."),
            Status::InstallPrompt => {
                write!(f, "No wallet provider found. Install a wallet to connect.")
            }
            Status::ConnectPrompt => write!(f, "Connect a wallet using the connect button."),
            Status::ReadyToWrite => write!(f, "Write a message in the text field."),
            Status::Submitted => write!(f, "Update submitted, awaiting confirmation."),
            Status::Confirmed => write!(f, "Your message has been updated."),
            Status::NotConnected => write!(f, "Connect a wallet before submitting."),
            Status::Failed(err) => write!(f, "{err}"),
        }
    }
}
