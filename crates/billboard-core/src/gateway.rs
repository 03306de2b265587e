//! Provider and contract gateway traits
//!
//! The sync core talks to two external systems through these traits: the
//! wallet provider (account access and signing) and the deployed contract
//! (the shared message value). Both push out-of-band notifications through
//! unbounded channels that a consumer claims exactly once with the `take_*`
//! accessors, so repeated subscription attempts cannot create duplicate
//! listeners.

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::GatewayError;

/// Account address string identifying the user to the contract
pub type Account = String;

/// A confirmed on-chain change of the message value
///
/// Emitted once per confirmation. This is the only source of truth for "the
/// value actually changed"; a submission acknowledgment is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageUpdate {
    /// Account that performed the update (any account, not just ours)
    pub actor: Account,
    /// The resulting message value
    pub value: String,
}

/// Adapter over the injected wallet provider
pub trait ProviderGateway: Send {
    /// Force the provider to drop any session connection
    ///
    /// Used to guarantee a clean connect attempt; idempotent.
    fn reset(&mut self) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Request account access, returning the primary account
    ///
    /// # Errors
    ///
    /// `NoProvider` when no wallet provider is present, `UserRejected` when
    /// the access request is denied, `Provider` for anything else.
    fn connect(&mut self) -> impl Future<Output = Result<Account, GatewayError>> + Send;

    /// Query already-authorized accounts without prompting the user
    fn current_accounts(&mut self)
        -> impl Future<Output = Result<Vec<Account>, GatewayError>> + Send;

    /// Claim the account-change notification stream (at most once)
    ///
    /// Each item is the provider's full active account set, including the
    /// empty set on disconnect. Returns `None` once claimed, or when the
    /// provider has no stream to offer (no provider present).
    fn take_account_events(&mut self) -> Option<mpsc::UnboundedReceiver<Vec<Account>>>;
}

/// Adapter over the deployed message contract
pub trait ContractGateway: Send {
    /// One-shot read of the contract's current value
    fn read_message(&mut self) -> impl Future<Output = Result<String, GatewayError>> + Send;

    /// Build and send a transaction from `account` setting the value to `text`
    ///
    /// `Ok` acknowledges that the transaction was accepted for processing,
    /// NOT that it was confirmed. The caller must wait for the matching
    /// update event before treating the value as changed.
    ///
    /// # Errors
    ///
    /// `UserRejected` when the signature is declined, `Submission` when the
    /// node rejects the transaction, `InvalidAccount` when `account` is empty.
    fn submit_update(
        &mut self,
        account: &Account,
        text: &str,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Claim the update-event notification stream (at most once)
    fn take_update_events(&mut self) -> Option<mpsc::UnboundedReceiver<MessageUpdate>>;
}
