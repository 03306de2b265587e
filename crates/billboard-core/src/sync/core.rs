//! The sync core state machine

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::state::{ConnectionState, MessageState, Status};
use crate::error::GatewayError;
use crate::gateway::{Account, ContractGateway, MessageUpdate, ProviderGateway};
use crate::view::{project, ViewModel};

/// A notification pulled from one of the two gateway streams
enum Notification {
    Accounts(Option<Vec<Account>>),
    Update(Option<MessageUpdate>),
}

/// Client-side sync core for the shared message contract
///
/// Sole owner of connection state, message state, and the current status.
/// Every mutation goes through `&mut self`, so transitions are serialized:
/// a second `connect()` cannot start while one is in flight, and no two
/// transitions ever interleave against the same core.
///
/// The two notification streams (account changes, update confirmations) are
/// independent and unordered relative to each other; the core applies
/// whichever arrives next with last-write-wins semantics.
pub struct SyncCore<P, C> {
    provider: P,
    contract: C,
    connection: ConnectionState,
    message: MessageState,
    status: Status,
    account_events: Option<mpsc::UnboundedReceiver<Vec<Account>>>,
    update_events: Option<mpsc::UnboundedReceiver<MessageUpdate>>,
    view_tx: watch::Sender<ViewModel>,
}

impl<P: ProviderGateway, C: ContractGateway> SyncCore<P, C> {
    /// Create a new core over the two gateways
    pub fn new(provider: P, contract: C) -> Self {
        let connection = ConnectionState::Disconnected;
        let message = MessageState::default();
        let status = Status::Idle;
        let (view_tx, _) = watch::channel(project(&connection, &message, &status));

        Self {
            provider,
            contract,
            connection,
            message,
            status,
            account_events: None,
            update_events: None,
            view_tx,
        }
    }

    /// Run the session start sequence
    ///
    /// Resets the provider session (best effort), attempts to connect, reads
    /// the current message regardless of the connection outcome, and claims
    /// both notification streams. The message value is public-readable, so a
    /// failed or unavailable connection never blocks the read.
    pub async fn initialize(&mut self) {
        if let Err(err) = self.provider.reset().await {
            warn!("Provider reset failed: {err}");
        }

        self.run_connect().await;
        self.read_current().await;
        self.subscribe();
    }

    /// Explicit connect request from the UI
    ///
    /// Re-runs only the connect sub-sequence; the current message and the
    /// stream subscriptions are untouched.
    pub async fn connect(&mut self) {
        self.run_connect().await;
    }

    /// Replace the in-progress edit; no network call
    pub fn set_pending(&mut self, text: impl Into<String>) {
        self.message.pending = text.into();
        self.refresh_view();
    }

    /// Explicitly discard the in-progress edit
    pub fn clear_pending(&mut self) {
        self.message.pending.clear();
        self.refresh_view();
    }

    /// Submit the pending edit as a contract update
    ///
    /// Requires an active connection; otherwise fails locally without any
    /// gateway call. Success means the transaction was accepted for
    /// processing - the pending edit is kept until the confirmation event
    /// arrives, and kept on failure so the user can retry.
    pub async fn submit(&mut self) {
        let Some(account) = self.connection.account().cloned() else {
            self.status = Status::NotConnected;
            self.refresh_view();
            return;
        };

        match self
            .contract
            .submit_update(&account, &self.message.pending)
            .await
        {
            Ok(()) => {
                info!("Update submitted from {account}, awaiting confirmation");
                self.status = Status::Submitted;
            }
            Err(err) => {
                warn!("Update submission failed: {err}");
                self.status = Status::Failed(err);
            }
        }
        self.refresh_view();
    }

    /// Await the next gateway notification and apply it
    ///
    /// Returns `false` once both streams have ended (or were never
    /// available), at which point there is nothing left to pump.
    pub async fn pump(&mut self) -> bool {
        loop {
            let notification = match (self.account_events.as_mut(), self.update_events.as_mut()) {
                (None, None) => return false,
                (Some(accounts), None) => Notification::Accounts(accounts.recv().await),
                (None, Some(updates)) => Notification::Update(updates.recv().await),
                (Some(accounts), Some(updates)) => tokio::select! {
                    item = accounts.recv() => Notification::Accounts(item),
                    item = updates.recv() => Notification::Update(item),
                },
            };

            match notification {
                Notification::Accounts(Some(accounts)) => {
                    self.apply_accounts_changed(accounts);
                    return true;
                }
                Notification::Update(Some(update)) => {
                    self.apply_update_confirmed(update);
                    return true;
                }
                Notification::Accounts(None) => {
                    debug!("Account-change stream ended");
                    self.account_events = None;
                }
                Notification::Update(None) => {
                    debug!("Update-event stream ended");
                    self.update_events = None;
                }
            }
        }
    }

    /// Apply every notification already queued, without blocking
    ///
    /// Returns the number of notifications applied. Useful for tick-driven
    /// hosts and tests.
    pub fn drain_notifications(&mut self) -> usize {
        let mut account_batch = Vec::new();
        if let Some(rx) = self.account_events.as_mut() {
            while let Ok(accounts) = rx.try_recv() {
                account_batch.push(accounts);
            }
        }
        let mut update_batch = Vec::new();
        if let Some(rx) = self.update_events.as_mut() {
            while let Ok(update) = rx.try_recv() {
                update_batch.push(update);
            }
        }

        let applied = account_batch.len() + update_batch.len();
        for accounts in account_batch {
            self.apply_accounts_changed(accounts);
        }
        for update in update_batch {
            self.apply_update_confirmed(update);
        }
        applied
    }

    /// Release both notification subscriptions
    ///
    /// Any gateway call still in flight completes against its own task and
    /// has nowhere left to deliver, so late completions are no-ops.
    pub fn close(&mut self) {
        self.account_events = None;
        self.update_events = None;
    }

    /// Current connection state
    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    /// Last confirmed on-chain value
    pub fn current_message(&self) -> &str {
        &self.message.current
    }

    /// The in-progress edit
    pub fn pending(&self) -> &str {
        &self.message.pending
    }

    /// Latest operation outcome
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Project the current state for display
    pub fn view(&self) -> ViewModel {
        project(&self.connection, &self.message, &self.status)
    }

    /// Subscribe to view changes for re-rendering
    pub fn subscribe_view(&self) -> watch::Receiver<ViewModel> {
        self.view_tx.subscribe()
    }

    async fn run_connect(&mut self) {
        self.connection = ConnectionState::Connecting;
        self.refresh_view();

        match self.provider.connect().await {
            Ok(account) => {
                info!("Wallet connected: {account}");
                self.connection = ConnectionState::Connected(account);
                self.status = Status::Connected;
            }
            Err(GatewayError::NoProvider) => {
                info!("No wallet provider present");
                self.connection = ConnectionState::Unavailable;
                self.status = Status::InstallPrompt;
            }
            Err(err) => {
                warn!("Wallet connect failed: {err}");
                self.connection = ConnectionState::Disconnected;
                self.status = Status::Failed(err);
            }
        }
        self.refresh_view();
    }

    async fn read_current(&mut self) {
        match self.contract.read_message().await {
            Ok(value) => {
                debug!("Read current message ({} bytes)", value.len());
                self.message.current = value;
            }
            Err(err) => {
                warn!("Message read failed: {err}");
                self.status = Status::Failed(err);
            }
        }
        self.refresh_view();
    }

    /// Claim both notification streams, at most once per core
    fn subscribe(&mut self) {
        if self.account_events.is_none() {
            self.account_events = self.provider.take_account_events();
        }
        if self.update_events.is_none() {
            self.update_events = self.contract.take_update_events();
        }
        if self.account_events.is_none() {
            debug!("No account-change stream available");
        }
    }

    /// The provider-side account set changed
    ///
    /// The stream is authoritative for the current account: it can change
    /// outside this UI entirely (switched in the wallet's own interface), so
    /// it overrides whatever the manual connect flow last set.
    fn apply_accounts_changed(&mut self, accounts: Vec<Account>) {
        match accounts.first() {
            Some(account) => {
                debug!("Active account changed: {account}");
                self.connection = ConnectionState::Connected(account.clone());
                self.status = Status::ReadyToWrite;
            }
            None => {
                debug!("Provider disconnected all accounts");
                self.connection = ConnectionState::Disconnected;
                self.status = Status::ConnectPrompt;
            }
        }
        self.refresh_view();
    }

    /// A confirmed on-chain update arrived
    ///
    /// Applies regardless of whether the actor is the locally connected
    /// account; any client may have written the value.
    fn apply_update_confirmed(&mut self, update: MessageUpdate) {
        debug!("Update confirmed by {}", update.actor);
        self.message.current = update.value;
        self.message.pending.clear();
        self.status = Status::Confirmed;
        self.refresh_view();
    }

    fn refresh_view(&mut self) {
        self.view_tx
            .send_replace(project(&self.connection, &self.message, &self.status));
    }
}
