//! End-to-end flows through the sync core with scripted gateways
//!
//! Exercises the full session lifecycle the way a front end drives it:
//! initialize, user actions, and out-of-band notifications interleaved.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use billboard_core::{
    Account, ConnectionState, ContractGateway, GatewayError, MessageUpdate, ProviderGateway,
    Status, SyncCore,
};

/// Scripted wallet provider; the test keeps the senders to push events
struct ScriptedProvider {
    connect_results: VecDeque<Result<Account, GatewayError>>,
    accounts: Vec<Account>,
    events: Option<mpsc::UnboundedReceiver<Vec<Account>>>,
}

impl ScriptedProvider {
    fn absent() -> Self {
        Self {
            connect_results: VecDeque::new(),
            accounts: vec![],
            events: None,
        }
    }

    fn approving(account: &str) -> (Self, mpsc::UnboundedSender<Vec<Account>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let provider = Self {
            connect_results: VecDeque::from([Ok(account.to_string())]),
            accounts: vec![account.to_string()],
            events: Some(rx),
        };
        (provider, tx)
    }
}

impl ProviderGateway for ScriptedProvider {
    async fn reset(&mut self) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn connect(&mut self) -> Result<Account, GatewayError> {
        self.connect_results
            .pop_front()
            .unwrap_or(Err(GatewayError::NoProvider))
    }

    async fn current_accounts(&mut self) -> Result<Vec<Account>, GatewayError> {
        if self.events.is_none() && self.connect_results.is_empty() && self.accounts.is_empty() {
            return Err(GatewayError::NoProvider);
        }
        Ok(self.accounts.clone())
    }

    fn take_account_events(&mut self) -> Option<mpsc::UnboundedReceiver<Vec<Account>>> {
        self.events.take()
    }
}

/// Scripted contract; submissions are recorded, confirmations pushed manually
struct ScriptedContract {
    value: String,
    submit_log: Arc<Mutex<Vec<(Account, String)>>>,
    events: Option<mpsc::UnboundedReceiver<MessageUpdate>>,
}

impl ScriptedContract {
    fn holding(value: &str) -> (Self, mpsc::UnboundedSender<MessageUpdate>, Arc<Mutex<Vec<(Account, String)>>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let submit_log = Arc::new(Mutex::new(Vec::new()));
        let contract = Self {
            value: value.to_string(),
            submit_log: submit_log.clone(),
            events: Some(rx),
        };
        (contract, tx, submit_log)
    }
}

impl ContractGateway for ScriptedContract {
    async fn read_message(&mut self) -> Result<String, GatewayError> {
        Ok(self.value.clone())
    }

    async fn submit_update(&mut self, account: &Account, text: &str) -> Result<(), GatewayError> {
        if account.is_empty() {
            return Err(GatewayError::InvalidAccount);
        }
        self.submit_log
            .lock()
            .unwrap()
            .push((account.clone(), text.to_string()));
        Ok(())
    }

    fn take_update_events(&mut self) -> Option<mpsc::UnboundedReceiver<MessageUpdate>> {
        self.events.take()
    }
}

#[tokio::test]
async fn scenario_a_absent_provider_still_reads_message() {
    let (contract, _events, _log) = ScriptedContract::holding("hello world");
    let mut core = SyncCore::new(ScriptedProvider::absent(), contract);

    core.initialize().await;

    assert_eq!(core.connection(), &ConnectionState::Unavailable);
    assert_eq!(core.status(), &Status::InstallPrompt);
    assert_eq!(core.current_message(), "hello world");

    let view = core.view();
    assert_eq!(view.connection_label, "Wallet Unavailable");
    assert_eq!(view.message, "hello world");
}

#[tokio::test]
async fn scenario_b_approved_connect_and_read() {
    let (provider, _accounts) = ScriptedProvider::approving("0xABCDEF0123456789ABCDEF0123456789ABCDEF01");
    let (contract, _events, _log) = ScriptedContract::holding("hello");
    let mut core = SyncCore::new(provider, contract);

    core.initialize().await;

    assert_eq!(
        core.connection(),
        &ConnectionState::Connected("0xABCDEF0123456789ABCDEF0123456789ABCDEF01".to_string())
    );
    assert_eq!(core.current_message(), "hello");
    assert!(core.view().can_submit);
}

#[tokio::test]
async fn scenario_c_submit_then_confirmation() {
    let (provider, _accounts) = ScriptedProvider::approving("0xabc0000000000000000000000000000000000001");
    let (contract, events, log) = ScriptedContract::holding("old");
    let mut core = SyncCore::new(provider, contract);
    core.initialize().await;

    core.set_pending("hi");
    core.submit().await;

    // Acknowledged but unconfirmed: pending and current both unchanged
    assert_eq!(core.status(), &Status::Submitted);
    assert_eq!(core.pending(), "hi");
    assert_eq!(core.current_message(), "old");
    assert_eq!(
        log.lock().unwrap().as_slice(),
        &[(
            "0xabc0000000000000000000000000000000000001".to_string(),
            "hi".to_string()
        )]
    );

    events
        .send(MessageUpdate {
            actor: "0xabc0000000000000000000000000000000000001".to_string(),
            value: "hi".to_string(),
        })
        .unwrap();
    assert!(core.pump().await);

    assert_eq!(core.current_message(), "hi");
    assert_eq!(core.pending(), "");
    assert_eq!(core.status(), &Status::Confirmed);
}

#[tokio::test]
async fn scenario_d_disconnect_mid_flight_then_late_confirmation() {
    let (provider, accounts) = ScriptedProvider::approving("0xabc0000000000000000000000000000000000001");
    let (contract, events, _log) = ScriptedContract::holding("old");
    let mut core = SyncCore::new(provider, contract);
    core.initialize().await;

    core.set_pending("hi");
    core.submit().await;
    assert_eq!(core.status(), &Status::Submitted);

    // The wallet disconnects every account while the submit is unconfirmed
    accounts.send(vec![]).unwrap();
    assert!(core.pump().await);
    assert_eq!(core.connection(), &ConnectionState::Disconnected);
    assert_eq!(core.status(), &Status::ConnectPrompt);

    // Message state is connection-independent: the late event still applies
    events
        .send(MessageUpdate {
            actor: "0xabc0000000000000000000000000000000000001".to_string(),
            value: "hi".to_string(),
        })
        .unwrap();
    assert!(core.pump().await);

    assert_eq!(core.connection(), &ConnectionState::Disconnected);
    assert_eq!(core.current_message(), "hi");
    assert_eq!(core.pending(), "");
}

#[tokio::test]
async fn account_switch_in_wallet_overrides_manual_connect() {
    let (provider, accounts) = ScriptedProvider::approving("0xaaa0000000000000000000000000000000000001");
    let (contract, _events, _log) = ScriptedContract::holding("");
    let mut core = SyncCore::new(provider, contract);
    core.initialize().await;

    accounts
        .send(vec!["0xbbb0000000000000000000000000000000000002".to_string()])
        .unwrap();
    assert!(core.pump().await);

    assert_eq!(
        core.connection(),
        &ConnectionState::Connected("0xbbb0000000000000000000000000000000000002".to_string())
    );
    assert_eq!(core.status(), &Status::ReadyToWrite);
}

#[tokio::test]
async fn current_accounts_resumes_without_prompting() {
    let (mut provider, _accounts) = ScriptedProvider::approving("0xaaa0000000000000000000000000000000000001");

    let authorized = provider.current_accounts().await.unwrap();
    assert_eq!(
        authorized,
        vec!["0xaaa0000000000000000000000000000000000001".to_string()]
    );

    let mut absent = ScriptedProvider::absent();
    assert_eq!(
        absent.current_accounts().await,
        Err(GatewayError::NoProvider)
    );
}

#[tokio::test]
async fn teardown_releases_subscriptions_and_late_events_are_noops() {
    let (provider, accounts) = ScriptedProvider::approving("0xaaa0000000000000000000000000000000000001");
    let (contract, events, _log) = ScriptedContract::holding("start");
    let mut core = SyncCore::new(provider, contract);
    core.initialize().await;

    core.close();

    // Senders observe the closed channels; anything sent after teardown is lost
    assert!(accounts.send(vec![]).is_err());
    assert!(events
        .send(MessageUpdate {
            actor: "0xaaa0000000000000000000000000000000000001".to_string(),
            value: "late".to_string(),
        })
        .is_err());
    assert_eq!(core.current_message(), "start");
    assert!(!core.pump().await);
}
