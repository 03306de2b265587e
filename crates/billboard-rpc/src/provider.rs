//! Wallet provider gateway over JSON-RPC
//!
//! Talks to a wallet endpoint speaking the provider RPC surface:
//! `eth_requestAccounts` to connect, `eth_accounts` to query, a permissions
//! revocation for reset, and `accountsChanged` push notifications for the
//! account stream. Presence of the endpoint is detected once at
//! construction; an absent endpoint makes every operation report
//! `NoProvider` and is never re-probed.

use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{info, warn};

use billboard_core::{Account, Config, GatewayError, ProviderGateway};

use crate::transport::{RpcError, RpcTransport};

/// EIP-1193 user rejection code
const USER_REJECTED: i64 = 4001;
/// JSON-RPC method-not-found code
const METHOD_NOT_FOUND: i64 = -32601;

/// ProviderGateway implementation over a wallet RPC endpoint
pub struct WalletRpc {
    transport: Option<RpcTransport>,
    account_events: Option<mpsc::UnboundedReceiver<Vec<Account>>>,
}

impl WalletRpc {
    /// Probe the configured wallet endpoint once
    ///
    /// An unreachable endpoint is not an error here: it produces a gateway
    /// whose operations report `NoProvider`, which the sync core maps to the
    /// terminal `Unavailable` state.
    pub async fn detect(config: &Config) -> Self {
        let timeout = Duration::from_secs(config.call_timeout_secs);
        match RpcTransport::connect(&config.wallet_url, timeout).await {
            Ok(transport) => {
                let raw = transport.notifications("accountsChanged").await;
                Self {
                    transport: Some(transport),
                    account_events: Some(spawn_account_decoder(raw)),
                }
            }
            Err(err) => {
                info!("No wallet provider at {}: {err}", config.wallet_url);
                Self {
                    transport: None,
                    account_events: None,
                }
            }
        }
    }

    /// Handle to the wallet transport, for callers that route signing
    /// requests through the wallet (contract submissions)
    pub fn transport_handle(&self) -> Option<RpcTransport> {
        self.transport.clone()
    }

    fn transport(&self) -> Result<&RpcTransport, GatewayError> {
        self.transport.as_ref().ok_or(GatewayError::NoProvider)
    }
}

impl ProviderGateway for WalletRpc {
    async fn reset(&mut self) -> Result<(), GatewayError> {
        let transport = self.transport()?;
        match transport
            .call("wallet_revokePermissions", json!([{"eth_accounts": {}}]))
            .await
        {
            Ok(_) => Ok(()),
            // Wallets without permission revocation have no session to drop
            Err(RpcError::Rpc {
                code: METHOD_NOT_FOUND,
                ..
            }) => Ok(()),
            Err(err) => Err(provider_error(err)),
        }
    }

    async fn connect(&mut self) -> Result<Account, GatewayError> {
        let transport = self.transport()?;
        let result = transport
            .call("eth_requestAccounts", json!([]))
            .await
            .map_err(provider_error)?;

        account_list(&result)
            .and_then(|accounts| accounts.into_iter().next())
            .ok_or_else(|| GatewayError::Provider("no account was authorized".to_string()))
    }

    async fn current_accounts(&mut self) -> Result<Vec<Account>, GatewayError> {
        let transport = self.transport()?;
        let result = transport
            .call("eth_accounts", json!([]))
            .await
            .map_err(provider_error)?;

        account_list(&result)
            .ok_or_else(|| GatewayError::Provider("malformed account list".to_string()))
    }

    fn take_account_events(&mut self) -> Option<mpsc::UnboundedReceiver<Vec<Account>>> {
        self.account_events.take()
    }
}

/// Map transport failures onto the gateway taxonomy
fn provider_error(err: RpcError) -> GatewayError {
    if err.code() == Some(USER_REJECTED) {
        GatewayError::UserRejected
    } else {
        GatewayError::Provider(err.to_string())
    }
}

/// Decode a JSON array of account address strings
fn account_list(value: &Value) -> Option<Vec<Account>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(String::from))
        .collect()
}

/// Decode `accountsChanged` notification params
///
/// Wallets disagree on whether the account array arrives bare or wrapped in
/// the params list, so both shapes are accepted.
fn accounts_changed_params(params: &Value) -> Option<Vec<Account>> {
    let outer = params.as_array()?;
    if let Some(inner) = outer.first().and_then(Value::as_array) {
        return inner
            .iter()
            .map(|item| item.as_str().map(String::from))
            .collect();
    }
    account_list(params)
}

/// Forward decoded account sets, dropping frames that do not parse
fn spawn_account_decoder(
    mut raw: mpsc::UnboundedReceiver<Value>,
) -> mpsc::UnboundedReceiver<Vec<Account>> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(params) = raw.recv().await {
            match accounts_changed_params(&params) {
                Some(accounts) => {
                    if tx.send(accounts).is_err() {
                        break;
                    }
                }
                None => warn!("Dropping malformed accountsChanged notification"),
            }
        }
    });
    rx
}
