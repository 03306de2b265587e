//! Contract gateway over JSON-RPC
//!
//! Reads and event subscriptions go to the node endpoint; submissions go
//! through the wallet endpoint, which signs them. The update-event stream is
//! an `eth_subscribe("logs")` on the configured event topic, decoded into
//! `(actor, value)` pairs.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::warn;

use billboard_core::{Account, Config, ContractGateway, GatewayError, MessageUpdate};

use crate::abi::{self, Binding};
use crate::transport::{RpcError, RpcTransport};

/// EIP-1193 user rejection code
const USER_REJECTED: i64 = 4001;

/// ContractGateway implementation over node and wallet RPC endpoints
pub struct ContractRpc {
    node: RpcTransport,
    wallet: Option<RpcTransport>,
    binding: Binding,
    update_events: Option<mpsc::UnboundedReceiver<MessageUpdate>>,
}

impl ContractRpc {
    /// Connect to the node and subscribe to the contract's update events
    ///
    /// `wallet` carries signing requests; without it submissions fail (reads
    /// and events keep working, the value is public).
    pub async fn connect(config: &Config, wallet: Option<RpcTransport>) -> Result<Self> {
        let binding = Binding::from_config(&config.contract)
            .map_err(|err| anyhow!("Invalid contract binding: {err}"))?;

        let timeout = Duration::from_secs(config.call_timeout_secs);
        let node = RpcTransport::connect(&config.node_url, timeout)
            .await
            .with_context(|| format!("Failed to reach node at {}", config.node_url))?;

        let raw = node
            .subscribe(json!([
                "logs",
                {"address": &binding.address, "topics": [&binding.update_topic]}
            ]))
            .await
            .context("Failed to subscribe to contract events")?;

        Ok(Self {
            node,
            wallet,
            binding,
            update_events: Some(spawn_log_decoder(raw)),
        })
    }
}

impl ContractGateway for ContractRpc {
    async fn read_message(&mut self) -> Result<String, GatewayError> {
        let result = self
            .node
            .call(
                "eth_call",
                json!([
                    {"to": &self.binding.address, "data": self.binding.read_call()},
                    "latest"
                ]),
            )
            .await
            .map_err(|err| GatewayError::Read(err.to_string()))?;

        let payload = result
            .as_str()
            .ok_or_else(|| GatewayError::Read("non-string call result".to_string()))?;
        abi::decode_string_return(payload).map_err(|err| GatewayError::Read(err.to_string()))
    }

    async fn submit_update(&mut self, account: &Account, text: &str) -> Result<(), GatewayError> {
        if account.is_empty() {
            return Err(GatewayError::InvalidAccount);
        }
        let wallet = self
            .wallet
            .as_ref()
            .ok_or_else(|| GatewayError::Submission("no wallet to sign with".to_string()))?;

        wallet
            .call(
                "eth_sendTransaction",
                json!([{
                    "from": account,
                    "to": &self.binding.address,
                    "data": self.binding.update_call(text),
                }]),
            )
            .await
            .map(|_transaction_hash| ())
            .map_err(submission_error)
    }

    fn take_update_events(&mut self) -> Option<mpsc::UnboundedReceiver<MessageUpdate>> {
        self.update_events.take()
    }
}

/// Map transport failures onto the gateway taxonomy
fn submission_error(err: RpcError) -> GatewayError {
    if err.code() == Some(USER_REJECTED) {
        GatewayError::UserRejected
    } else {
        GatewayError::Submission(err.to_string())
    }
}

/// Forward decoded update events, dropping logs that do not parse
fn spawn_log_decoder(
    mut raw: mpsc::UnboundedReceiver<Value>,
) -> mpsc::UnboundedReceiver<MessageUpdate> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(log) = raw.recv().await {
            match abi::decode_update_log(&log) {
                Ok(update) => {
                    if tx.send(update).is_err() {
                        break;
                    }
                }
                Err(err) => warn!("Dropping undecodable contract log: {err}"),
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_rejection_mapping() {
        let rejected = RpcError::Rpc {
            method: "eth_sendTransaction".to_string(),
            code: 4001,
            message: "User denied transaction signature.".to_string(),
        };
        assert_eq!(submission_error(rejected), GatewayError::UserRejected);

        let nonce = RpcError::Rpc {
            method: "eth_sendTransaction".to_string(),
            code: -32000,
            message: "nonce too low".to_string(),
        };
        match submission_error(nonce) {
            GatewayError::Submission(detail) => assert!(detail.contains("nonce too low")),
            other => panic!("expected submission error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_log_decoder_forwards_valid_events() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut decoded = spawn_log_decoder(raw_rx);

        let actor = "1234567890abcdef1234567890abcdef12345678";
        raw_tx
            .send(json!({
                "topics": [
                    format!("0x{}", "ab".repeat(32)),
                    format!("0x{:0>64}", actor),
                ],
                "data": format!(
                    "0x{}{}{}",
                    format_args!("{:0>64}", "20"),
                    format_args!("{:0>64}", "2"),
                    format_args!("{:0<64}", "6869"),
                ),
            }))
            .unwrap();
        raw_tx.send(json!({"unexpected": "shape"})).unwrap();
        drop(raw_tx);

        assert_eq!(
            decoded.recv().await,
            Some(MessageUpdate {
                actor: format!("0x{actor}"),
                value: "hi".to_string(),
            })
        );
        assert_eq!(decoded.recv().await, None);
    }
}
