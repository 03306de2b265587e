//! JSON-RPC 2.0 over WebSocket
//!
//! One transport per endpoint. A writer task drains an outgoing queue and a
//! reader task routes every incoming frame: responses by request id to their
//! waiting callers, `eth_subscription` notifications by subscription id, and
//! bare method notifications (such as `accountsChanged`) by method name.
//!
//! The transport owns its own timeout policy; the sync core above it never
//! imposes one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

/// Errors from the RPC transport
#[derive(Error, Debug)]
pub enum RpcError {
    /// Could not reach the endpoint at all
    #[error("Failed to reach {url}: {detail}")]
    Unreachable { url: String, detail: String },

    /// The connection closed while a call was outstanding
    #[error("Transport closed")]
    Closed,

    /// No response arrived within the transport timeout
    #[error("Timed out waiting for a response to {method}")]
    Timeout { method: String },

    /// The endpoint answered with a JSON-RPC error object
    #[error("{method} failed with code {code}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    /// The endpoint answered with something that is not a response
    #[error("Unexpected response shape for {method}: {detail}")]
    Malformed { method: String, detail: String },
}

impl RpcError {
    /// The JSON-RPC error code, when the endpoint supplied one
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// An incoming frame, classified for routing
#[derive(Debug)]
enum Frame {
    Response { id: u64, payload: Value },
    Subscription { id: String, result: Value },
    Notification { method: String, params: Value },
    Unroutable,
}

impl Frame {
    fn classify(mut value: Value) -> Frame {
        if let Some(id) = value.get("id").and_then(Value::as_u64) {
            return Frame::Response { id, payload: value };
        }

        let Some(method) = value.get("method").and_then(Value::as_str).map(String::from) else {
            return Frame::Unroutable;
        };
        let params = value
            .get_mut("params")
            .map(Value::take)
            .unwrap_or(Value::Null);

        if method == "eth_subscription" {
            let id = params
                .get("subscription")
                .and_then(Value::as_str)
                .map(String::from);
            let result = params.get("result").cloned();
            return match (id, result) {
                (Some(id), Some(result)) => Frame::Subscription { id, result },
                _ => Frame::Unroutable,
            };
        }

        Frame::Notification { method, params }
    }
}

struct PendingCall {
    method: String,
    reply: oneshot::Sender<Result<Value, RpcError>>,
}

type Pending = Arc<Mutex<HashMap<u64, PendingCall>>>;
type Routes = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Value>>>>;

/// A shared handle to one JSON-RPC WebSocket connection
#[derive(Clone)]
pub struct RpcTransport {
    out_tx: mpsc::UnboundedSender<String>,
    pending: Pending,
    subscriptions: Routes,
    notifications: Routes,
    next_id: Arc<AtomicU64>,
    call_timeout: Duration,
}

impl RpcTransport {
    /// Connect to a JSON-RPC WebSocket endpoint
    pub async fn connect(url: &str, call_timeout: Duration) -> Result<Self, RpcError> {
        debug!("Connecting to {url}");
        let (ws_stream, _response) =
            connect_async(url).await.map_err(|e| RpcError::Unreachable {
                url: url.to_string(),
                detail: e.to_string(),
            })?;
        let (mut write, read) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            while let Some(text) = out_rx.recv().await {
                if write.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = write.close().await;
        });

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let subscriptions: Routes = Arc::new(Mutex::new(HashMap::new()));
        let notifications: Routes = Arc::new(Mutex::new(HashMap::new()));
        tokio::spawn(read_loop(
            read,
            pending.clone(),
            subscriptions.clone(),
            notifications.clone(),
        ));

        Ok(Self {
            out_tx,
            pending,
            subscriptions,
            notifications,
            next_id: Arc::new(AtomicU64::new(1)),
            call_timeout,
        })
    }

    /// Issue a request and await its response
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().await.insert(
            id,
            PendingCall {
                method: method.to_string(),
                reply: reply_tx,
            },
        );

        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        })
        .to_string();
        if self.out_tx.send(request).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(RpcError::Closed);
        }

        match tokio::time::timeout(self.call_timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RpcError::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(RpcError::Timeout {
                    method: method.to_string(),
                })
            }
        }
    }

    /// Open an `eth_subscribe` subscription, returning its event stream
    pub async fn subscribe(
        &self,
        params: Value,
    ) -> Result<mpsc::UnboundedReceiver<Value>, RpcError> {
        let result = self.call("eth_subscribe", params).await?;
        let sub_id = result
            .as_str()
            .ok_or_else(|| RpcError::Malformed {
                method: "eth_subscribe".to_string(),
                detail: "subscription id is not a string".to_string(),
            })?
            .to_string();

        debug!("Subscription {sub_id} established");
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscriptions.lock().await.insert(sub_id, tx);
        Ok(rx)
    }

    /// Receive bare notifications pushed with the given method name
    pub async fn notifications(&self, method: &str) -> mpsc::UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.notifications
            .lock()
            .await
            .insert(method.to_string(), tx);
        rx
    }
}

async fn read_loop(
    mut read: SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    pending: Pending,
    subscriptions: Routes,
    notifications: Routes,
) {
    while let Some(frame) = read.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(data)) => match String::from_utf8(data) {
                Ok(text) => text,
                Err(_) => {
                    warn!("Dropping non-UTF-8 binary frame");
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                warn!("WebSocket error: {err}");
                break;
            }
        };

        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            warn!("Dropping frame that is not JSON");
            continue;
        };

        match Frame::classify(value) {
            Frame::Response { id, payload } => {
                let Some(call) = pending.lock().await.remove(&id) else {
                    debug!("Response for unknown request id {id}");
                    continue;
                };
                let _ = call.reply.send(decode_response(&call.method, payload));
            }
            Frame::Subscription { id, result } => {
                let mut subs = subscriptions.lock().await;
                let delivered = subs
                    .get(&id)
                    .map(|tx| tx.send(result).is_ok())
                    .unwrap_or(false);
                if !delivered {
                    subs.remove(&id);
                    debug!("Dropping event for closed subscription {id}");
                }
            }
            Frame::Notification { method, params } => {
                let routed = notifications
                    .lock()
                    .await
                    .get(&method)
                    .map(|tx| tx.send(params).is_ok())
                    .unwrap_or(false);
                if !routed {
                    debug!("Unrouted notification: {method}");
                }
            }
            Frame::Unroutable => debug!("Dropping unroutable frame"),
        }
    }

    // Endpoint is gone: fail outstanding calls and end every stream
    for (_, call) in pending.lock().await.drain() {
        let _ = call.reply.send(Err(RpcError::Closed));
    }
    subscriptions.lock().await.clear();
    notifications.lock().await.clear();
}

/// Split a raw response into its result or its error object
fn decode_response(method: &str, mut payload: Value) -> Result<Value, RpcError> {
    if let Some(error) = payload.get("error") {
        return Err(RpcError::Rpc {
            method: method.to_string(),
            code: error.get("code").and_then(Value::as_i64).unwrap_or(-1),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    payload
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| RpcError::Malformed {
            method: method.to_string(),
            detail: "neither result nor error present".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_response() {
        let frame = Frame::classify(json!({"jsonrpc": "2.0", "id": 7, "result": "0x1"}));
        assert!(matches!(frame, Frame::Response { id: 7, .. }));
    }

    #[test]
    fn test_classify_subscription_event() {
        let frame = Frame::classify(json!({
            "jsonrpc": "2.0",
            "method": "eth_subscription",
            "params": {"subscription": "0xcd0c3e8af590364c09d0fa6a1210faf5", "result": {"data": "0x"}},
        }));
        match frame {
            Frame::Subscription { id, result } => {
                assert_eq!(id, "0xcd0c3e8af590364c09d0fa6a1210faf5");
                assert_eq!(result, json!({"data": "0x"}));
            }
            other => panic!("expected subscription frame, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_bare_notification() {
        let frame = Frame::classify(json!({
            "jsonrpc": "2.0",
            "method": "accountsChanged",
            "params": [["0xabc"]],
        }));
        match frame {
            Frame::Notification { method, params } => {
                assert_eq!(method, "accountsChanged");
                assert_eq!(params, json!([["0xabc"]]));
            }
            other => panic!("expected notification frame, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_garbage() {
        assert!(matches!(Frame::classify(json!({"foo": 1})), Frame::Unroutable));
        assert!(matches!(
            Frame::classify(json!({"method": "eth_subscription", "params": {}})),
            Frame::Unroutable
        ));
    }

    #[test]
    fn test_decode_response_result() {
        let payload = json!({"jsonrpc": "2.0", "id": 1, "result": ["0xabc"]});
        assert_eq!(
            decode_response("eth_accounts", payload).unwrap(),
            json!(["0xabc"])
        );
    }

    #[test]
    fn test_decode_response_error() {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": 4001, "message": "User rejected the request."},
        });
        let err = decode_response("eth_requestAccounts", payload).unwrap_err();
        assert_eq!(err.code(), Some(4001));
        assert!(err.to_string().contains("User rejected"));
    }

    #[test]
    fn test_decode_response_missing_result() {
        let payload = json!({"jsonrpc": "2.0", "id": 1});
        assert!(matches!(
            decode_response("eth_call", payload),
            Err(RpcError::Malformed { .. })
        ));
    }
}
