//! Billboard RPC gateways
//!
//! JSON-RPC-over-WebSocket implementations of the billboard-core gateway
//! traits, speaking to two endpoints:
//!
//! - a **wallet provider** endpoint for account access, the account-change
//!   stream, and transaction signing
//! - a **node** endpoint for contract reads and the update-event stream
//!
//! # Modules
//!
//! - `abi`: minimal calldata/log encoding for the one-string contract
//! - `contract`: ContractGateway over node + wallet endpoints
//! - `provider`: ProviderGateway over the wallet endpoint
//! - `transport`: shared JSON-RPC WebSocket transport

pub mod abi;
pub mod contract;
pub mod provider;
pub mod transport;

pub use contract::ContractRpc;
pub use provider::WalletRpc;
pub use transport::{RpcError, RpcTransport};
