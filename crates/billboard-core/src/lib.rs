//! Billboard Core Library
//!
//! This crate provides the client-side synchronization core for billboard,
//! a single shared message stored in a smart contract.
//!
//! # Architecture
//!
//! - **Gateways**: narrow adapters over the wallet provider and the deployed
//!   contract, abstracted as traits so hosts and tests can substitute them
//! - **SyncCore**: the state machine that owns connection and message state
//!   and reconciles asynchronous gateway notifications into one view
//! - **ViewModel**: a pure projection of core state for any front end
//!
//! The contract's value is public-readable, so message state is tracked
//! independently of connection state: a client with no wallet can still
//! display the current message.
//!
//! # Quick Start
//!
//! ```text
//! let mut core = SyncCore::new(provider, contract);
//! core.initialize().await;
//!
//! core.set_pending("hello");
//! core.submit().await;
//!
//! // Apply confirmations and account changes as they arrive
//! while core.pump().await {
//!     render(&core.view());
//! }
//! ```
//!
//! # Modules
//!
//! - `config`: Application configuration
//! - `error`: Gateway error taxonomy
//! - `gateway`: Provider and contract gateway traits
//! - `sync`: Connection/message state machine (main entry point)
//! - `view`: View-model projection

pub mod config;
pub mod error;
pub mod gateway;
pub mod sync;
pub mod view;

pub use config::{Config, ContractBinding};
pub use error::GatewayError;
pub use gateway::{Account, ContractGateway, MessageUpdate, ProviderGateway};
pub use sync::{ConnectionState, MessageState, Status, SyncCore};
pub use view::{project, ViewModel};
