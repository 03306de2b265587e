//! Connection/message sync state machine
//!
//! Owns the wallet connection state, the message state, and the latest
//! status, and reconciles gateway calls and asynchronous notifications into
//! one authoritative view.
//!
//! ## Lifecycle
//!
//! 1. Create one [`SyncCore`] per UI session
//! 2. `initialize()` - reset, connect, read the current value, subscribe
//! 3. Drive it from UI events (`connect`, `set_pending`, `submit`) and from
//!    the notification streams (`pump`)
//! 4. `close()` on teardown releases both subscriptions

mod core;
mod state;

pub use self::core::SyncCore;
pub use state::{ConnectionState, MessageState, Status};
