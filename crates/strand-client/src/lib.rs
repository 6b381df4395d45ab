//! # strand-client
//!
//! Connection and session management for the Strand search client: keeps a
//! live channel open to the remote search service, streams debounced query
//! strings to it, and exposes the most recent result set.
//!
//! Three collaborating pieces, leaf-first:
//!
//! - [`ChannelSession`]: owns one logical WebSocket connection, exposes its
//!   lifecycle state, delivers parsed inbound result sets, and reconnects
//!   with capped exponential backoff until torn down
//! - [`QueryDispatcher`]: converts a rapid stream of input changes into at
//!   most one send per settled pause in typing
//! - [`ReactiveSearchController`]: composes the two and exposes the minimal
//!   surface the presentation layer consumes — connection state, result
//!   set, and `on_input_changed`

#![deny(unsafe_code)]

pub mod controller;
pub mod dispatch;
pub mod errors;
pub mod session;

pub use controller::{ClientConfig, ReactiveSearchController};
pub use dispatch::{DEFAULT_DEBOUNCE, QueryDispatcher};
pub use errors::SessionError;
pub use session::{ChannelSession, SessionHandle};
