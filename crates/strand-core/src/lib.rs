//! # strand-core
//!
//! Foundation types for the Strand search client.
//!
//! This crate provides the shared vocabulary the other Strand crates depend on:
//!
//! - **Connection lifecycle**: [`ConnectionState`] and [`SessionEvent`] with a
//!   single transition function driving the whole state machine
//! - **Wire types**: [`SearchResult`] and the inbound payload parser
//! - **Backoff**: [`BackoffConfig`] and the capped exponential delay math

#![deny(unsafe_code)]

pub mod backoff;
pub mod results;
pub mod state;

pub use backoff::{BackoffConfig, reconnect_delay};
pub use results::{SearchResult, parse_result_set};
pub use state::{ConnectionState, SessionEvent};
