//! Core WebSocket infrastructure.
//!
//! This module owns the connection lifecycle for the SafeFace realtime feed:
//! establishing the transport, reporting state transitions and inbound frames
//! to the caller, and bounded automatic reconnection with a fixed interval.
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: owns at most one live transport and the
//!   reconnection policy; driven by commands, observed through handler slots
//!   and polled state
//! - [`Connector`]/[`Transport`]: the transport seam, so the policy is
//!   testable without a network
//!
//! Payloads are delivered unparsed; [`crate::messages`] is the consumer-side
//! typing of SafeFace server events.

pub mod config;
pub mod connection;
pub mod error;
pub mod transport;

pub use config::Config;
pub use connection::{ConnectionManager, ConnectionState, EventHandlers};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use transport::{Connector, Transport, WsConnector};
