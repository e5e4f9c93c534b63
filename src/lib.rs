#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod error;
pub mod messages;
pub mod session;
pub mod ws;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// localStorage key the SafeFace web frontend keeps its session token under.
///
/// Embedders bridging an existing web session into this client can read the
/// token from this key and feed it to a [`session::TokenStore`].
pub const SESSION_TOKEN_KEY: &str = "safeface_token";

pub use crate::messages::{DetectionAlert, Notification, ServerEvent, Severity};
pub use crate::session::{MemoryTokenStore, TokenStore};
pub use crate::ws::{Config, ConnectionManager, ConnectionState, EventHandlers};
