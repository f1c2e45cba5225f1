//! Bot behavior state machines served over HTTP.
//!
//! [`engine`] holds the per-bot finite state machine and the registry that
//! owns bots. [`api`] exposes them as a JSON API plus a WebSocket event feed.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod metrics;
