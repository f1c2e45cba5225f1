//! Bot behavior engine: rule tables, the per-bot state machine, and the
//! registry that owns bots.

pub mod bot;
pub mod clock;
pub mod config;
pub mod error;
pub mod id;
pub mod registry;
pub mod rules;
pub mod state;

pub use bot::{Bot, BotSnapshot, HealthChange, Perception};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::BotError;
pub use id::BotId;
pub use registry::{lock_bot, BotHandle, BotRegistry};
pub use state::BotState;
