// Bot event feed: fans engine events out to WebSocket observers.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::engine::{BotSnapshot, BotState};

/// Messages sent to event feed subscribers.
#[derive(Clone, Serialize, Debug)]
#[serde(tag = "type")]
pub enum BotEvent {
    /// Sent once to each new subscriber before the live feed.
    #[serde(rename = "bots_list")]
    BotsList { bots: Vec<BotSnapshot> },
    #[serde(rename = "bot_created")]
    Created { state: BotSnapshot },
    /// Only emitted on an actual state change.
    #[serde(rename = "bot_transition")]
    Transition {
        bot_id: String,
        from: BotState,
        to: BotState,
        reason: String,
    },
    /// Health changed or the bot was reset.
    #[serde(rename = "bot_updated")]
    Updated { state: BotSnapshot },
    #[serde(rename = "bot_removed")]
    Removed { bot_id: String },
    #[serde(rename = "bots_reset")]
    AllReset { bot_count: usize },
}

impl BotEvent {
    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!("Failed to serialize bot event: {e}");
                None
            }
        }
    }
}

/// Broadcast hub for JSON-encoded bot events.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<String>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events. Returns a receiver that yields JSON strings.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: &BotEvent) {
        if let Some(json) = event.to_json() {
            let _ = self.tx.send(json);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
