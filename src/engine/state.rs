use std::fmt;

use serde::{Deserialize, Serialize};

/// Behavior mode of a bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotState {
    Idle,
    Patrol,
    Chase,
    Attack,
    Flee,
    /// Terminal: only an explicit reset leaves it.
    Dead,
}

impl BotState {
    pub const ALL: [BotState; 6] = [
        BotState::Idle,
        BotState::Patrol,
        BotState::Chase,
        BotState::Attack,
        BotState::Flee,
        BotState::Dead,
    ];

    /// Lowercase wire name, also used as a metrics label.
    pub fn as_str(&self) -> &'static str {
        match self {
            BotState::Idle => "idle",
            BotState::Patrol => "patrol",
            BotState::Chase => "chase",
            BotState::Attack => "attack",
            BotState::Flee => "flee",
            BotState::Dead => "dead",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BotState::Dead)
    }
}

impl fmt::Display for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
