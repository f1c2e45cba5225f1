use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::config::BOT_ID_PREFIX;
use super::error::BotError;

/// Registry-assigned bot identifier. Displays as `bot_<n>`; `n` starts at 1
/// and is never reused within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BotId(u64);

impl BotId {
    pub fn new(sequence: u64) -> Self {
        BotId(sequence)
    }

    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", BOT_ID_PREFIX, self.0)
    }
}

impl FromStr for BotId {
    type Err = BotError;

    /// Only the canonical form parses, so `bot_01` never aliases `bot_1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .strip_prefix(BOT_ID_PREFIX)
            .and_then(|n| n.parse::<u64>().ok())
            .map(BotId)
            .ok_or_else(|| BotError::not_found(s))?;
        if id.to_string() != s {
            return Err(BotError::not_found(s));
        }
        Ok(id)
    }
}

impl Serialize for BotId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
