//! Engine-level errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BotError {
    #[error("Bot '{id}' not found")]
    NotFound { id: String },

    #[error("{field} must not be negative (got {amount})")]
    NegativeAmount { field: &'static str, amount: i64 },

    #[error("initial_health must be positive (got {0})")]
    InvalidInitialHealth(i64),

    #[error("player_distance must be a finite, non-negative number (got {0})")]
    InvalidDistance(f64),
}

impl BotError {
    pub fn not_found(id: impl Into<String>) -> Self {
        BotError::NotFound { id: id.into() }
    }

    /// Whether the error is caller misuse rather than a missing entity.
    pub fn is_validation(&self) -> bool {
        !matches!(self, BotError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_echoes_id() {
        let err = BotError::not_found("bot_42");
        assert_eq!(err.to_string(), "Bot 'bot_42' not found");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_negative_amount_message() {
        let err = BotError::NegativeAmount {
            field: "damage",
            amount: -5,
        };
        assert_eq!(err.to_string(), "damage must not be negative (got -5)");
        assert!(err.is_validation());
    }
}
