//! Commentary entries, message text and event types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Maximum length for message text (64KB)
const MAX_MESSAGE_LEN: usize = 65536;

/// Maximum length for an event type (matches the VARCHAR(50) column)
const MAX_EVENT_TYPE_LEN: usize = 50;

/// Validated commentary message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageText(String);

impl MessageText {
    /// Create message text.
    ///
    /// # Rules
    /// - Must contain something other than whitespace
    /// - Max 64KB (65536 bytes)
    ///
    /// # Example
    /// ```
    /// use buzzer_core::models::MessageText;
    ///
    /// assert!(MessageText::new("Goal! 1-0").is_ok());
    /// assert!(MessageText::new("   ").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.trim().is_empty() {
            return Err(ValidationError::Empty { field: "message" });
        }
        if s.len() > MAX_MESSAGE_LEN {
            return Err(ValidationError::TooLong {
                field: "message",
                max: MAX_MESSAGE_LEN,
            });
        }
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Kind of play-by-play event.
///
/// The set is open: any short lowercase token is accepted, the constants
/// below are the ones the feed uses most.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    pub const PLAY: &'static str = "play";
    pub const SCORE: &'static str = "score";
    pub const FOUL: &'static str = "foul";
    pub const SUBSTITUTION: &'static str = "substitution";
    pub const TIMEOUT: &'static str = "timeout";
    pub const INJURY: &'static str = "injury";
    pub const PERIOD: &'static str = "period";

    /// Parse an event type token.
    ///
    /// Input is trimmed and lowercased; it must then be 1-50 characters of
    /// `[a-z0-9_-]`.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let token = s.trim().to_ascii_lowercase();
        if token.is_empty() {
            return Err(ValidationError::Empty { field: "event_type" });
        }
        if token.len() > MAX_EVENT_TYPE_LEN {
            return Err(ValidationError::TooLong {
                field: "event_type",
                max: MAX_EVENT_TYPE_LEN,
            });
        }
        if !token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(ValidationError::InvalidFormat {
                field: "event_type",
                reason: "only letters, digits, '_' and '-' are allowed",
            });
        }
        Ok(Self(token))
    }

    /// Parse an optional event type, falling back to `play` when absent.
    pub fn parse_or_default(s: Option<&str>) -> Result<Self, ValidationError> {
        s.map_or_else(|| Ok(Self::default()), Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventType {
    fn default() -> Self {
        Self(Self::PLAY.to_owned())
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Commentary record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentaryEntry {
    pub id: i64,
    pub game_id: i64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub created_at: DateTime<Utc>,
}

/// Validated input for a new commentary entry
#[derive(Debug, Clone)]
pub struct NewCommentary {
    pub game_id: i64,
    pub message: MessageText,
    pub event_type: EventType,
    /// Server-assigned event time
    pub timestamp: DateTime<Utc>,
}
