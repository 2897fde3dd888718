//! The mesh wire format — a single chat payload shared by every node.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One chat message as it travels between nodes.
///
/// The wire form is a JSON object with exactly two fields:
/// `{"sender": "...", "message": "..."}`. Anything on the messaging port
/// that does not decode to this shape is treated as a protocol violation
/// by the receiving side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name of the originating node.
    pub sender: String,
    /// The message text as typed.
    pub message: String,
}

impl ChatMessage {
    /// Create a message from a sender name and text.
    pub fn new(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            message: message.into(),
        }
    }

    /// Serialize the message to a JSON string for transmission.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a message from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// The local rendering used when a message is shown to the operator.
impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sender, self.message)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
