//! Frame types exchanged with the browser.
//!
//! These define the JSON protocol on the chat, internal-trace and log
//! channels. Shapes are part of the frontend contract and must not change
//! without coordinating with it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Log source tag for lines produced by this backend.
pub const SOURCE_BACKEND: &str = "swarmdeck";

/// Log source tag for lines derived from mesh runtime traffic.
pub const SOURCE_MESH: &str = "mesh";

/// Inbound command on the chat channel.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCommand {
    /// User message text. Empty text is a no-op.
    #[serde(default)]
    pub message: String,
    /// Optional structured side payload forwarded to the runtime untouched.
    #[serde(default)]
    pub sly_data: Option<Value>,
}

/// One line on a scope's log feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogFrame {
    /// Human-readable UTC timestamp, second precision.
    pub timestamp: String,
    pub message: String,
    pub source: String,
}

impl LogFrame {
    pub fn new(message: impl Into<String>, source: &str) -> Self {
        Self {
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            message: message.into(),
            source: source.to_string(),
        }
    }
}

/// One step on a scope's internal-trace feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    /// Ordered list of agent names that handled the message.
    pub otrace: Vec<String>,
    pub text: String,
}

/// Outbound frame on the chat channel.
///
/// Exactly one of these is sent per turn: the final answer when the
/// runtime produced one, or an error acknowledgment when the turn failed.
/// A turn that completes without an AI message sends nothing.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ChatFrame {
    Message { message: ChatMessageBody },
    Error { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessageBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ChatFrame {
    pub fn ai(text: impl Into<String>) -> Self {
        Self::Message {
            message: ChatMessageBody {
                kind: "AI".to_string(),
                text: text.into(),
            },
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_frame_ai_shape() {
        let json = serde_json::to_value(ChatFrame::ai("Hi there")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"message": {"type": "AI", "text": "Hi there"}})
        );
    }

    #[test]
    fn chat_frame_error_shape() {
        let json = serde_json::to_value(ChatFrame::error("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"error": "boom"}));
    }

    #[test]
    fn log_frame_timestamp_is_second_precision() {
        let frame = LogFrame::new("hello", SOURCE_BACKEND);
        // "YYYY-MM-DD HH:MM:SS"
        assert_eq!(frame.timestamp.len(), 19);
        assert_eq!(frame.source, "swarmdeck");
    }

    #[test]
    fn chat_command_tolerates_missing_fields() {
        let cmd: ChatCommand = serde_json::from_str("{}").unwrap();
        assert!(cmd.message.is_empty());
        assert!(cmd.sly_data.is_none());
    }
}
