//! Classification of raw mesh stream messages.
//!
//! Rules, per message:
//! - `AI` overwrites the final-answer candidate; the last one seen wins.
//! - `AGENT` / `AGENT_TOOL_RESULT` produce a trace step carrying the
//!   message's origin trace.
//! - Every message additionally produces a log line summarizing the
//!   current origin trace. The log feed is deliberately a superset of the
//!   trace feed.
//! - A message without a `response` payload degrades to a diagnostic log
//!   line; it never aborts the turn.

use crate::mesh::proto::{ChatMessageType, ChatResponse};
use crate::ws::types::TraceFrame;

/// A typed event extracted from one raw stream message.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedEvent {
    /// Goes to the scope's log feed.
    Log { message: String },
    /// Goes to the scope's internal-trace feed.
    Trace(TraceFrame),
}

/// Per-turn classifier state.
#[derive(Debug, Default)]
pub struct TurnClassifier {
    final_answer: Option<String>,
    last_otrace: Vec<String>,
}

impl TurnClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one raw message, returning the events to publish in order.
    pub fn observe(&mut self, msg: &ChatResponse) -> Vec<ClassifiedEvent> {
        let Some(response) = msg.response.as_ref() else {
            return vec![ClassifiedEvent::Log {
                message: "received runtime message with no response payload".to_string(),
            }];
        };

        self.last_otrace = response.origin.iter().map(|o| o.tool.clone()).collect();

        let mut events = Vec::with_capacity(2);
        events.push(ClassifiedEvent::Log {
            message: serde_json::json!({ "otrace": self.last_otrace }).to_string(),
        });

        match response.r#type() {
            ChatMessageType::Ai => {
                self.final_answer = Some(response.text.clone());
            }
            ChatMessageType::Agent | ChatMessageType::AgentToolResult => {
                events.push(ClassifiedEvent::Trace(TraceFrame {
                    otrace: self.last_otrace.clone(),
                    text: response.text.clone(),
                }));
            }
            ChatMessageType::Human | ChatMessageType::Other => {}
        }

        events
    }

    /// The turn's final answer, if any non-empty AI message was seen.
    pub fn finish(self) -> Option<String> {
        self.final_answer.filter(|text| !text.is_empty())
    }
}
