//! Messages API response shapes.
//!
//! Assistant content is kept as raw JSON so server-side tool blocks can be
//! sent back verbatim on the next turn. Only the block kinds the oracle acts
//! on are decoded.

use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub content: Vec<Value>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

/// Decoded view of one content block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    pub fn blocks(&self) -> Vec<ContentBlock> {
        self.content
            .iter()
            .map(|v| serde_json::from_value(v.clone()).unwrap_or(ContentBlock::Other))
            .collect()
    }

    /// Input of the first client tool call named `name`.
    pub fn tool_input(&self, name: &str) -> Option<Value> {
        self.blocks().into_iter().find_map(|block| match block {
            ContentBlock::ToolUse {
                name: called, input, ..
            } if called == name => Some(input),
            _ => None,
        })
    }

    /// Client tool calls other than `except`, as `(id, name, input)`.
    pub fn tool_calls(&self, except: &str) -> Vec<(String, String, Value)> {
        self.blocks()
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } if name != except => {
                    Some((id, name, input))
                }
                _ => None,
            })
            .collect()
    }

    pub fn text(&self) -> String {
        self.blocks()
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// This response as an assistant turn for the follow-up request.
    pub fn assistant_message(&self) -> Value {
        json!({ "role": "assistant", "content": self.content })
    }
}

pub fn user_message(content: impl Into<Value>) -> Value {
    json!({ "role": "user", "content": content.into() })
}

pub fn tool_result(tool_use_id: &str, content: &str, is_error: bool) -> Value {
    json!({
        "type": "tool_result",
        "tool_use_id": tool_use_id,
        "content": content,
        "is_error": is_error,
    })
}
