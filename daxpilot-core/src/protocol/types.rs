//! Wire types for the OpenAI-compatible Foundry Local endpoint
//!
//! Only the fields daxpilot sends or reads are modelled. Unknown response
//! fields are ignored so that different local model servers can be used.

use serde::{Deserialize, Deserializer, Serialize};

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions that guide the model's behavior
    System,
    /// User input message
    User,
    /// Assistant (model) response
    Assistant,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Text content of the message; `null` reads as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChatRequest {
    /// Model identifier to use
    pub model: String,

    /// Messages in the conversation
    pub messages: Vec<Message>,

    /// Sampling temperature (0.0 to 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Nucleus sampling parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

/// Complete chat response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Unique response ID
    #[serde(default)]
    pub id: String,

    /// Model used for generation
    #[serde(default)]
    pub model: String,

    /// Response choices
    #[serde(default)]
    pub choices: Vec<ResponseChoice>,

    /// Token usage information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<CompletionUsage>,
}

/// Response choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseChoice {
    /// Choice index
    #[serde(default)]
    pub index: usize,

    /// Generated message
    pub message: Message,

    /// Finish reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,

    /// Total tokens used
    pub total_tokens: u32,
}

/// Response of `GET /models`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelEntry>,
}

/// One entry of the model listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

impl ChatRequest {
    /// Create a new chat request
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set top_p
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

impl ChatResponse {
    /// Build a single-choice response, used by the demo backend
    pub fn from_text(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: format!("demo-{}", uuid::Uuid::new_v4()),
            model: model.into(),
            choices: vec![ResponseChoice {
                index: 0,
                message: Message::assistant(content),
                finish_reason: Some("stop".to_string()),
            }],
            usage: None,
        }
    }

    /// Content of the first choice, if any
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|choice| choice.message.content.as_str())
    }
}

impl ModelList {
    /// Model ids in sorted order
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.data.iter().map(|m| m.id.clone()).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization_skips_unset_fields() {
        let request = ChatRequest::new("phi-3-mini", vec![Message::user("hi")]);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"model": "phi-3-mini", "messages": [{"role": "user", "content": "hi"}]})
        );
    }

    #[test]
    fn test_request_builder() {
        let request = ChatRequest::new("qwen", vec![Message::system("s"), Message::user("u")])
            .with_temperature(0.3)
            .with_max_tokens(500)
            .with_top_p(0.9);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["max_tokens"], 500);
        assert_eq!(value["messages"][0]["role"], "system");
    }

    #[test]
    fn test_response_tolerates_missing_fields() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "EVALUATE ROW(\"x\", 1)"}}],
            "created": 1700000000
        }))
        .unwrap();
        assert_eq!(response.first_content(), Some("EVALUATE ROW(\"x\", 1)"));
    }

    #[test]
    fn test_response_with_null_content() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert_eq!(response.first_content(), Some(""));
    }

    #[test]
    fn test_model_list_sorted() {
        let list: ModelList = serde_json::from_value(json!({
            "data": [{"id": "qwen2.5-7b"}, {"id": "phi-3.5-mini"}]
        }))
        .unwrap();
        assert_eq!(list.sorted_ids(), vec!["phi-3.5-mini", "qwen2.5-7b"]);
    }
}
