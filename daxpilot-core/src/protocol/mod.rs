//! Protocol module for chat-completion request/response structures
//!
//! These structures mirror the OpenAI-compatible API served by Foundry Local
//! and are shared by the chat session and the DAX generator.

pub mod types;

pub use types::{
    ChatRequest, ChatResponse, CompletionUsage, Message, MessageRole, ModelEntry, ModelList,
    ResponseChoice,
};
