//! Foundry Local chat backend
//!
//! [`ChatCompletion`] is the seam the chat session and the DAX generator
//! talk through; [`FoundryClient`] implements it against the local
//! OpenAI-compatible server.

pub mod client;

use crate::error::ServiceResult;
use crate::protocol::{ChatRequest, ChatResponse};
use async_trait::async_trait;

pub use client::{FoundryClient, FALLBACK_MODELS};

/// Anything that can answer a chat completion request
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Send the conversation and return the model's answer
    async fn complete(&self, request: ChatRequest) -> ServiceResult<ChatResponse>;
}
