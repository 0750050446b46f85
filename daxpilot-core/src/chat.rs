//! Conversational chat over the routed local models

use crate::error::{ServiceError, ServiceResult};
use crate::foundry::ChatCompletion;
use crate::protocol::{ChatRequest, Message, MessageRole};
use crate::routing::{ModelRouter, RouteDecision};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// System prompt a new conversation starts with
pub const DEFAULT_SYSTEM_PROMPT: &str = "Answer clearly and concisely.";

/// How the model for the next prompt is chosen
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelSelection {
    /// Let the router decide per prompt
    #[default]
    Auto,
    /// Always use this model id
    Manual(String),
}

/// One entry of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    #[serde(flatten)]
    pub message: Message,

    /// Model that produced an assistant turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}

/// Answer to one prompt
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub content: String,
    pub model: String,
    /// Whether the answer is canned rather than generated
    pub demo: bool,
    /// Routing outcome when the model was picked automatically
    pub route: Option<RouteDecision>,
}

/// A conversation with history, model selection and demo mode
pub struct ChatSession {
    backend: Arc<dyn ChatCompletion>,
    router: ModelRouter,
    selection: ModelSelection,
    demo_mode: bool,
    system_prompt: String,
    history: Vec<ChatTurn>,
    last_model: Option<String>,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn ChatCompletion>, router: ModelRouter) -> Self {
        let system_prompt = DEFAULT_SYSTEM_PROMPT.to_string();
        Self {
            backend,
            router,
            selection: ModelSelection::Auto,
            demo_mode: false,
            history: vec![system_turn(&system_prompt)],
            system_prompt,
            last_model: None,
        }
    }

    pub fn with_selection(mut self, selection: ModelSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_demo_mode(mut self, demo_mode: bool) -> Self {
        self.demo_mode = demo_mode;
        self
    }

    pub fn set_selection(&mut self, selection: ModelSelection) {
        self.selection = selection;
    }

    pub fn set_demo_mode(&mut self, demo_mode: bool) {
        self.demo_mode = demo_mode;
    }

    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    /// Replace the system prompt, keeping the rest of the conversation
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
        match self.history.first_mut() {
            Some(turn) if turn.message.role == MessageRole::System => {
                turn.message.content = self.system_prompt.clone();
            }
            _ => self.history.insert(0, system_turn(&self.system_prompt)),
        }
    }

    /// Full conversation, system prompt first
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Drop everything but the system prompt
    pub fn clear(&mut self) {
        self.history = vec![system_turn(&self.system_prompt)];
        self.last_model = None;
    }

    /// Resolve the model for `prompt` according to the current selection
    pub fn resolve_model(&self, prompt: &str) -> ServiceResult<(String, Option<RouteDecision>)> {
        match &self.selection {
            ModelSelection::Manual(model) => Ok((model.clone(), None)),
            ModelSelection::Auto => {
                let decision = self.router.route(prompt)?;
                Ok((decision.model.clone(), Some(decision)))
            }
        }
    }

    /// Send a prompt and record the answer.
    ///
    /// The user turn stays in the history even when the call fails, so that
    /// [`ChatSession::demo_fallback`] can answer it.
    pub async fn ask(&mut self, prompt: &str) -> ServiceResult<ChatReply> {
        self.history.push(ChatTurn {
            message: Message::user(prompt),
            model_used: None,
        });

        let (model, route) = self.resolve_model(prompt)?;
        self.last_model = Some(model.clone());

        if self.demo_mode {
            let content = demo_reply(prompt, &model);
            self.record_assistant(&content, model.clone());
            return Ok(ChatReply {
                content,
                model,
                demo: true,
                route,
            });
        }

        let messages: Vec<Message> = self.history.iter().map(|t| t.message.clone()).collect();
        let request = ChatRequest::new(model.clone(), messages);

        let response = self.backend.complete(request).await.map_err(|e| {
            if e.is_connection_failure() {
                warn!("Model server unreachable while asking {}: {}", model, e);
            } else {
                warn!("Chat completion with {} failed: {}", model, e);
            }
            e
        })?;

        let content = response
            .first_content()
            .ok_or(ServiceError::EmptyCompletion)?
            .to_string();

        info!("Answered with {} ({} chars)", model, content.len());
        self.record_assistant(&content, model.clone());
        Ok(ChatReply {
            content,
            model,
            demo: false,
            route,
        })
    }

    /// Answer the last prompt with a canned reply after a failed call
    pub fn demo_fallback(&mut self) -> ServiceResult<ChatReply> {
        let model = self.last_model.clone().ok_or(ServiceError::NoViableModel)?;
        let content = format!(
            "[DEMO MODE] This is a simulated response from {}. In production, you would see a real response from the model.",
            model
        );
        self.record_assistant(&content, format!("{} (demo)", model));
        Ok(ChatReply {
            content,
            model,
            demo: true,
            route: None,
        })
    }

    fn record_assistant(&mut self, content: &str, model_used: String) {
        self.history.push(ChatTurn {
            message: Message::assistant(content),
            model_used: Some(model_used),
        });
    }
}

fn system_turn(prompt: &str) -> ChatTurn {
    ChatTurn {
        message: Message::system(prompt),
        model_used: None,
    }
}

/// Canned answer used in demo mode
pub fn demo_reply(prompt: &str, model: &str) -> String {
    format!(
        "**[DEMO MODE - Mock Response]**\n\n\
         This is a demonstration response showing how the app works. In production with \
         Foundry Local running, you would receive an actual AI-generated response here.\n\n\
         Query: \"{}\"\n\
         Model: {}\n\
         Status: Demo Mode Active\n\n\
         To use real responses:\n\
         1. Start Foundry Local service\n\
         2. Turn off Demo Mode\n\
         3. Refresh and try again",
        prompt, model
    )
}
