//! Prompt-to-model routing
//!
//! Two locally hosted models are available: a small fast one (Phi family)
//! and a larger powerful one (Qwen family). Prompts that look heavy go to
//! the powerful model; everything else goes to the fast one.

use crate::error::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Substrings that mark a prompt as needing the powerful model
pub const HEAVY_KEYWORDS: &[&str] = &[
    "explain",
    "compare",
    "why",
    "how",
    "steps",
    "architecture",
    "design",
    "optimize",
    "performance",
    "refactor",
    "debug",
    "error",
    "traceback",
    "sql",
    "pipeline",
    "fabric",
    "synapse",
    "databricks",
    "rag",
    "agent",
];

/// Prompts with at least this many words are heavy
pub const WORD_COUNT_THRESHOLD: usize = 25;

/// Prompts with at least this many characters are heavy
pub const LENGTH_THRESHOLD: usize = 160;

/// Which of the two model slots served a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Fast,
    Powerful,
}

/// Heuristic that decided the route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteReason {
    EmptyPrompt,
    HeavyKeyword(String),
    WordCount(usize),
    Length(usize),
    Default,
    /// The preferred slot was empty so the other model was used
    Fallback,
}

impl fmt::Display for RouteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPrompt => write!(f, "empty prompt"),
            Self::HeavyKeyword(k) => write!(f, "heavy keyword '{}'", k),
            Self::WordCount(n) => write!(f, "{} words", n),
            Self::Length(n) => write!(f, "{} characters", n),
            Self::Default => write!(f, "light prompt"),
            Self::Fallback => write!(f, "preferred model unavailable"),
        }
    }
}

/// Outcome of routing one prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    /// Model id to call
    pub model: String,
    /// Slot the model came from
    pub tier: ModelTier,
    /// Why the prompt was classified the way it was
    pub reason: RouteReason,
}

/// Classify a prompt; `None` means light
fn heavy_reason(prompt: &str) -> Option<RouteReason> {
    let lower = prompt.to_lowercase();

    if let Some(keyword) = HEAVY_KEYWORDS.iter().find(|k| lower.contains(*k)) {
        return Some(RouteReason::HeavyKeyword(keyword.to_string()));
    }

    let words = count_words(&lower);
    if words >= WORD_COUNT_THRESHOLD {
        return Some(RouteReason::WordCount(words));
    }

    let length = prompt.chars().count();
    if length >= LENGTH_THRESHOLD {
        return Some(RouteReason::Length(length));
    }

    None
}

/// Number of runs of word characters (letters, digits, underscore)
pub fn count_words(text: &str) -> usize {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .count()
}

/// Pick a model for `prompt`.
///
/// Returns `None` only when both ids are absent.
pub fn auto_route_model(
    prompt: &str,
    fast: Option<&str>,
    powerful: Option<&str>,
) -> Option<RouteDecision> {
    let pick = |preferred: ModelTier, reason: RouteReason| {
        let (first, second) = match preferred {
            ModelTier::Powerful => (
                powerful.map(|m| (m, ModelTier::Powerful)),
                fast.map(|m| (m, ModelTier::Fast)),
            ),
            ModelTier::Fast => (
                fast.map(|m| (m, ModelTier::Fast)),
                powerful.map(|m| (m, ModelTier::Powerful)),
            ),
        };
        match (first, second) {
            (Some((model, tier)), _) => Some(RouteDecision {
                model: model.to_string(),
                tier,
                reason,
            }),
            (None, Some((model, tier))) => Some(RouteDecision {
                model: model.to_string(),
                tier,
                reason: RouteReason::Fallback,
            }),
            (None, None) => None,
        }
    };

    let prompt = prompt.trim();
    if prompt.is_empty() {
        return pick(ModelTier::Powerful, RouteReason::EmptyPrompt);
    }

    match heavy_reason(prompt) {
        Some(reason) => pick(ModelTier::Powerful, reason),
        None => pick(ModelTier::Fast, RouteReason::Default),
    }
}

/// Pick the default (fast, powerful) pair out of a model listing.
///
/// Fast is the first id starting with `phi-`, powerful the first starting
/// with `qwen` (both case-insensitive).
pub fn pick_default_models(models: &[String]) -> (Option<String>, Option<String>) {
    let fast = models
        .iter()
        .find(|m| m.to_lowercase().starts_with("phi-"))
        .cloned();
    let powerful = models
        .iter()
        .find(|m| m.to_lowercase().starts_with("qwen"))
        .cloned();
    (fast, powerful)
}

/// Router holding the two candidate model ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRouter {
    fast: Option<String>,
    powerful: Option<String>,
}

impl ModelRouter {
    /// Create a router from explicit ids
    pub fn new(fast: Option<String>, powerful: Option<String>) -> Self {
        Self { fast, powerful }
    }

    /// Create a router from a model listing; a slot with no family match
    /// falls back to the first listed model
    pub fn from_models(models: &[String]) -> Self {
        let (fast, powerful) = pick_default_models(models);
        let first = models.first().cloned();
        Self {
            fast: fast.or_else(|| first.clone()),
            powerful: powerful.or(first),
        }
    }

    /// Fast model id
    pub fn fast(&self) -> Option<&str> {
        self.fast.as_deref()
    }

    /// Powerful model id
    pub fn powerful(&self) -> Option<&str> {
        self.powerful.as_deref()
    }

    /// Route a prompt, failing when no model is configured at all
    pub fn route(&self, prompt: &str) -> ServiceResult<RouteDecision> {
        let decision = auto_route_model(prompt, self.fast(), self.powerful())
            .ok_or(ServiceError::NoViableModel)?;
        debug!(
            "Routed prompt to {} ({:?}): {}",
            decision.model, decision.tier, decision.reason
        );
        Ok(decision)
    }
}
