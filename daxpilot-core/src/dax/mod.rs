//! Natural language to DAX through a chat model

pub mod extract;
pub mod validate;

use crate::error::{ServiceError, ServiceResult};
use crate::foundry::ChatCompletion;
use crate::protocol::{ChatRequest, Message};
use std::sync::Arc;
use tracing::{info, warn};

pub use extract::extract_dax;
pub use validate::{validate_dax, DaxIssue, DaxValidation};

/// Instructions sent ahead of every generation request
pub const DAX_SYSTEM_PROMPT: &str = r#"You are an expert DAX (Data Analysis Expression) query generator for Power BI and Microsoft Fabric.
Your task is to convert natural language questions into valid DAX queries.

Guidelines:
1. Use EVALUATE statements for queries
2. Reference tables as [TableName]
3. Reference columns as [TableName][ColumnName]
4. Use proper DAX functions: SUM, CALCULATE, FILTER, etc.
5. Return ONLY the DAX query, no explanation
6. Ensure queries are valid and executable
7. Handle date functions properly (DATESYTD, DATESMTD, PREVIOUSMONTH, etc.)

Example:
Q: What is total revenue?
A: EVALUATE ROW("Total Revenue", [Total Revenue])

Q: Show revenue by month
A: EVALUATE SUMMARIZE(ALL(DimDate), DimDate[MonthName], "Revenue", [Total Revenue])
"#;

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 500;
const TOP_P: f32 = 0.9;

/// Turns questions into DAX queries using one fixed model
pub struct DaxGenerator {
    backend: Arc<dyn ChatCompletion>,
    model: String,
}

impl DaxGenerator {
    pub fn new(backend: Arc<dyn ChatCompletion>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a query for a natural-language question
    pub async fn generate(&self, question: &str) -> ServiceResult<String> {
        let query = self
            .complete(format!("Generate a DAX query for: {}", question))
            .await?;
        info!("Generated DAX with {} ({} chars)", self.model, query.len());
        Ok(query)
    }

    /// Ask the model to rework a query given feedback or an error message
    pub async fn refine(&self, query: &str, feedback: &str) -> ServiceResult<String> {
        let refined = self
            .complete(format!(
                "Original DAX:\n{}\n\nFeedback: {}\n\nPlease refine the DAX query.",
                query, feedback
            ))
            .await?;
        info!("Refined DAX with {}", self.model);
        Ok(refined)
    }

    /// Request shape shared by generation and refinement
    pub fn build_request(&self, user_content: String) -> ChatRequest {
        ChatRequest::new(
            self.model.clone(),
            vec![Message::system(DAX_SYSTEM_PROMPT), Message::user(user_content)],
        )
        .with_temperature(TEMPERATURE)
        .with_max_tokens(MAX_TOKENS)
        .with_top_p(TOP_P)
    }

    async fn complete(&self, user_content: String) -> ServiceResult<String> {
        let response = self.backend.complete(self.build_request(user_content)).await?;

        let query = response
            .first_content()
            .map(extract_dax)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| {
                warn!("{} returned no DAX", self.model);
                ServiceError::EmptyCompletion
            })?;

        let validation = validate_dax(&query);
        for issue in &validation.issues {
            warn!("Generated DAX looks off: {}", issue);
        }
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ChatResponse, MessageRole};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Canned {
        answer: String,
        seen: Mutex<Option<ChatRequest>>,
    }

    impl Canned {
        fn new(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.to_string(),
                seen: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl ChatCompletion for Canned {
        async fn complete(&self, request: ChatRequest) -> ServiceResult<ChatResponse> {
            let model = request.model.clone();
            *self.seen.lock().unwrap() = Some(request);
            Ok(ChatResponse::from_text(model, self.answer.clone()))
        }
    }

    #[tokio::test]
    async fn test_generate_strips_fences_and_sets_sampling() {
        let backend = Canned::new("```dax\nEVALUATE ROW(\"Total\", [Total Revenue])\n```");
        let generator = DaxGenerator::new(backend.clone(), "qwen2.5-14b-instruct");

        let query = generator.generate("What is total revenue?").await.unwrap();
        assert_eq!(query, "EVALUATE ROW(\"Total\", [Total Revenue])");

        let request = backend.seen.lock().unwrap().clone().unwrap();
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.max_tokens, Some(500));
        assert_eq!(request.top_p, Some(0.9));
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert_eq!(
            request.messages[1].content,
            "Generate a DAX query for: What is total revenue?"
        );
    }

    #[tokio::test]
    async fn test_refine_prompt() {
        let backend = Canned::new("EVALUATE Sales");
        let generator = DaxGenerator::new(backend.clone(), "qwen");

        generator.refine("EVALUATE Sale", "table not found").await.unwrap();
        let request = backend.seen.lock().unwrap().clone().unwrap();
        assert_eq!(
            request.messages[1].content,
            "Original DAX:\nEVALUATE Sale\n\nFeedback: table not found\n\nPlease refine the DAX query."
        );
    }

    #[tokio::test]
    async fn test_blank_answer_is_an_error() {
        let generator = DaxGenerator::new(Canned::new("  \n"), "qwen");
        assert!(matches!(
            generator.generate("anything").await,
            Err(ServiceError::EmptyCompletion)
        ));
    }
}
