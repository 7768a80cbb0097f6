// Reasoning service seam for the proposer.
//
// The production implementation is the OpenAI chat client in JSON-object
// mode; tests substitute canned or failing reasoners (see `testing`).

use ai_client::{AiError, OpenAi};
use async_trait::async_trait;
use serde_json::{Map, Value};

#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Model label for logs.
    fn model(&self) -> &str;

    /// Ask for a single JSON object. Transport failures, API errors and
    /// malformed output are all errors.
    async fn complete_json(&self, system: &str, user: &str) -> Result<Map<String, Value>, AiError>;
}

#[async_trait]
impl ReasoningClient for OpenAi {
    fn model(&self) -> &str {
        OpenAi::model(self)
    }

    async fn complete_json(&self, system: &str, user: &str) -> Result<Map<String, Value>, AiError> {
        self.json_completion(system, user).await
    }
}
