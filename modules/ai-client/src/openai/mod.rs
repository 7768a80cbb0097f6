mod client;
pub(crate) mod types;

use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::{AiError, Result};
use crate::util::parse_json_object;
use client::OpenAiClient;
use types::{ChatRequest, WireMessage};

const MAX_RESPONSE_TOKENS: u32 = 1024;

// =============================================================================
// OpenAi Agent
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Per-request timeout enforced by the HTTP client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn client(&self) -> Result<OpenAiClient> {
        let client = OpenAiClient::new(&self.api_key, self.timeout)?;
        Ok(match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        })
    }

    /// Chat completion in JSON-object response mode, parsed into a JSON map.
    pub async fn json_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<Map<String, Value>> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::system(system))
            .message(WireMessage::user(user))
            .with_token_limit(MAX_RESPONSE_TOKENS)
            .json_object();

        let text = self
            .client()?
            .chat(&request)
            .await?
            .into_text()
            .ok_or(AiError::EmptyResponse)?;

        parse_json_object(&text)
    }
}

impl std::fmt::Debug for OpenAi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAi")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
