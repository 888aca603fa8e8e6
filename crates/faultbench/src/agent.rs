//! Diagnostic agent client
//!
//! The agent is an opaque service: it receives a natural-language prompt and
//! answers with natural-language text. No conversation state is carried
//! between calls.

use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sends prompts to a diagnostic agent
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AgentClient: Send + Sync {
    /// Send one prompt and wait for the full answer
    async fn send(&self, url: &str, prompt: &str, timeout: Duration) -> Result<String, AgentError>;
}

#[derive(Debug, Serialize)]
struct PromptRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct PromptReply {
    #[serde(alias = "text")]
    response: String,
}

/// HTTP agent client
///
/// POSTs `{"prompt": ...}` to the agent URL. The answer is read from a JSON
/// `response` (or `text`) field, or taken verbatim when the body is not JSON.
#[derive(Debug, Clone, Default)]
pub struct HttpAgentClient {
    client: reqwest::Client,
}

impl HttpAgentClient {
    /// Create client with a fresh connection pool
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl AgentClient for HttpAgentClient {
    async fn send(&self, url: &str, prompt: &str, timeout: Duration) -> Result<String, AgentError> {
        let reply = self
            .client
            .post(url)
            .timeout(timeout)
            .json(&PromptRequest { prompt })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout(timeout)
                } else {
                    AgentError::from(e)
                }
            })?;

        let status = reply.status();
        let body = reply.text().await?;
        if !status.is_success() {
            return Err(AgentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        match serde_json::from_str::<PromptReply>(&body) {
            Ok(parsed) => Ok(parsed.response),
            Err(_) => Ok(body),
        }
    }
}
