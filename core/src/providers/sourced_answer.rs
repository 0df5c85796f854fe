/// Sourced-answer client
///
/// Asks the web-grounded question-answering provider a single question.
/// The response body is returned as-is; its shape belongs to the provider.
use crate::config::SourcedAnswerConfig;
use crate::{DuetError, Result};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct SourcedAnswerClient {
    config: SourcedAnswerConfig,
    http_client: reqwest::Client,
}

impl SourcedAnswerClient {
    pub fn new(config: SourcedAnswerConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent("duet-orchestrator/0.1")
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Request body sent for `prompt`
    pub fn request_body(&self, prompt: &str) -> Value {
        json!({
            "question": prompt,
            "num_results": self.config.num_results,
        })
    }

    pub async fn fetch(&self, prompt: &str) -> Result<Value> {
        if !self.config.is_configured() {
            return Err(DuetError::Configuration(
                "sourced-answer API key missing (set PERPLEXITY_API_KEY)".to_string(),
            ));
        }

        debug!(target: "sourced_answer", url = %self.config.api_url, prompt_chars = prompt.len(), "Requesting sourced answer");

        let response = self
            .http_client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .header("content-type", "application/json")
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                warn!(target: "sourced_answer", error = %e, "Sourced-answer request failed");
                DuetError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(target: "sourced_answer", %status, body = %body, "Sourced-answer provider returned error");
            return Err(DuetError::Upstream {
                provider: "sourced_answer",
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response.json().await?;
        Ok(data)
    }
}
