/// Model-prediction client
///
/// Talks to the generative-model provider over whichever transport was
/// resolved at startup. Every call here blocks the calling thread; run it
/// through [`crate::ModelWorkerPool`] from async code.
use crate::config::{ModelConfig, ModelTransport};
use crate::providers::credentials::BearerSource;
use crate::{DuetError, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Prefix the prompt with the instructions block, if any.
pub fn compose_effective_prompt(prompt: &str, instructions: Option<&str>) -> String {
    match instructions {
        Some(instructions) if !instructions.is_empty() => format!("{instructions}\n\n{prompt}"),
        _ => prompt.to_string(),
    }
}

/// Resource name of a deployed prediction endpoint
pub fn endpoint_path(project: &str, location: &str, endpoint_id: &str) -> String {
    format!("projects/{project}/locations/{location}/endpoints/{endpoint_id}")
}

#[derive(Clone)]
pub struct ModelPredictionClient {
    config: Arc<ModelConfig>,
    bearer: Option<BearerSource>,
}

impl ModelPredictionClient {
    /// Fails when the managed credential cannot be loaded.
    pub fn new(config: ModelConfig) -> Result<Self> {
        let bearer = match &config.transport {
            ModelTransport::Managed { credential, .. } => Some(BearerSource::resolve(credential)?),
            _ => None,
        };
        Ok(Self {
            config: Arc::new(config),
            bearer,
        })
    }

    pub fn transport(&self) -> &ModelTransport {
        &self.config.transport
    }

    /// Single-instance prediction body shared by both transports
    pub fn request_body(effective_prompt: &str) -> Value {
        json!({
            "instances": [{ "content": effective_prompt }],
            "parameters": {},
        })
    }

    /// Run one prediction. Blocks until the provider answers or the timeout hits.
    pub fn fetch_blocking(&self, prompt: &str, instructions: Option<&str>) -> Result<Value> {
        let effective = compose_effective_prompt(prompt, instructions);

        match &self.config.transport {
            ModelTransport::Managed {
                project,
                location,
                endpoint_id,
                api_base,
                ..
            } => {
                let bearer = self.bearer.as_ref().ok_or_else(|| {
                    DuetError::Configuration("managed credential not resolved".to_string())
                })?;
                // Fetched per call; the service-account source refreshes near expiry
                let access_token = bearer.token_blocking()?;
                let endpoint = endpoint_path(project, location, endpoint_id);
                self.predict_managed(api_base, &endpoint, &access_token, &effective)
            }
            ModelTransport::Rest { url, api_key } => self.predict_rest(url, api_key, &effective),
            ModelTransport::Unconfigured => Err(DuetError::Configuration(
                "model backend not configured: set VERTEX_ENDPOINT_ID with GOOGLE_APPLICATION_CREDENTIALS or GOOGLE_OAUTH_ACCESS_TOKEN, or VERTEX_REST_URL+GOOGLE_API_KEY"
                    .to_string(),
            )),
        }
    }

    // Built per call: a blocking client must be created and dropped off the async runtime.
    fn http(&self) -> Result<reqwest::blocking::Client> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .user_agent("duet-orchestrator/0.1")
            .build()?;
        Ok(client)
    }

    fn predict_managed(
        &self,
        api_base: &str,
        endpoint: &str,
        access_token: &str,
        effective_prompt: &str,
    ) -> Result<Value> {
        let url = format!("{api_base}/v1/{endpoint}:predict");
        debug!(target: "model_prediction", endpoint = %endpoint, "POST prediction via managed client");

        let response = self
            .http()?
            .post(&url)
            .bearer_auth(access_token)
            .json(&Self::request_body(effective_prompt))
            .send()?;
        let body = check_status(response)?;

        let predictions = body
            .get("predictions")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        Ok(json!({ "predictions": predictions }))
    }

    fn predict_rest(&self, url: &str, api_key: &str, effective_prompt: &str) -> Result<Value> {
        debug!(target: "model_prediction", url = %url, "POST prediction via REST");

        let response = self
            .http()?
            .post(url)
            .query(&[("key", api_key)])
            .header("content-type", "application/json")
            .json(&Self::request_body(effective_prompt))
            .send()?;
        check_status(response)
    }
}

fn check_status(response: reqwest::blocking::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        warn!(target: "model_prediction", %status, body = %body, "Model provider returned error");
        return Err(DuetError::Upstream {
            provider: "model",
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json()?)
}
