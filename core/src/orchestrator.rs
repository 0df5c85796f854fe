//! Request orchestration: decides which providers to call and merges their answers.

use crate::config::DuetConfig;
use crate::ide::{compose_ide_prompt, IdeRequest};
use crate::providers::{ModelPredictionClient, SourcedAnswerClient};
use crate::worker::ModelWorkerPool;
use crate::{DuetError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Incoming `/ask` body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AskRequest {
    pub prompt: String,
    #[serde(
        default = "default_true",
        alias = "use_perplexity",
        deserialize_with = "null_as_true"
    )]
    pub use_sourced_answer: bool,
    #[serde(
        default = "default_true",
        alias = "use_vertex",
        deserialize_with = "null_as_true"
    )]
    pub use_model: bool,
    #[serde(default, alias = "vertex_instructions")]
    pub model_instructions: Option<String>,
}

fn default_true() -> bool {
    true
}

fn null_as_true<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

impl AskRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            use_sourced_answer: true,
            use_model: true,
            model_instructions: None,
        }
    }
}

/// Combined answer returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergedResponse {
    pub prompt: String,
    pub sourced_answer: Option<Value>,
    pub model_output: Option<Value>,
}

/// Owns both provider clients and the worker pool for blocking model calls
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<DuetConfig>,
    sourced_answer: SourcedAnswerClient,
    model: ModelPredictionClient,
    workers: ModelWorkerPool,
}

impl Orchestrator {
    pub fn new(config: Arc<DuetConfig>) -> Result<Self> {
        let sourced_answer = SourcedAnswerClient::new(config.sourced_answer.clone())?;
        let model = ModelPredictionClient::new(config.model.clone())?;
        let workers = ModelWorkerPool::new(config.model.workers);
        Ok(Self {
            config,
            sourced_answer,
            model,
            workers,
        })
    }

    pub fn config(&self) -> &DuetConfig {
        &self.config
    }

    pub fn workers(&self) -> &ModelWorkerPool {
        &self.workers
    }

    /// Run the requested provider calls in order and merge the results.
    ///
    /// Any failing branch fails the whole request; there is no partial answer.
    #[tracing::instrument(
        skip(self, request),
        fields(
            use_sourced_answer = request.use_sourced_answer,
            use_model = request.use_model,
            prompt_chars = request.prompt.len()
        )
    )]
    pub async fn handle_ask(&self, request: AskRequest) -> Result<MergedResponse> {
        let mut sourced_answer = None;
        let mut model_output = None;

        if request.use_sourced_answer {
            let answer = self.sourced_answer.fetch(&request.prompt).await.map_err(|e| {
                warn!(target: "orchestrator", error = %e, "Sourced-answer branch failed");
                e
            })?;
            sourced_answer = Some(answer);
        }

        if request.use_model {
            let client = self.model.clone();
            let prompt = request.prompt.clone();
            let instructions = request.model_instructions.clone();
            debug!(target: "orchestrator", transport = client.transport().mode(), "Dispatching model call to worker pool");

            let output = self
                .workers
                .run(move || client.fetch_blocking(&prompt, instructions.as_deref()))
                .await
                .map_err(|e| {
                    warn!(target: "orchestrator", error = %e, "Model branch failed");
                    e
                })?;
            model_output = Some(output);
        }

        info!(
            target: "orchestrator",
            sourced_answer = sourced_answer.is_some(),
            model_output = model_output.is_some(),
            "Request merged"
        );

        Ok(MergedResponse {
            prompt: request.prompt,
            sourced_answer,
            model_output,
        })
    }

    /// IDE entry point: fold the project context into the prompt, then ask both providers.
    #[tracing::instrument(skip(self, request))]
    pub async fn handle_ide(&self, request: IdeRequest) -> Result<MergedResponse> {
        let question = request
            .question
            .as_deref()
            .filter(|q| !q.is_empty())
            .ok_or_else(|| DuetError::Validation("question required".to_string()))?;
        let context = request.context.as_deref().unwrap_or_default();

        let ask = AskRequest::new(compose_ide_prompt(context, question));
        self.handle_ask(ask).await
    }
}
