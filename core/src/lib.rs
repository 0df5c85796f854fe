// Duet Core Library
// Sourced-answer + model-prediction orchestration runtime

pub mod config;
pub mod ide;
pub mod orchestrator;
pub mod providers;
pub mod worker;

// Export core types
pub use config::{
    DuetConfig, ManagedCredential, ModelConfig, ModelTransport, ServerConfig, SourcedAnswerConfig,
};
pub use ide::{compose_ide_prompt, IdeRequest};
pub use orchestrator::{AskRequest, MergedResponse, Orchestrator};
pub use providers::{ModelPredictionClient, SourcedAnswerClient};
pub use worker::ModelWorkerPool;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DuetError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Upstream {provider} returned {status}: {body}")]
    Upstream {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{0}")]
    Validation(String),

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DuetError {
    /// HTTP status this error is reported with.
    ///
    /// Upstream failures keep the provider's own status code so the caller sees
    /// e.g. a 404 or 429 exactly as the provider returned it. A non-error
    /// upstream status (a stray 304, say) is reported as 502.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Upstream { status, .. } if (400..=599).contains(status) => *status,
            Self::Upstream { .. } => 502,
            Self::Validation(_) => 400,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, DuetError>;
