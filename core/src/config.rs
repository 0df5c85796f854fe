//! Startup configuration snapshot.
//!
//! Everything is read from the process environment exactly once. Handlers get
//! the resulting [`DuetConfig`] through an `Arc` and never look at the
//! environment again.

use std::net::SocketAddr;
use tracing::{info, warn};

pub const DEFAULT_SOURCED_ANSWER_URL: &str = "https://api.perplexity.ai/v1/answers";
pub const DEFAULT_GCP_LOCATION: &str = "us-central1";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Question-answering provider settings
#[derive(Debug, Clone)]
pub struct SourcedAnswerConfig {
    pub api_key: String,
    pub api_url: String,
    pub timeout_ms: u64,
    pub num_results: u32,
}

impl Default for SourcedAnswerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: DEFAULT_SOURCED_ANSWER_URL.to_string(),
            timeout_ms: 20_000,
            num_results: 1,
        }
    }
}

impl SourcedAnswerConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Where the managed client gets its bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedCredential {
    /// Fixed token from `GOOGLE_OAUTH_ACCESS_TOKEN`. Not refreshed.
    AccessToken(String),
    /// Service-account key file from `GOOGLE_APPLICATION_CREDENTIALS`;
    /// tokens are minted from it and refreshed before they expire.
    ServiceAccountFile(String),
}

/// How model predictions are requested. Resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelTransport {
    /// Endpoint-scoped prediction client authenticated with an OAuth bearer token
    Managed {
        project: String,
        location: String,
        endpoint_id: String,
        credential: ManagedCredential,
        api_base: String,
    },
    /// Direct POST to a predict URL with an API key query credential
    Rest { url: String, api_key: String },
    Unconfigured,
}

impl ModelTransport {
    /// Pick the transport in fixed priority: managed client, then REST, then none.
    ///
    /// The managed client needs an endpoint id plus a credential. An explicit
    /// access token wins over application default credentials.
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let credential = var("GOOGLE_OAUTH_ACCESS_TOKEN")
            .map(ManagedCredential::AccessToken)
            .or_else(|| {
                var("GOOGLE_APPLICATION_CREDENTIALS").map(ManagedCredential::ServiceAccountFile)
            });
        if let (Some(endpoint_id), Some(credential)) = (var("VERTEX_ENDPOINT_ID"), credential) {
            let location = var("GCP_LOCATION").unwrap_or_else(|| DEFAULT_GCP_LOCATION.to_string());
            let api_base = var("VERTEX_API_BASE")
                .unwrap_or_else(|| format!("https://{location}-aiplatform.googleapis.com"));
            return Self::Managed {
                project: var("GCP_PROJECT").unwrap_or_default(),
                location,
                endpoint_id,
                credential,
                api_base: api_base.trim_end_matches('/').to_string(),
            };
        }

        if let (Some(url), Some(api_key)) = (var("VERTEX_REST_URL"), var("GOOGLE_API_KEY")) {
            return Self::Rest { url, api_key };
        }

        Self::Unconfigured
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Managed { .. } => "managed_client",
            Self::Rest { .. } => "rest_with_key",
            Self::Unconfigured => "unconfigured",
        }
    }
}

/// Model-prediction provider settings
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub transport: ModelTransport,
    pub timeout_ms: u64,
    /// Upper bound on concurrently running blocking model calls
    pub workers: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            transport: ModelTransport::Unconfigured,
            timeout_ms: 30_000,
            workers: 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> crate::Result<SocketAddr> {
        self.bind_addr.parse().map_err(|e| {
            crate::DuetError::Configuration(format!(
                "invalid DUET_BIND_ADDR '{}': {e}",
                self.bind_addr
            ))
        })
    }
}

/// Immutable configuration snapshot shared by every request
#[derive(Debug, Clone, Default)]
pub struct DuetConfig {
    pub sourced_answer: SourcedAnswerConfig,
    pub model: ModelConfig,
    pub server: ServerConfig,
}

impl DuetConfig {
    /// Problems worth reporting at startup. None of them stop the server; the
    /// affected requests fail when they reach the provider.
    pub fn startup_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.sourced_answer.is_configured() {
            warnings.push(
                "PERPLEXITY_API_KEY not set; sourced-answer calls will fail until set".to_string(),
            );
        }
        match &self.model.transport {
            ModelTransport::Managed { project, .. } if project.is_empty() => warnings.push(
                "GCP_PROJECT not set; managed model calls target projects//locations/... and will be rejected"
                    .to_string(),
            ),
            ModelTransport::Unconfigured => warnings.push(
                "model backend not configured; set VERTEX_ENDPOINT_ID with GOOGLE_APPLICATION_CREDENTIALS or GOOGLE_OAUTH_ACCESS_TOKEN, or VERTEX_REST_URL+GOOGLE_API_KEY"
                    .to_string(),
            ),
            _ => {}
        }
        warnings
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the snapshot from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let sourced_answer = SourcedAnswerConfig {
            api_key: var("PERPLEXITY_API_KEY").unwrap_or_default(),
            api_url: var("PERPLEXITY_API_URL")
                .unwrap_or_else(|| DEFAULT_SOURCED_ANSWER_URL.to_string()),
            ..SourcedAnswerConfig::default()
        };

        let model = ModelConfig {
            transport: ModelTransport::resolve(&lookup),
            workers: var("DUET_MODEL_WORKERS")
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(8),
            ..ModelConfig::default()
        };

        let server = ServerConfig {
            bind_addr: var("DUET_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        };

        let config = Self {
            sourced_answer,
            model,
            server,
        };
        for warning in config.startup_warnings() {
            warn!(target: "config", "{warning}");
        }
        info!(
            target: "config",
            model_transport = config.model.transport.mode(),
            model_workers = config.model.workers,
            sourced_answer_configured = config.sourced_answer.is_configured(),
            "Configuration loaded"
        );
        config
    }
}
