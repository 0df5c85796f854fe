//! Shared fixtures for orchestrator tests backed by wiremock servers

use std::sync::Arc;

use duet_core::config::{ModelConfig, SourcedAnswerConfig};
use duet_core::{DuetConfig, ManagedCredential, ModelTransport, Orchestrator};
use wiremock::MockServer;

pub const SOURCED_PATH: &str = "/v1/answers";
pub const REST_PATH: &str = "/v1/models/text:predict";

pub fn sourced_config(server: &MockServer) -> SourcedAnswerConfig {
    SourcedAnswerConfig {
        api_key: "pplx-test".to_string(),
        api_url: format!("{}{}", server.uri(), SOURCED_PATH),
        ..SourcedAnswerConfig::default()
    }
}

pub fn rest_transport(server: &MockServer) -> ModelTransport {
    ModelTransport::Rest {
        url: format!("{}{}", server.uri(), REST_PATH),
        api_key: "gkey".to_string(),
    }
}

pub fn managed_transport(server: &MockServer) -> ModelTransport {
    ModelTransport::Managed {
        project: "acme".to_string(),
        location: "us-central1".to_string(),
        endpoint_id: "42".to_string(),
        credential: ManagedCredential::AccessToken("ya29.test".to_string()),
        api_base: server.uri(),
    }
}

pub fn orchestrator(sourced_answer: SourcedAnswerConfig, transport: ModelTransport) -> Orchestrator {
    let config = DuetConfig {
        sourced_answer,
        model: ModelConfig {
            transport,
            ..ModelConfig::default()
        },
        ..DuetConfig::default()
    };
    Orchestrator::new(Arc::new(config)).expect("orchestrator")
}
