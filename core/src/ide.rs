// IDE request adapter
//
// Editor extensions send the surrounding project context separately from the
// question; both are folded into a single prompt before orchestration.

use serde::{Deserialize, Serialize};

/// Incoming `/ide` body. Both fields are optional on the wire; a missing
/// question is rejected by the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdeRequest {
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
}

impl IdeRequest {
    pub fn new(context: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            context: Some(context.into()),
            question: Some(question.into()),
        }
    }
}

pub fn compose_ide_prompt(context: &str, question: &str) -> String {
    format!("Project context:\n{context}\n\nQuestion:\n{question}")
}
