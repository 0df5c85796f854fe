/// Upstream provider clients
pub mod credentials;
pub mod model_prediction;
pub mod sourced_answer;

pub use credentials::BearerSource;
pub use model_prediction::{compose_effective_prompt, ModelPredictionClient};
pub use sourced_answer::SourcedAnswerClient;
