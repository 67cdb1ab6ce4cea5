use async_trait::async_trait;

use crate::domain::changelog::{Completion, GenerationFailure};
use crate::domain::prompt::CompletionRequest;

#[async_trait]
pub trait LanguageModelService: Send + Sync {
    /// Issues exactly one generation call; no retries.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, GenerationFailure>;
}
