use std::future::Future;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::changelog::{FailureCategory, GenerationFailure, GenerationResult};
use crate::domain::commit::{Commit, CommitRange, serialize_log};
use crate::domain::prompt::CompletionRequest;
use crate::services::LanguageModelService;

#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratorOptions {
    /// Tell the model which ref range the commits came from.
    pub include_range_in_prompt: bool,
}

/// Turns a commit log into a categorized Markdown changelog with one
/// provider call per invocation. Holds no per-call state.
#[derive(Clone)]
pub struct ChangelogGenerator {
    language_model: Arc<dyn LanguageModelService>,
    options: GeneratorOptions,
}

impl ChangelogGenerator {
    pub fn new(language_model: Arc<dyn LanguageModelService>, options: GeneratorOptions) -> Self {
        Self {
            language_model,
            options,
        }
    }

    /// Serializes `commits` and generates from the resulting log.
    pub async fn generate_from_commits<C>(
        &self,
        commits: &[Commit],
        range: Option<&CommitRange>,
        cancel: C,
    ) -> GenerationResult
    where
        C: Future<Output = ()>,
    {
        self.generate_from_log(&serialize_log(commits), range, cancel)
            .await
    }

    /// Generates from a pre-formatted log. The in-flight provider call is
    /// dropped if `cancel` resolves first.
    pub async fn generate_from_log<C>(
        &self,
        log: &str,
        range: Option<&CommitRange>,
        cancel: C,
    ) -> GenerationResult
    where
        C: Future<Output = ()>,
    {
        // Callers reject empty input as InputInvalid before reaching here; the
        // generator itself only reports through GenerationResult.
        if log.trim().is_empty() {
            return self.report(GenerationFailure::unexpected("the commit log is empty").into());
        }

        let prompt_range = range.filter(|_| self.options.include_range_in_prompt);
        let request = CompletionRequest::for_log(log, prompt_range);

        let result = tokio::select! {
            outcome = self.language_model.complete(&request) => match outcome {
                Ok(completion) => GenerationResult::from_completion(completion),
                Err(failure) => failure.into(),
            },
            () = cancel => GenerationFailure::unexpected("generation was cancelled").into(),
        };
        self.report(result)
    }

    fn report(&self, result: GenerationResult) -> GenerationResult {
        match &result {
            GenerationResult::Success { .. } => {
                let usage = result.token_usage();
                info!(
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    total_tokens = usage.total,
                    "changelog generated"
                )
            }
            GenerationResult::Failure { category, message }
                if *category == FailureCategory::Unexpected =>
            {
                error!(%category, %message, "changelog generation failed")
            }
            GenerationResult::Failure { category, message } => {
                warn!(%category, %message, "changelog generation failed")
            }
        }
        result
    }
}
