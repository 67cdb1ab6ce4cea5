use std::fmt;

use serde::Serialize;

pub const NO_SIGNIFICANT_CHANGES: &str = "No significant changes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total: input_tokens.saturating_add(output_tokens),
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// Text and usage counts returned by the provider, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    ProviderError,
    ConnectionError,
    RateLimited,
    Unexpected,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::ProviderError => "provider_error",
            FailureCategory::ConnectionError => "connection_error",
            FailureCategory::RateLimited => "rate_limited",
            FailureCategory::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A categorized provider failure carrying the message shown to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationFailure {
    pub category: FailureCategory,
    pub message: String,
}

impl GenerationFailure {
    pub fn provider(detail: impl fmt::Display) -> Self {
        Self {
            category: FailureCategory::ProviderError,
            message: format!("API Error: {detail}"),
        }
    }

    pub fn connection() -> Self {
        Self {
            category: FailureCategory::ConnectionError,
            message: "Connection Error: Unable to reach the Anthropic API. Check your internet connection."
                .to_string(),
        }
    }

    pub fn timed_out(after_secs: u64) -> Self {
        Self {
            category: FailureCategory::ConnectionError,
            message: format!(
                "Connection Error: The Anthropic API did not respond within {after_secs}s. Check your internet connection."
            ),
        }
    }

    pub fn rate_limited() -> Self {
        Self {
            category: FailureCategory::RateLimited,
            message: "Rate Limit Error: Too many requests. Please try again later.".to_string(),
        }
    }

    pub fn unexpected(detail: impl fmt::Display) -> Self {
        Self {
            category: FailureCategory::Unexpected,
            message: format!("Unexpected error: {detail}"),
        }
    }
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of one generation call. Failures always report zero usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    Success {
        changelog: String,
        token_usage: TokenUsage,
    },
    Failure {
        category: FailureCategory,
        message: String,
    },
}

impl GenerationResult {
    pub fn from_completion(completion: Completion) -> Self {
        match normalize_changelog(&completion.text) {
            Some(changelog) => GenerationResult::Success {
                changelog,
                token_usage: TokenUsage::new(completion.input_tokens, completion.output_tokens),
            },
            None => GenerationFailure::unexpected("the provider returned an empty changelog").into(),
        }
    }

    pub fn token_usage(&self) -> TokenUsage {
        match self {
            GenerationResult::Success { token_usage, .. } => *token_usage,
            GenerationResult::Failure { .. } => TokenUsage::zero(),
        }
    }
}

impl From<GenerationFailure> for GenerationResult {
    fn from(failure: GenerationFailure) -> Self {
        GenerationResult::Failure {
            category: failure.category,
            message: failure.message,
        }
    }
}

/// Returns `None` for blank text, the exact sentinel when the model reported
/// nothing worth listing, and the text untouched otherwise.
pub fn normalize_changelog(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let bare = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if bare.eq_ignore_ascii_case(NO_SIGNIFICANT_CHANGES) {
        return Some(NO_SIGNIFICANT_CHANGES.to_string());
    }
    Some(text.to_string())
}
