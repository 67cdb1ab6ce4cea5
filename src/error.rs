use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{0}")]
    InputInvalid(String),
    #[error("Failed to fetch commits from {path}: {reason}")]
    RepositoryUnavailable { path: String, reason: String },
    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to render response: {0}")]
    Render(serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl AppError {
    pub fn input(message: impl Into<String>) -> Self {
        AppError::InputInvalid(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "configuration",
            AppError::InputInvalid(_) => "input_invalid",
            AppError::RepositoryUnavailable { .. } => "repository_unavailable",
            AppError::Json(_) => "input_invalid",
            AppError::Render(_) => "output",
            AppError::Io(_) => "io",
        }
    }

    pub fn repository(path: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::RepositoryUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
