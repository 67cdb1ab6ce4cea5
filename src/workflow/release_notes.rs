use std::future::Future;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::context::AppContext;
use crate::domain::changelog::{GenerationResult, TokenUsage};
use crate::domain::commit::{Commit, CommitRange};
use crate::domain::log_text::parse_log_text;
use crate::error::{AppError, AppResult};

/// Uniform `{success, ...}` payload returned by every release-notes command.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReleaseNotesResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commits: Option<Vec<Commit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl ReleaseNotesResponse {
    fn from_generation(result: GenerationResult, commit_count: usize) -> Self {
        match result {
            GenerationResult::Success {
                changelog,
                token_usage,
            } => Self {
                success: true,
                notes: Some(changelog),
                commit_count: Some(commit_count),
                token_usage: Some(token_usage),
                ..Self::default()
            },
            GenerationResult::Failure { category, message } => Self {
                success: false,
                error: Some(message),
                error_kind: Some(category.as_str()),
                ..Self::default()
            },
        }
    }

    fn fetched(commits: Vec<Commit>) -> Self {
        Self {
            success: true,
            count: Some(commits.len()),
            commits: Some(commits),
            ..Self::default()
        }
    }

    /// Wraps an error that stopped the workflow before or around generation.
    pub fn from_error(error: &AppError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            ..Self::default()
        }
    }
}

/// Generates notes for caller-supplied commits.
pub async fn generate_notes<C>(
    ctx: &AppContext,
    commits: &[Commit],
    range: &CommitRange,
    cancel: C,
) -> AppResult<ReleaseNotesResponse>
where
    C: Future<Output = ()>,
{
    if commits.is_empty() {
        return Err(AppError::input("No commits provided"));
    }

    info!(commits = commits.len(), range = %range.expression(), "generating release notes");
    let result = ctx
        .changelog_generator()
        .generate_from_commits(commits, Some(range), cancel)
        .await;
    Ok(ReleaseNotesResponse::from_generation(result, commits.len()))
}

/// Generates notes from pasted `<hash> <message>` lines.
pub async fn generate_from_text<C>(
    ctx: &AppContext,
    git_log_text: &str,
    cancel: C,
) -> AppResult<ReleaseNotesResponse>
where
    C: Future<Output = ()>,
{
    let commits = parse_log_text(git_log_text)?;
    generate_notes(ctx, &commits, &CommitRange::head(), cancel).await
}

pub async fn fetch_commits(
    ctx: &AppContext,
    repo_path: &Path,
    range: &CommitRange,
) -> AppResult<ReleaseNotesResponse> {
    let commits = read_repository(ctx, repo_path, range).await?;
    Ok(ReleaseNotesResponse::fetched(commits))
}

/// Reads the range from a repository and generates notes for it; the
/// response carries both.
pub async fn generate_from_repo<C>(
    ctx: &AppContext,
    repo_path: &Path,
    range: &CommitRange,
    cancel: C,
) -> AppResult<ReleaseNotesResponse>
where
    C: Future<Output = ()>,
{
    let commits = read_repository(ctx, repo_path, range).await?;
    if commits.is_empty() {
        return Err(AppError::input("No commits found in the specified range"));
    }

    let mut response = generate_notes(ctx, &commits, range, cancel).await?;
    if response.success {
        response.commits = Some(commits);
    }
    Ok(response)
}

async fn read_repository(
    ctx: &AppContext,
    repo_path: &Path,
    range: &CommitRange,
) -> AppResult<Vec<Commit>> {
    let commits = ctx
        .version_control
        .read_commits(repo_path, range, ctx.config.max_commits)
        .await?;
    info!(
        repo = %repo_path.display(),
        range = %range.expression(),
        commits = commits.len(),
        "read commits"
    );
    Ok(commits)
}
