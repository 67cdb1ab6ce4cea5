use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::domain::commit::{Commit, CommitRange};
use crate::error::{AppError, AppResult};
use crate::services::VersionControlService;

const RECORD_SEPARATOR: char = '\u{1e}';
const FIELD_SEPARATOR: char = '\u{1f}';
const LOG_FORMAT: &str = "--format=%x1e%H%x1f%an%x1f%cI%x1f%B%x1f";
const SHORT_HASH_LEN: usize = 7;

/// Reads history by shelling out to the `git` executable.
#[derive(Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VersionControlService for GitCli {
    async fn read_commits(
        &self,
        repo_path: &Path,
        range: &CommitRange,
        max_count: usize,
    ) -> AppResult<Vec<Commit>> {
        let display_path = repo_path.display().to_string();
        if !repo_path.is_dir() {
            return Err(AppError::repository(display_path, "path does not exist or is not a directory"));
        }

        if let Some(option_like) = [range.from_ref.as_deref(), Some(range.to_ref.as_str())]
            .into_iter()
            .flatten()
            .find(|reference| reference.starts_with('-'))
        {
            return Err(AppError::repository(
                display_path,
                format!("invalid reference '{option_like}'"),
            ));
        }

        let expression = range.expression();
        debug!(repo = %display_path, range = %expression, max_count, "reading commits");

        let output = Command::new("git")
            .arg("log")
            .arg(format!("--max-count={max_count}"))
            .arg("--name-only")
            .arg("--diff-merges=first-parent")
            .arg(LOG_FORMAT)
            .arg("--end-of-options")
            .arg(&expression)
            .arg("--")
            .current_dir(repo_path)
            .output()
            .await
            .map_err(|err| AppError::repository(&display_path, format!("failed to run git: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::repository(
                display_path,
                format!("git log {expression} failed: {}", stderr.trim()),
            ));
        }

        Ok(parse_log_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

fn parse_log_output(raw: &str) -> Vec<Commit> {
    raw.split(RECORD_SEPARATOR)
        .filter_map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> Option<Commit> {
    let mut fields = record.splitn(5, FIELD_SEPARATOR);
    let hash = fields.next()?.trim();
    let author = fields.next()?;
    let date = fields.next()?;
    let message = fields.next()?;
    let files = fields.next().unwrap_or_default();

    if hash.is_empty() {
        return None;
    }

    let files_changed = files.lines().filter(|line| !line.trim().is_empty()).count();

    Some(Commit {
        hash: hash.chars().take(SHORT_HASH_LEN).collect(),
        message: message.trim().to_string(),
        author: author.to_string(),
        date: date.trim().to_string(),
        files_changed: Some(u32::try_from(files_changed).unwrap_or(u32::MAX)),
    })
}
