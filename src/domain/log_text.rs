//! Best-effort parsing of pasted `git log --oneline` style text.

use crate::domain::commit::Commit;
use crate::error::{AppError, AppResult};

/// Parses one commit per line. The first whitespace-separated token becomes
/// the hash; single-token lines get a synthetic `commit-<index>` hash where
/// the index counts every line, blank ones included.
pub fn parse_log_text(text: &str) -> AppResult<Vec<Commit>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::input("No git log text provided"));
    }

    let commits: Vec<Commit> = trimmed
        .split('\n')
        .enumerate()
        .filter_map(|(idx, line)| parse_line(idx, line))
        .collect();

    if commits.is_empty() {
        return Err(AppError::input(
            "Could not parse any commits from the provided text",
        ));
    }
    Ok(commits)
}

fn parse_line(idx: usize, line: &str) -> Option<Commit> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let commit = match line.split_once(char::is_whitespace) {
        Some((token, remainder)) => Commit::new(token, remainder.trim_start()),
        None => Commit::new(format!("commit-{idx}"), line),
    };
    Some(commit)
}
