use std::path::Path;

use async_trait::async_trait;

use crate::domain::commit::{Commit, CommitRange};
use crate::error::AppResult;

#[async_trait]
pub trait VersionControlService: Send + Sync {
    /// Returns up to `max_count` commits nearest `range.to_ref`, newest first.
    async fn read_commits(
        &self,
        repo_path: &Path,
        range: &CommitRange,
        max_count: usize,
    ) -> AppResult<Vec<Commit>>;
}
