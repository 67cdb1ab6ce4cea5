use serde::{Deserialize, Serialize};

pub const UNKNOWN_AUTHOR: &str = "Unknown";
pub const DEFAULT_TO_REF: &str = "HEAD";

/// A single normalized change entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub hash: String,
    pub message: String,
    #[serde(default = "unknown_author")]
    pub author: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_changed: Option<u32>,
}

fn unknown_author() -> String {
    UNKNOWN_AUTHOR.to_string()
}

impl Commit {
    pub fn new(hash: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            message: message.into(),
            author: unknown_author(),
            date: String::new(),
            files_changed: None,
        }
    }

    /// Renders the commit as one log line: `<hash> <message> (<metadata>)`.
    pub fn to_log_line(&self) -> String {
        let mut line = format!("{} {}", self.hash.trim(), flatten_message(&self.message));

        let mut details = Vec::new();
        let author = self.author.trim();
        if !author.is_empty() {
            details.push(format!("author: {author}"));
        }
        let date = self.date.trim();
        if !date.is_empty() {
            details.push(format!("date: {date}"));
        }
        if let Some(files) = self.files_changed {
            details.push(format!("files changed: {files}"));
        }

        if !details.is_empty() {
            line.push_str(&format!(" ({})", details.join(", ")));
        }
        line
    }
}

fn flatten_message(message: &str) -> String {
    message
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Serializes commits into the text block embedded in the prompt, one line per
/// commit in input order.
pub fn serialize_log(commits: &[Commit]) -> String {
    commits
        .iter()
        .map(Commit::to_log_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A `from..to` pair describing which portion of history is considered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    pub from_ref: Option<String>,
    pub to_ref: String,
}

impl CommitRange {
    pub fn new(from_ref: Option<String>, to_ref: Option<String>) -> Self {
        Self {
            from_ref: from_ref.filter(|r| !r.trim().is_empty()),
            to_ref: to_ref
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TO_REF.to_string()),
        }
    }

    pub fn head() -> Self {
        Self::new(None, None)
    }

    /// Revision expression understood by `git log`.
    pub fn expression(&self) -> String {
        match &self.from_ref {
            Some(from) => format!("{from}..{}", self.to_ref),
            None => self.to_ref.clone(),
        }
    }

    pub fn describe(&self) -> String {
        match &self.from_ref {
            Some(from) => format!("the range {from}..{}", self.to_ref),
            None => format!("history up to {}", self.to_ref),
        }
    }
}

impl Default for CommitRange {
    fn default() -> Self {
        Self::head()
    }
}
