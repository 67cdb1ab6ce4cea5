use crate::domain::commit::CommitRange;

/// Fixed instructions sent as the system turn of every generation request.
pub const SYSTEM_PROMPT: &str = "\
You are a professional technical writer who turns git commit history into clean, user-friendly release changelogs.

1. Categorize every logical change into exactly one of these sections:
   - Features: new functionality, capabilities or additions
   - Fixes: bug fixes, error corrections or patches
   - Improvements: enhancements, optimizations or refactoring with a visible effect
   - Documentation: docs, README or help text updates
   - Other: changes whose commit message is too vague or unclear to place elsewhere

2. Leave out noise:
   - merge commits, version bumps and work-in-progress (WIP) commits
   - trivial typo or formatting-only commits
   - purely internal or developer-facing changes that do not affect users

3. Write clearly:
   - use plain, non-technical language
   - describe what changed and why it matters to users in 1-2 lines
   - remove commit hashes and technical jargon

4. When a commit has a date or time, append it in parentheses after its bullet, for example \"(2024-11-08T10:30:00)\".

5. Format the result as Markdown:
   - one `## <Section>` heading per section, only for sections with at least one item
   - if no change qualifies, reply with exactly: No significant changes

6. Use bullet points only, never numbered lists. Combine related commits into a single bullet when they describe the same user-facing effect.";

const LOG_PREAMBLE: &str = "Here is the git log to convert into a changelog:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user_message: String,
}

impl CompletionRequest {
    pub fn for_log(log: &str, range: Option<&CommitRange>) -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
            user_message: build_user_message(log, range),
        }
    }
}

/// Wraps the serialized log in the user turn, optionally naming the range
/// the commits were taken from.
pub fn build_user_message(log: &str, range: Option<&CommitRange>) -> String {
    match range {
        Some(range) => format!(
            "These commits cover {}.\n\n{LOG_PREAMBLE}\n\n{log}",
            range.describe()
        ),
        None => format!("{LOG_PREAMBLE}\n\n{log}"),
    }
}
