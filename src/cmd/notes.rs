use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Deserialize;
use tracing::warn;

use crate::context::AppContext;
use crate::domain::commit::{Commit, CommitRange};
use crate::error::AppResult;
use crate::workflow::release_notes::{self, ReleaseNotesResponse};

#[derive(Subcommand, Debug, Clone)]
pub enum NotesCommand {
    /// Generate release notes from a JSON list of commits.
    Notes(CommitsArgs),
    /// Generate release notes from pasted `<hash> <message>` log lines.
    Text(TextArgs),
    /// Read commits from a local repository without generating notes.
    Fetch(RepoArgs),
    /// Read commits from a local repository and generate notes for them.
    Repo(RepoArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CommitsArgs {
    /// JSON request file (`{"commits": [...], "from": .., "to": ..}`), or `-` for stdin.
    #[arg(short, long, default_value = "-")]
    pub input: String,
    /// Starting reference, overrides the request body.
    #[arg(long)]
    pub from: Option<String>,
    /// Ending reference, overrides the request body.
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct TextArgs {
    /// File containing the pasted log, or `-` for stdin.
    #[arg(short, long, default_value = "-")]
    pub input: String,
}

#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// Path to the local git repository, relative to the working directory.
    #[arg(short, long, default_value = ".")]
    pub repo: PathBuf,
    /// Starting commit or tag (exclusive).
    #[arg(long)]
    pub from: Option<String>,
    /// Ending commit or tag.
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NotesRequest {
    #[serde(default)]
    commits: Vec<Commit>,
    #[serde(default, alias = "from_ref")]
    from: Option<String>,
    #[serde(default, alias = "to_ref")]
    to: Option<String>,
}

/// Runs a release-notes command; errors become an unsuccessful response.
pub async fn run(ctx: &AppContext, command: NotesCommand) -> ReleaseNotesResponse {
    match execute(ctx, command).await {
        Ok(response) => response,
        Err(error) => {
            warn!(kind = error.kind(), %error, "request rejected");
            ReleaseNotesResponse::from_error(&error)
        }
    }
}

async fn execute(ctx: &AppContext, command: NotesCommand) -> AppResult<ReleaseNotesResponse> {
    match command {
        NotesCommand::Notes(args) => {
            let request: NotesRequest = serde_json::from_str(&read_input(&args.input)?)?;
            let range = CommitRange::new(args.from.or(request.from), args.to.or(request.to));
            release_notes::generate_notes(ctx, &request.commits, &range, interrupted()).await
        }
        NotesCommand::Text(args) => {
            let text = read_input(&args.input)?;
            release_notes::generate_from_text(ctx, &text, interrupted()).await
        }
        NotesCommand::Fetch(args) => {
            let range = CommitRange::new(args.from, args.to);
            let repo = ctx.config.workspace_root.join(&args.repo);
            release_notes::fetch_commits(ctx, &repo, &range).await
        }
        NotesCommand::Repo(args) => {
            let range = CommitRange::new(args.from, args.to);
            let repo = ctx.config.workspace_root.join(&args.repo);
            release_notes::generate_from_repo(ctx, &repo, &range, interrupted()).await
        }
    }
}

fn read_input(source: &str) -> AppResult<String> {
    if source == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(source)?)
    }
}

/// Resolves on Ctrl-C so an in-flight generation can be abandoned.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    warn!("interrupted, cancelling generation");
}
