use std::io::{self, Write};

use clap::{Args, Subcommand};

use crate::config::{DEFAULT_API_BASE_URL, DEFAULT_MODEL, StoredConfig, config_file_path};
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored configuration (secrets masked).
    Show,
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(),
        ConfigCommand::Show => run_show(),
    }
}

fn run_init() -> AppResult<()> {
    let mut cfg = StoredConfig::load()?;

    println!("Configuring shipnote.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!("Environment variables (ANTHROPIC_API_KEY, SHIPNOTE_*) override these values.");
    println!();

    apply_prompt("Anthropic API key", &mut cfg.api_key, true)?;
    apply_prompt(
        &format!("API base URL (default {DEFAULT_API_BASE_URL})"),
        &mut cfg.api_base_url,
        false,
    )?;
    apply_prompt(&format!("Model (default {DEFAULT_MODEL})"), &mut cfg.model, false)?;
    apply_prompt(
        "Request timeout in seconds (default 120)",
        &mut cfg.request_timeout_secs,
        false,
    )?;
    apply_prompt(
        "Mention the commit range in the prompt (true/false)",
        &mut cfg.include_range,
        false,
    )?;

    cfg.save()?;

    let path = config_file_path()?;
    println!("\nConfiguration saved to {}", path.display());
    Ok(())
}

fn run_show() -> AppResult<()> {
    let cfg = StoredConfig::load()?;
    let path = config_file_path()?;

    println!("Configuration file: {}", path.display());
    println!("Anthropic API key: {}", mask_secret(&cfg.api_key));
    println!("API base URL: {}", display_value(&cfg.api_base_url));
    println!("Model: {}", display_value(&cfg.model));
    println!(
        "Request timeout (s): {}",
        display_value(&cfg.request_timeout_secs)
    );
    println!("Range in prompt: {}", display_value(&cfg.include_range));

    Ok(())
}

fn apply_prompt(field: &str, target: &mut Option<String>, secret: bool) -> AppResult<()> {
    match prompt(field, target.as_deref(), secret)? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(value),
    }
    Ok(())
}

fn prompt(field: &str, current: Option<&str>, secret: bool) -> AppResult<PromptAction> {
    let mut stdout = io::stdout();

    match (current, secret) {
        (Some(_), true) => write!(stdout, "{field} [****] (Enter to keep, '-' to clear): ")?,
        (Some(value), false) => {
            write!(stdout, "{field} [{value}] (Enter to keep, '-' to clear): ")?
        }
        (None, _) => write!(stdout, "{field} (Enter to skip): ")?,
    }
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(PromptAction::parse(&input))
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn mask_secret(value: &Option<String>) -> String {
    match value {
        Some(token) if token.chars().count() > 10 => {
            let chars: Vec<char> = token.chars().collect();
            let prefix: String = chars[..6].iter().collect();
            let suffix: String = chars[chars.len() - 4..].iter().collect();
            format!("{prefix}***{suffix}")
        }
        Some(token) if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum PromptAction {
    Keep,
    Clear,
    Set(String),
}

impl PromptAction {
    fn parse(input: &str) -> Self {
        match input.trim() {
            "" => PromptAction::Keep,
            "-" => PromptAction::Clear,
            value => PromptAction::Set(value.to_string()),
        }
    }
}
