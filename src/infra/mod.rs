pub mod anthropic;
pub mod git;
