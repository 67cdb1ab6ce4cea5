pub mod changelog;
pub mod commit;
pub mod log_text;
pub mod prompt;
