pub mod config;
pub mod notes;
