pub mod changelog;
pub mod release_notes;
