pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod compose;
pub mod config;
pub mod limit;
pub mod show;
pub mod status;
pub mod sync;
pub mod wipe;
pub mod write;
