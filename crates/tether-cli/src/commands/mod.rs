pub mod config;
pub mod delete;
pub mod download;
pub mod forget;
pub mod list;
pub mod prune;
pub mod retry;
pub mod revert;
pub mod watch;
