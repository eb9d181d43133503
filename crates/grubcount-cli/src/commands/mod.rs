//! CLI command implementations.

pub mod once;
pub mod save;
pub mod watch;
