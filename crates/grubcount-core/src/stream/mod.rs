//! Text file output for stream overlays.
//!
//! The current grub count is written to a single file that an OBS text
//! source (or anything else watching the file) can display live.

mod output;

pub use output::*;
