//! # grubcount-core
//!
//! Core library for the Tales of Monkey Island 3 grub counter.
//!
//! This crate provides:
//! - Read-only process memory access (Windows and Linux)
//! - Signature scanning and active-node selection
//! - A polling tracker that caches the located node between ticks
//! - Save file decoding
//! - Text file output and persisted settings

pub mod config;
pub mod error;
pub mod memory;
pub mod monitor;
pub mod save;
pub mod scan;
pub mod shutdown;
pub mod stream;
pub mod tracker;

pub use config::Config;
pub use error::{Error, Result};
#[cfg(any(target_os = "linux", target_os = "windows"))]
pub use memory::DefaultProvider;
pub use memory::{MemoryAccess, MemoryRegion, ProcessProvider, ReadMemory};
pub use monitor::Monitor;
pub use save::{SaveEntry, SaveError};
pub use scan::{Candidate, ScanReport, Selection, SignatureScanner};
pub use shutdown::ShutdownSignal;
pub use stream::{StreamOutput, format_count};
pub use tracker::{Status, Tracker, TrackerEvent, TrackerState};
