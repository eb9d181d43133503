pub mod layout;
mod process;
mod reader;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "windows")]
mod windows;

#[cfg(test)]
pub mod mock;

#[cfg(target_os = "linux")]
pub use linux::{LinuxProcess, LinuxProvider};
pub use process::{MemoryAccess, MemoryRegion, ProcessProvider};
pub use reader::ReadMemory;
#[cfg(target_os = "windows")]
pub use windows::{WindowsProcess, WindowsProvider};

/// Provider for the host OS
#[cfg(target_os = "windows")]
pub type DefaultProvider = WindowsProvider;

/// Provider for the host OS
#[cfg(target_os = "linux")]
pub type DefaultProvider = LinuxProvider;
