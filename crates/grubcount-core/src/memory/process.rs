use crate::error::{Error, Result};
use crate::memory::ReadMemory;

/// A contiguous, committed and readable span of the target's address space.
///
/// Regions are re-enumerated on every full scan; they are never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    pub base_address: u64,
    pub size: u64,
}

impl MemoryRegion {
    pub fn new(base_address: u64, size: u64) -> Self {
        Self { base_address, size }
    }

    /// End address (exclusive)
    #[inline]
    pub fn end(&self) -> u64 {
        self.base_address.saturating_add(self.size)
    }

    #[inline]
    pub fn contains(&self, address: u64) -> bool {
        address >= self.base_address && address < self.end()
    }
}

/// An attached target process.
///
/// Dropping the value releases the OS handle.
pub trait MemoryAccess: ReadMemory {
    fn pid(&self) -> u32;

    /// All committed, readable, non-guard regions of the process
    fn readable_regions(&self) -> Result<Vec<MemoryRegion>>;

    fn is_alive(&self) -> bool;
}

/// Process discovery and attach for one platform.
pub trait ProcessProvider {
    type Process: MemoryAccess;

    /// Find a running process by image name
    fn find_process(&self, name: &str) -> Option<u32>;

    /// Open the process for reading.
    ///
    /// Fails with [`Error::Attach`] when the OS denies access.
    fn attach(&self, pid: u32) -> Result<Self::Process>;

    fn find_and_attach(&self, name: &str) -> Result<Self::Process> {
        let pid = self
            .find_process(name)
            .ok_or_else(|| Error::ProcessNotFound(name.to_string()))?;
        self.attach(pid)
    }
}
