use crate::error::{Error, Result};
use crate::memory::layout::read_u32_le;

/// Best-effort reads from another process's address space.
///
/// Implementations must never panic on unmapped or partially mapped
/// addresses; they return [`Error::MemoryReadFailed`] instead. A partial
/// read may return fewer bytes than requested.
pub trait ReadMemory {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    fn read_u32(&self, address: u64) -> Result<u32> {
        let bytes = self.read_bytes(address, 4)?;
        read_u32_le(&bytes, 0).ok_or_else(|| Error::MemoryReadFailed {
            address,
            message: format!("short read ({} of 4 bytes)", bytes.len()),
        })
    }
}
