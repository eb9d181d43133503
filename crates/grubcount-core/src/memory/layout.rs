//! Memory layout constants for the grub counter node
//!
//! This module centralizes the byte layout used to find and read the
//! `nGrubsCollected` node. Offsets are relative to the start of the
//! signature (the node's first hash field).

/// Memory layout of the live counter node
///
/// ```text
///   -0x10   -0x0C   -0x08   -0x04   +0x00   +0x04   +0x08   +0x0C
/// ┌───────┬───────┬───────┬───────┬───────┬───────┬───────┬───────┐
/// │ link  │ link  │ link  │  ...  │ hash1 │ hash2 │ type  │ count │
/// └───────┴───────┴───────┴───────┴───────┴───────┴───────┴───────┘
///                                  └──────── SIGNATURE ──────┘
/// ```
pub mod node {
    /// Word size (4 bytes / 32-bit integer)
    pub const WORD: usize = 4;

    /// hash1 + hash2 + Int type descriptor, little-endian
    pub const SIGNATURE: [u8; 12] = [
        0xA1, 0x5A, 0x21, 0x97, // hash1
        0x53, 0xC0, 0x0E, 0x51, // hash2
        0x5C, 0x8F, 0x8D, 0x00, // type descriptor
    ];

    /// Count DWORD follows the signature
    pub const COUNT_OFFSET: usize = 0x0C;

    /// Largest plausible count. Anything above is incidental byte alignment.
    pub const COUNT_MAX: u32 = 200_000;

    /// Distance before the signature of each link field. In the active node
    /// these hold nearby heap pointers.
    pub const LOCALITY_OFFSETS: [usize; 3] = [0x10, 0x0C, 0x08];

    /// Matches closer to the buffer start than this cannot carry the link fields
    pub const MIN_MATCH_OFFSET: usize = 0x10;

    /// Active node pointers stay within 4 MiB of the node itself
    pub const LOCALITY_MAX_DELTA: u64 = 4 * 1024 * 1024;

    /// Plausible heap range (excludes the EXE image, stacks and kernel space)
    pub const HEAP_MIN: u32 = 0x0100_0000;
    pub const HEAP_MAX: u32 = 0x7FFF_FFFF;
}

/// Save file layout (Telltale `.save`)
pub mod save {
    /// Raw first 4 bytes of every save file
    pub const FILE_MAGIC: [u8; 4] = [0xAA, 0xDE, 0xAF, 0x64];

    /// XOR key applied to every byte after the magic
    pub const XOR_KEY: u8 = 0xFF;

    /// Decoded bytes that always appear directly before the grub count
    pub const SIGNATURE: [u8; 16] = [
        0x02, 0x00, 0x00, 0x00, // field tag
        0xA1, 0x5A, 0x21, 0x97, // hash1
        0x53, 0xC0, 0x0E, 0x51, // hash2
        0x00, 0x00, 0x00, 0x00,
    ];
}

/// Target process identity
pub mod process {
    /// Image name of Tales of Monkey Island 3
    pub const PROCESS_NAME: &str = "MonkeyIsland103.exe";
}

/// Timing constants for polling
pub mod timing {
    /// Interval between tracker polls (ms)
    pub const POLL_INTERVAL_MS: u64 = 1000;

    /// How often a consumer drains the worker channel (ms)
    pub const EVENT_DRAIN_INTERVAL_MS: u64 = 50;
}

/// Decode a little-endian u32 at `offset`, if it fits in `buf`
#[inline]
pub fn read_u32_le(buf: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(node::WORD)?;
    let bytes = buf.get(offset..end)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
