//! In-memory process backend for tests
//!
//! `MockMemoryReader` holds synthetic regions behind shared state, so a test
//! can keep a clone and mutate memory, liveness or visibility while a
//! tracker owns the attached `MockProcess`.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::memory::layout::{node, process::PROCESS_NAME};
use crate::memory::{MemoryAccess, MemoryRegion, ProcessProvider, ReadMemory};

pub const MOCK_PID: u32 = 4242;

#[derive(Debug, Default)]
struct MockState {
    regions: Vec<(u64, Vec<u8>)>,
    unreadable: Vec<MemoryRegion>,
    alive: bool,
    running: bool,
    deny_attach: bool,
    region_queries: usize,
    attaches: usize,
    releases: usize,
}

#[derive(Debug, Default)]
pub struct MockMemoryBuilder {
    regions: Vec<(u64, Vec<u8>)>,
    unreadable: Vec<MemoryRegion>,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(mut self, base: u64, bytes: Vec<u8>) -> Self {
        self.regions.push((base, bytes));
        self
    }

    /// A region that is enumerated but fails every read
    pub fn unreadable_region(mut self, base: u64, size: u64) -> Self {
        self.unreadable.push(MemoryRegion::new(base, size));
        self
    }

    pub fn build(self) -> MockMemoryReader {
        MockMemoryReader {
            state: Arc::new(Mutex::new(MockState {
                regions: self.regions,
                unreadable: self.unreadable,
                alive: true,
                running: true,
                ..Default::default()
            })),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockMemoryReader {
    state: Arc<Mutex<MockState>>,
}

impl MockMemoryReader {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn write_u32(&self, address: u64, value: u32) {
        let mut state = self.lock();
        let (base, bytes) = state
            .regions
            .iter_mut()
            .find(|(base, bytes)| address >= *base && address + 4 <= *base + bytes.len() as u64)
            .expect("write outside mock regions");
        let offset = (address - *base) as usize;
        bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Remove the region starting at `base`
    pub fn unmap(&self, base: u64) {
        self.lock().regions.retain(|(b, _)| *b != base);
    }

    pub fn set_alive(&self, alive: bool) {
        self.lock().alive = alive;
    }

    /// Whether process discovery finds the game
    pub fn set_running(&self, running: bool) {
        self.lock().running = running;
    }

    pub fn set_deny_attach(&self, deny: bool) {
        self.lock().deny_attach = deny;
    }

    /// Number of region enumerations, i.e. full scans
    pub fn full_scans(&self) -> usize {
        self.lock().region_queries
    }

    pub fn attaches(&self) -> usize {
        self.lock().attaches
    }

    pub fn releases(&self) -> usize {
        self.lock().releases
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let state = self.lock();
        for (base, bytes) in &state.regions {
            let end = *base + bytes.len() as u64;
            if address >= *base && address < end {
                let start = (address - base) as usize;
                let stop = (start + size).min(bytes.len());
                return Ok(bytes[start..stop].to_vec());
            }
        }
        Err(Error::MemoryReadFailed {
            address,
            message: "unmapped".to_string(),
        })
    }
}

impl MemoryAccess for MockMemoryReader {
    fn pid(&self) -> u32 {
        MOCK_PID
    }

    fn readable_regions(&self) -> Result<Vec<MemoryRegion>> {
        let mut state = self.lock();
        state.region_queries += 1;
        let mut regions: Vec<MemoryRegion> = state
            .regions
            .iter()
            .map(|(base, bytes)| MemoryRegion::new(*base, bytes.len() as u64))
            .collect();
        regions.extend(state.unreadable.iter().copied());
        regions.sort_by_key(|r| r.base_address);
        Ok(regions)
    }

    fn is_alive(&self) -> bool {
        self.lock().alive
    }
}

/// Attached handle; counts releases on drop
#[derive(Debug)]
pub struct MockProcess {
    memory: MockMemoryReader,
}

impl ReadMemory for MockProcess {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        self.memory.read_bytes(address, size)
    }
}

impl MemoryAccess for MockProcess {
    fn pid(&self) -> u32 {
        MOCK_PID
    }

    fn readable_regions(&self) -> Result<Vec<MemoryRegion>> {
        self.memory.readable_regions()
    }

    fn is_alive(&self) -> bool {
        self.memory.is_alive()
    }
}

impl Drop for MockProcess {
    fn drop(&mut self) {
        self.memory.lock().releases += 1;
    }
}

#[derive(Debug, Clone)]
pub struct MockProvider {
    memory: MockMemoryReader,
}

impl MockProvider {
    pub fn new(memory: MockMemoryReader) -> Self {
        Self { memory }
    }
}

impl ProcessProvider for MockProvider {
    type Process = MockProcess;

    fn find_process(&self, name: &str) -> Option<u32> {
        let running = self.memory.lock().running;
        (running && name.eq_ignore_ascii_case(PROCESS_NAME)).then_some(MOCK_PID)
    }

    fn attach(&self, pid: u32) -> Result<MockProcess> {
        let mut state = self.memory.lock();
        if state.deny_attach {
            return Err(Error::Attach {
                pid,
                message: "Access is denied.".to_string(),
            });
        }
        state.attaches += 1;
        drop(state);
        Ok(MockProcess {
            memory: self.memory.clone(),
        })
    }
}

/// Write a counter node at `offset` of `buf`: three link fields, the
/// signature and the count.
pub fn place_node(buf: &mut [u8], offset: usize, links: [u32; 3], count: u32) {
    for (link, back) in links.iter().zip(node::LOCALITY_OFFSETS) {
        let at = offset - back;
        buf[at..at + 4].copy_from_slice(&link.to_le_bytes());
    }
    buf[offset..offset + node::SIGNATURE.len()].copy_from_slice(&node::SIGNATURE);
    let at = offset + node::COUNT_OFFSET;
    buf[at..at + 4].copy_from_slice(&count.to_le_bytes());
}
