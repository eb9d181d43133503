use std::iter;

use memchr::memmem;
use tracing::{debug, trace};

use super::{Candidate, ScanReport, locality_score, select_active};
use crate::memory::layout::{node, read_u32_le};
use crate::memory::{MemoryAccess, ReadMemory};

/// One raw signature occurrence inside a region buffer
#[derive(Debug, Clone, Copy)]
pub struct SignatureHit<'a> {
    /// Absolute address of the signature start
    pub address: u64,
    pub region: &'a [u8],
    pub offset: usize,
}

impl SignatureHit<'_> {
    /// The count DWORD following the signature
    pub fn count(&self) -> Option<u32> {
        read_u32_le(self.region, self.offset + node::COUNT_OFFSET)
    }

    /// Score the hit. Implausible counts are incidental byte alignment, not
    /// the counter field, and yield `None`.
    pub fn to_candidate(&self) -> Option<Candidate> {
        let value = self.count().filter(|&v| v <= node::COUNT_MAX)?;
        Some(Candidate {
            node_address: self.address,
            value,
            locality_score: locality_score(self.region, self.offset, self.address),
        })
    }
}

pub struct SignatureScanner {
    finder: memmem::Finder<'static>,
}

impl SignatureScanner {
    pub fn new() -> Self {
        Self {
            finder: memmem::Finder::new(&node::SIGNATURE),
        }
    }

    /// All usable signature matches in `buffer`, which starts at `base`.
    ///
    /// The search restarts one byte past each match so overlapping
    /// occurrences are kept. Matches without room for the link fields before
    /// them or the count after them are skipped.
    pub fn hits<'a>(
        &'a self,
        base: u64,
        buffer: &'a [u8],
    ) -> impl Iterator<Item = SignatureHit<'a>> + 'a {
        let mut pos = 0;
        iter::from_fn(move || {
            loop {
                let offset = pos + self.finder.find(buffer.get(pos..)?)?;
                pos = offset + 1;

                if offset < node::MIN_MATCH_OFFSET {
                    continue;
                }
                if offset + node::COUNT_OFFSET + node::WORD > buffer.len() {
                    continue;
                }
                return Some(SignatureHit {
                    address: base + offset as u64,
                    region: buffer,
                    offset,
                });
            }
        })
    }

    /// Plausible candidates in one region buffer
    pub fn candidates_in(&self, base: u64, buffer: &[u8]) -> Vec<Candidate> {
        self.hits(base, buffer)
            .filter_map(|hit| hit.to_candidate())
            .collect()
    }

    /// Sweep every readable region of the process.
    ///
    /// Regions that fail to read are skipped; the sweep never aborts.
    pub fn scan<M: MemoryAccess + ?Sized>(&self, memory: &M) -> Vec<Candidate> {
        let regions = match memory.readable_regions() {
            Ok(regions) => regions,
            Err(e) => {
                debug!("Region enumeration failed: {}", e);
                return Vec::new();
            }
        };

        let mut candidates = Vec::new();
        let mut scanned_bytes = 0u64;
        for region in &regions {
            let Ok(size) = usize::try_from(region.size) else {
                continue;
            };
            let buffer = match memory.read_bytes(region.base_address, size) {
                Ok(buffer) => buffer,
                Err(e) => {
                    debug!("Skipping region 0x{:X}: {}", region.base_address, e);
                    continue;
                }
            };
            scanned_bytes += buffer.len() as u64;
            candidates.extend(self.candidates_in(region.base_address, &buffer));
        }

        debug!(
            "Scanned {} regions ({} MB), {} candidates",
            regions.len(),
            scanned_bytes / (1024 * 1024),
            candidates.len()
        );
        candidates
    }

    /// Full sweep followed by candidate selection
    pub fn locate<M: MemoryAccess + ?Sized>(&self, memory: &M) -> ScanReport {
        let candidates = self.scan(memory);
        for c in &candidates {
            trace!(
                "  candidate: addr=0x{:08X}  value={:6}  local_ptrs={}",
                c.node_address, c.value, c.locality_score
            );
        }
        let selection = select_active(&candidates);
        ScanReport {
            candidates,
            selection,
        }
    }
}

impl Default for SignatureScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheap path: read the count of a known node directly.
///
/// Returns `None` if the read fails or the value is implausible.
pub fn read_count_at<R: ReadMemory + ?Sized>(memory: &R, node_address: u64) -> Option<u32> {
    let address = node_address.checked_add(node::COUNT_OFFSET as u64)?;
    memory
        .read_u32(address)
        .ok()
        .filter(|&value| value <= node::COUNT_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mock::{MockMemoryBuilder, place_node};
    use crate::scan::Selection;

    const BASE: u64 = 0x0200_0000;

    fn local_links(node_address: u64) -> [u32; 3] {
        let near = node_address as u32;
        [near + 0x40, near - 0x80, near + 0x1000]
    }

    #[test]
    fn test_hits_skips_match_too_close_to_start() {
        let scanner = SignatureScanner::new();
        let mut buf = vec![0u8; 0x40];
        buf[0x08..0x14].copy_from_slice(&node::SIGNATURE);
        assert_eq!(scanner.hits(BASE, &buf).count(), 0);
    }

    #[test]
    fn test_hits_skips_truncated_count() {
        let scanner = SignatureScanner::new();
        let mut buf = vec![0u8; 0x10 + node::SIGNATURE.len() + 2];
        buf[0x10..0x1C].copy_from_slice(&node::SIGNATURE);
        assert_eq!(scanner.hits(BASE, &buf).count(), 0);
    }

    #[test]
    fn test_hits_absolute_address_and_count() {
        let scanner = SignatureScanner::new();
        let mut buf = vec![0u8; 0x100];
        place_node(&mut buf, 0x40, [0; 3], 31);
        place_node(&mut buf, 0x80, [0; 3], 32);

        let hits: Vec<_> = scanner.hits(BASE, &buf).collect();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].address, BASE + 0x40);
        assert_eq!(hits[0].count(), Some(31));
        assert_eq!(hits[1].address, BASE + 0x80);
        assert_eq!(hits[1].count(), Some(32));
    }

    #[test]
    fn test_count_roundtrip_within_bounds() {
        let scanner = SignatureScanner::new();
        for count in [0, 1, 54, 199_999, node::COUNT_MAX] {
            let mut buf = vec![0u8; 0x40];
            place_node(&mut buf, 0x10, [0; 3], count);
            let candidates = scanner.candidates_in(BASE, &buf);
            assert_eq!(candidates.len(), 1, "count {}", count);
            assert_eq!(candidates[0].value, count);
        }
    }

    #[test]
    fn test_implausible_count_rejected() {
        let scanner = SignatureScanner::new();
        for count in [node::COUNT_MAX + 1, 0x0100_0000, u32::MAX] {
            let mut buf = vec![0u8; 0x40];
            place_node(&mut buf, 0x10, [0; 3], count);
            assert!(scanner.candidates_in(BASE, &buf).is_empty(), "count {}", count);
        }
    }

    #[test]
    fn test_active_node_found_among_decoys() {
        let mut buf = vec![0u8; 0x1000];
        place_node(&mut buf, 0x100, [0; 3], 0);
        place_node(&mut buf, 0x200, [0x11FB_0000, 0, 0x11FB_0040], 17);
        place_node(&mut buf, 0x300, local_links(BASE + 0x300), 23);
        place_node(&mut buf, 0x400, [0; 3], 40);

        let memory = MockMemoryBuilder::new().region(BASE, buf).build();
        let report = SignatureScanner::new().locate(&memory);

        assert_eq!(report.candidates.len(), 4);
        assert_eq!(report.active_candidates().count(), 1);
        assert_eq!(report.selection.value(), Some(23));
        assert_eq!(report.selection.chosen().unwrap().node_address, BASE + 0x300);
    }

    #[test]
    fn test_zero_decoy_with_same_score_loses() {
        let mut heap = vec![0u8; 0x800];
        place_node(&mut heap, 0x100, local_links(BASE + 0x100), 0);
        place_node(&mut heap, 0x600, local_links(BASE + 0x600), 9);

        let memory = MockMemoryBuilder::new().region(BASE, heap).build();
        let report = SignatureScanner::new().locate(&memory);
        assert_eq!(report.selection.value(), Some(9));
        assert!(!report.selection.is_ambiguous());
    }

    #[test]
    fn test_unreadable_region_is_skipped() {
        let other = 0x0400_0000;
        let mut buf = vec![0u8; 0x100];
        place_node(&mut buf, 0x20, local_links(other + 0x20), 5);

        let memory = MockMemoryBuilder::new()
            .unreadable_region(0x0100_0000, 0x1000)
            .region(other, buf)
            .build();
        let report = SignatureScanner::new().locate(&memory);
        assert_eq!(report.selection.value(), Some(5));
    }

    #[test]
    fn test_no_candidates_is_not_found() {
        let memory = MockMemoryBuilder::new()
            .region(BASE, vec![0xCC; 0x400])
            .build();
        let report = SignatureScanner::new().locate(&memory);
        assert!(report.candidates.is_empty());
        assert_eq!(report.selection, Selection::NotFound);
    }

    #[test]
    fn test_read_count_at() {
        let mut buf = vec![0u8; 0x80];
        place_node(&mut buf, 0x20, [0; 3], 77);
        place_node(&mut buf, 0x50, [0; 3], node::COUNT_MAX + 5);
        let memory = MockMemoryBuilder::new().region(BASE, buf).build();

        assert_eq!(read_count_at(&memory, BASE + 0x20), Some(77));
        assert_eq!(read_count_at(&memory, BASE + 0x50), None);
        assert_eq!(read_count_at(&memory, 0x10), None);
    }
}
