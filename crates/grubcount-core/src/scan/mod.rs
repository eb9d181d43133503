//! Signature scan for the grub counter node
//!
//! # Search Strategy
//!
//! The game's garbage collector leaves old generations of the counter node
//! behind, so a signature search over readable memory finds the live node
//! plus a number of structurally identical decoys:
//!
//! 1. Every readable region is read whole and searched for the 12-byte
//!    node signature ([`SignatureScanner`]).
//! 2. Each hit becomes a [`Candidate`] carrying its count and a locality
//!    score: how many of its three link fields point into nearby heap.
//! 3. [`select_active`] drops score-0 candidates (dead nodes), keeps the best
//!    score and breaks ties by the highest count.
//!
//! The sweep is the expensive path. Once a node is known the tracker reads
//! its count directly with [`read_count_at`].

mod disambiguate;
mod scanner;

pub use disambiguate::{Selection, is_local_pointer, locality_score, select_active};
pub use scanner::{SignatureHit, SignatureScanner, read_count_at};

/// A scored signature hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute address of the signature start
    pub node_address: u64,
    pub value: u32,
    /// Number of link fields that look like nearby heap pointers (0-3)
    pub locality_score: u8,
}

/// Result of one full sweep
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Every plausible candidate, in scan order
    pub candidates: Vec<Candidate>,
    pub selection: Selection,
}

impl ScanReport {
    /// Candidates that survive the dead-node filter
    pub fn active_candidates(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(|c| c.locality_score > 0)
    }
}
