//! Locality heuristic for picking the live node among GC decoys

use tracing::{debug, warn};

use super::Candidate;
use crate::memory::layout::{node, read_u32_le};

/// Outcome of candidate selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// No candidate has a nearby heap pointer
    #[default]
    NotFound,
    Unique(Candidate),
    /// Several candidates share the best score and the highest count.
    /// `chosen` is the first of them in scan order.
    Tied { chosen: Candidate, rivals: usize },
}

impl Selection {
    pub fn chosen(&self) -> Option<Candidate> {
        match *self {
            Selection::NotFound => None,
            Selection::Unique(candidate) | Selection::Tied { chosen: candidate, .. } => {
                Some(candidate)
            }
        }
    }

    pub fn value(&self) -> Option<u32> {
        self.chosen().map(|c| c.value)
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Selection::Tied { .. })
    }
}

/// A link field value that points into plausible heap near the node
pub fn is_local_pointer(value: u32, node_address: u64) -> bool {
    if value == 0 || !(node::HEAP_MIN..=node::HEAP_MAX).contains(&value) {
        return false;
    }
    u64::from(value).abs_diff(node_address) <= node::LOCALITY_MAX_DELTA
}

/// Count local pointers among the link fields before the match at `offset`
pub fn locality_score(buffer: &[u8], offset: usize, node_address: u64) -> u8 {
    node::LOCALITY_OFFSETS
        .iter()
        .filter_map(|&back| offset.checked_sub(back))
        .filter_map(|at| read_u32_le(buffer, at))
        .filter(|&value| is_local_pointer(value, node_address))
        .count() as u8
}

/// Pick the active node.
///
/// Score-0 candidates are dead. Among the rest only the best score counts;
/// a remaining tie goes to the highest count, since a persistent zero-valued
/// decoy can share the live node's score.
pub fn select_active(candidates: &[Candidate]) -> Selection {
    let best_score = candidates
        .iter()
        .map(|c| c.locality_score)
        .max()
        .unwrap_or(0);
    if best_score == 0 {
        return Selection::NotFound;
    }

    let top: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.locality_score == best_score)
        .collect();
    let best_value = top.iter().map(|c| c.value).max().unwrap_or(0);

    let mut leaders = top.into_iter().filter(|c| c.value == best_value);
    let Some(&chosen) = leaders.next() else {
        return Selection::NotFound;
    };
    let rivals = leaders.count();

    if rivals == 0 {
        debug!(
            "Active node 0x{:08X} (value={}, local_ptrs={})",
            chosen.node_address, chosen.value, chosen.locality_score
        );
        return Selection::Unique(chosen);
    }

    warn!(
        "{} candidates tie on local_ptrs={} and value={}; using 0x{:08X}",
        rivals + 1,
        best_score,
        best_value,
        chosen.node_address
    );
    Selection::Tied { chosen, rivals }
}
