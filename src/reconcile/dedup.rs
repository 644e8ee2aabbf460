use std::collections::HashSet;

use crate::models::ExpenseCandidate;

/// Candidates split into new versus previously-imported, both index lists
/// preserving candidate order
#[derive(Debug, Clone, Default)]
pub struct DedupPartition {
    pub new: Vec<usize>,
    pub duplicates: Vec<usize>,
}

impl DedupPartition {
    pub fn is_duplicate(&self, index: usize) -> bool {
        self.duplicates.contains(&index)
    }
}

/// Partition candidates against the already-imported hash set.
///
/// Pure set membership: recording an accepted hash happens at import time,
/// after user confirmation, so previewing the same export twice never
/// marks messages as seen.
pub fn partition_seen(candidates: &[ExpenseCandidate], seen: &HashSet<String>) -> DedupPartition {
    let mut partition = DedupPartition::default();

    for (index, candidate) in candidates.iter().enumerate() {
        if seen.contains(&candidate.message.hash) {
            partition.duplicates.push(index);
        } else {
            partition.new.push(index);
        }
    }

    partition
}
