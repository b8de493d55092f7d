use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrayvec::ArrayVec;

use crate::bitmask::Mask;

/// Upper bound on search depth, i.e. on the number of groups a problem may
/// hold. Real workloads stay far below this (one group per ship).
pub const MAX_GROUPS: usize = 64;

/// Shared cancellation flag. Cloning hands out another handle to the same
/// flag; `is_cancelled` is a relaxed atomic load cheap enough to sit at the
/// recursion entry.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// One group's candidate masks split into parallel limb columns.
///
/// The disjointness test walks `hi` and `lo` as flat `u64` arrays instead of
/// chasing through a slice of two-limb structs.
#[derive(Clone, Debug)]
pub struct GroupColumns {
    pub hi: Vec<u64>,
    pub lo: Vec<u64>,
}

impl GroupColumns {
    pub fn from_masks(masks: &[Mask]) -> Self {
        Self {
            hi: masks.iter().map(|m| m.hi).collect(),
            lo: masks.iter().map(|m| m.lo).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hi.len()
    }

    #[inline]
    pub fn mask_at(&self, idx: usize) -> Mask {
        Mask::from_limbs(self.hi[idx], self.lo[idx])
    }
}

/// Depth-first disjointness search over precombined groups.
///
/// Holds only shared read-only state; every worker builds its own `Searcher`
/// over the same group columns. Output buffers are owned by the caller.
pub struct Searcher<'a> {
    groups: &'a [GroupColumns],
    cancel: &'a CancelToken,
}

impl<'a> Searcher<'a> {
    pub fn new(groups: &'a [GroupColumns], cancel: &'a CancelToken) -> Self {
        Self { groups, cancel }
    }

    /// Number of leaves below `(depth, running union)`. Returns 0 once the
    /// token fires; the driver re-checks the token afterwards and discards
    /// the partial sum.
    pub fn count(&self, depth: usize, mask_hi: u64, mask_lo: u64) -> u64 {
        if self.cancel.is_cancelled() {
            return 0;
        }
        if depth == self.groups.len() {
            return 1;
        }
        let group = &self.groups[depth];
        let mut total = 0u64;
        for (&hi, &lo) in group.hi.iter().zip(group.lo.iter()) {
            if hi & mask_hi == 0 && lo & mask_lo == 0 {
                total += self.count(depth + 1, mask_hi | hi, mask_lo | lo);
            }
        }
        total
    }

    /// Push the union mask of every leaf below `(depth, running union)`.
    pub fn collect_masks(&self, depth: usize, mask_hi: u64, mask_lo: u64, out: &mut Vec<Mask>) {
        if self.cancel.is_cancelled() {
            return;
        }
        if depth == self.groups.len() {
            out.push(Mask::from_limbs(mask_hi, mask_lo));
            return;
        }
        let group = &self.groups[depth];
        for (&hi, &lo) in group.hi.iter().zip(group.lo.iter()) {
            if hi & mask_hi == 0 && lo & mask_lo == 0 {
                self.collect_masks(depth + 1, mask_hi | hi, mask_lo | lo, out);
            }
        }
    }

    /// Push the candidate-index path of every leaf below `(depth, running
    /// union)`. `path` carries the indices already chosen above this depth.
    pub fn collect_indices(
        &self,
        depth: usize,
        mask_hi: u64,
        mask_lo: u64,
        path: &mut ArrayVec<u32, MAX_GROUPS>,
        out: &mut Vec<Vec<u32>>,
    ) {
        if self.cancel.is_cancelled() {
            return;
        }
        if depth == self.groups.len() {
            out.push(path.to_vec());
            return;
        }
        let group = &self.groups[depth];
        for (idx, (&hi, &lo)) in group.hi.iter().zip(group.lo.iter()).enumerate() {
            if hi & mask_hi == 0 && lo & mask_lo == 0 {
                path.push(idx as u32);
                self.collect_indices(depth + 1, mask_hi | hi, mask_lo | lo, path, out);
                path.pop();
            }
        }
    }
}


// The recursion carries the running union as two bare u64s rather than a Mask
// so the candidate test compiles down to two ANDs + two compares per entry.
// Stack depth equals the number of groups, never the candidate counts.
