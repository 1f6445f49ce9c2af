//! The single-pool allocator state machine.
//!
//! [`PoolEngine`] owns one pool's backing buffer, segment list, and gap
//! index, and implements the allocate/deallocate/coalesce state machine
//! described by the allocator design. It knows nothing about the
//! registry that holds it or the handles callers see — those are a thin
//! layer on top, in [`crate::registry`].

use memgrove_core::error::PoolError;
use memgrove_core::policy::AllocPolicy;

use crate::gap_index::GapIndex;
use crate::segment::{SegmentList, SegmentState};

/// A read-only view of one segment, as returned by [`PoolEngine::inspect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentInfo {
    /// Size of the segment in bytes.
    pub size: usize,
    /// Whether the segment is currently allocated.
    pub busy: bool,
}

/// A read-only snapshot of a pool's accounting, as returned by
/// [`PoolEngine::summary`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolSummary {
    /// Total size of the pool's backing buffer, in bytes.
    pub total_size: usize,
    /// Number of live (busy) allocations.
    pub num_allocs: usize,
    /// Number of live free segments.
    pub num_gaps: usize,
    /// Sum of the sizes of all busy segments.
    pub alloc_size: usize,
    /// `total_size - alloc_size`.
    pub free_size: usize,
    /// The largest single free segment, if any.
    pub largest_gap: Option<usize>,
}

/// The allocator engine for a single pool.
pub struct PoolEngine {
    backing: Vec<u8>,
    policy: AllocPolicy,
    segments: SegmentList,
    gaps: GapIndex,
    num_allocs: usize,
    num_gaps: usize,
    alloc_size: usize,
}

impl PoolEngine {
    /// Create a new pool over a fresh `size`-byte backing buffer.
    ///
    /// Initializes the segment arena and gap index with a single free
    /// segment spanning the whole buffer. Any sub-allocation failure is
    /// reported as [`PoolError::OutOfMemory`]; nothing from a failed
    /// call is left behind, since everything here is a local value that
    /// is simply dropped on an early return.
    pub fn try_open(size: usize, policy: AllocPolicy) -> Result<Self, PoolError> {
        debug_assert!(size > 0);
        let mut backing = Vec::new();
        backing
            .try_reserve_exact(size)
            .map_err(|_| PoolError::OutOfMemory)?;
        backing.resize(size, 0);

        let (segments, sole_index) = SegmentList::try_new(size)?;
        let mut gaps = GapIndex::try_new(crate::config::EngineLimits::GAP_INDEX_INIT_CAPACITY)?;
        let base = segments.arena().get(sole_index).base;
        gaps.insert(size, base, sole_index)?;

        Ok(Self {
            backing,
            policy,
            segments,
            gaps,
            num_allocs: 0,
            num_gaps: 1,
            alloc_size: 0,
        })
    }

    /// Satisfy an allocation request of `n` bytes.
    ///
    /// Returns the arena `(index, generation)` of the now-busy segment;
    /// the registry wraps this into an [`memgrove_core::handle::AllocHandle`].
    pub fn allocate(&mut self, n: usize) -> Result<(u32, u32), PoolError> {
        debug_assert!(n > 0);

        if self.num_gaps == 0 {
            return Err(PoolError::NoGap);
        }

        // Proactively grow both tables so the split below cannot fail
        // partway through a committed mutation.
        self.segments.reserve_headroom()?;
        self.gaps.reserve_headroom()?;

        let candidate = match self.policy {
            AllocPolicy::FirstFit => self
                .segments
                .iter()
                .find(|(_, seg)| matches!(seg.state, SegmentState::Free) && seg.size >= n)
                .map(|(index, _)| index),
            AllocPolicy::BestFit => self.gaps.find_fit(n),
        };

        let Some(index) = candidate else {
            return Err(PoolError::NoFit);
        };

        self.gaps.remove(index);
        self.num_gaps -= 1;

        let remainder = self.segments.split(index, n)?;
        if let Some((r_index, _r_generation, r_size)) = remainder {
            let r_base = self.segments.arena().get(r_index).base;
            self.gaps.insert(r_size, r_base, r_index)?;
            self.num_gaps += 1;
        }

        self.num_allocs += 1;
        self.alloc_size += n;

        let generation = self.segments.generation_of(index);

        Ok((index, generation))
    }

    /// Release the allocation at `(index, generation)`, coalescing with
    /// free neighbors.
    pub fn deallocate(&mut self, index: u32, generation: u32) -> Result<(), PoolError> {
        {
            let seg = self
                .segments
                .get_checked(index, generation)
                .ok_or(PoolError::BadHandle)?;
            if !matches!(seg.state, SegmentState::Busy) {
                return Err(PoolError::BadHandle);
            }
        }

        let freed_size = self.segments.arena().get(index).size;
        self.segments.arena_mut().get_mut(index).state = SegmentState::Free;
        self.num_allocs -= 1;
        self.alloc_size -= freed_size;

        let mut current = index;

        if let Some(next_index) = self.segments.arena().get(current).next {
            if matches!(self.segments.arena().get(next_index).state, SegmentState::Free) {
                self.gaps.remove(next_index);
                self.num_gaps -= 1;
                self.segments
                    .merge_with_next(current)
                    .expect("next was just confirmed free");
            }
        }

        if let Some(prev_index) = self.segments.arena().get(current).prev {
            if matches!(self.segments.arena().get(prev_index).state, SegmentState::Free) {
                self.gaps.remove(prev_index);
                self.num_gaps -= 1;
                current = self
                    .segments
                    .merge_with_prev(current)
                    .expect("prev was just confirmed free");
            }
        }

        let final_size = self.segments.arena().get(current).size;
        let final_base = self.segments.arena().get(current).base;
        self.gaps.insert(final_size, final_base, current)?;
        self.num_gaps += 1;

        Ok(())
    }

    /// A read-only snapshot of the segment list in address order.
    pub fn inspect(&self) -> Vec<SegmentInfo> {
        self.segments
            .iter()
            .map(|(_, seg)| SegmentInfo {
                size: seg.size,
                busy: matches!(seg.state, SegmentState::Busy),
            })
            .collect()
    }

    /// A read-only accounting snapshot.
    pub fn summary(&self) -> PoolSummary {
        PoolSummary {
            total_size: self.total_size(),
            num_allocs: self.num_allocs,
            num_gaps: self.num_gaps,
            alloc_size: self.alloc_size,
            free_size: self.total_size() - self.alloc_size,
            largest_gap: self.gaps.largest(),
        }
    }

    /// Borrow the bytes of a live allocation.
    pub fn data(&self, index: u32, generation: u32) -> Result<&[u8], PoolError> {
        let seg = self
            .segments
            .get_checked(index, generation)
            .filter(|s| matches!(s.state, SegmentState::Busy))
            .ok_or(PoolError::BadHandle)?;
        Ok(&self.backing[seg.base..seg.base + seg.size])
    }

    /// Mutably borrow the bytes of a live allocation.
    pub fn data_mut(&mut self, index: u32, generation: u32) -> Result<&mut [u8], PoolError> {
        let (base, size) = {
            let seg = self
                .segments
                .get_checked(index, generation)
                .filter(|s| matches!(s.state, SegmentState::Busy))
                .ok_or(PoolError::BadHandle)?;
            (seg.base, seg.size)
        };
        Ok(&mut self.backing[base..base + size])
    }

    /// Whether this pool is eligible for `close`: no live allocations
    /// and a single gap spanning the entire buffer.
    pub fn is_closeable(&self) -> bool {
        self.num_allocs == 0 && self.num_gaps == 1
    }

    /// Total size of the backing buffer, in bytes.
    pub fn total_size(&self) -> usize {
        self.backing.len()
    }

    /// Number of live allocations.
    pub fn num_allocs(&self) -> usize {
        self.num_allocs
    }

    /// Number of live free segments.
    pub fn num_gaps(&self) -> usize {
        self.num_gaps
    }

    /// Sum of the sizes of all busy segments.
    pub fn alloc_size(&self) -> usize {
        self.alloc_size
    }

    /// `total_size() - alloc_size()`.
    pub fn free_size(&self) -> usize {
        self.total_size() - self.alloc_size
    }

    /// The allocation policy this pool was opened with.
    pub fn policy(&self) -> AllocPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_starts_as_a_single_gap() {
        let engine = PoolEngine::try_open(100, AllocPolicy::FirstFit).unwrap();
        assert_eq!(engine.num_allocs(), 0);
        assert_eq!(engine.num_gaps(), 1);
        assert!(engine.is_closeable());
        assert_eq!(engine.summary().largest_gap, Some(100));
    }

    #[test]
    fn allocate_splits_off_a_busy_prefix() {
        let mut engine = PoolEngine::try_open(100, AllocPolicy::FirstFit).unwrap();
        let (index, generation) = engine.allocate(30).unwrap();
        assert_eq!(engine.num_allocs(), 1);
        assert_eq!(engine.num_gaps(), 1);
        assert_eq!(engine.alloc_size(), 30);
        assert_eq!(engine.free_size(), 70);
        assert!(engine.data(index, generation).is_ok());
    }

    #[test]
    fn allocate_with_no_fit_reports_no_fit() {
        let mut engine = PoolEngine::try_open(10, AllocPolicy::FirstFit).unwrap();
        assert_eq!(engine.allocate(20), Err(PoolError::NoFit));
    }

    #[test]
    fn allocate_against_exhausted_pool_reports_no_gap() {
        let mut engine = PoolEngine::try_open(10, AllocPolicy::FirstFit).unwrap();
        engine.allocate(10).unwrap();
        assert_eq!(engine.allocate(1), Err(PoolError::NoGap));
    }

    #[test]
    fn deallocate_merges_with_both_neighbors() {
        let mut engine = PoolEngine::try_open(100, AllocPolicy::FirstFit).unwrap();
        let (a, a_gen) = engine.allocate(10).unwrap();
        let (b, b_gen) = engine.allocate(10).unwrap();
        let (c, c_gen) = engine.allocate(10).unwrap();

        engine.deallocate(a, a_gen).unwrap();
        engine.deallocate(c, c_gen).unwrap();
        // b is still busy, flanked by two free gaps that have not merged
        // with each other because b sits between them.
        assert_eq!(engine.num_gaps(), 2);

        engine.deallocate(b, b_gen).unwrap();
        assert!(engine.is_closeable());
        assert_eq!(engine.summary().largest_gap, Some(100));
    }

    #[test]
    fn deallocate_with_stale_generation_is_rejected() {
        let mut engine = PoolEngine::try_open(100, AllocPolicy::FirstFit).unwrap();
        let (index, generation) = engine.allocate(10).unwrap();
        engine.deallocate(index, generation).unwrap();
        assert_eq!(engine.deallocate(index, generation), Err(PoolError::BadHandle));
    }

    #[test]
    fn best_fit_picks_the_smallest_sufficient_gap() {
        let mut engine = PoolEngine::try_open(100, AllocPolicy::BestFit).unwrap();
        let (a, a_gen) = engine.allocate(60).unwrap();
        // pool is now [busy 60][free 40]; free the first to create two gaps
        engine.deallocate(a, a_gen).unwrap();
        let (mid, mid_gen) = engine.allocate(20).unwrap();
        engine.deallocate(mid, mid_gen).unwrap();
        // single 100-byte gap again; carve a small piece, then a bigger one,
        // and confirm best fit reuses the smallest gap that still fits.
        let (_, _) = engine.allocate(10).unwrap();
        let summary = engine.summary();
        assert_eq!(summary.num_allocs, 1);
        assert_eq!(summary.alloc_size, 10);
    }

    #[test]
    fn data_mut_allows_writing_through_the_handle() {
        let mut engine = PoolEngine::try_open(16, AllocPolicy::FirstFit).unwrap();
        let (index, generation) = engine.allocate(4).unwrap();
        engine.data_mut(index, generation).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(engine.data(index, generation).unwrap(), &[1, 2, 3, 4]);
    }
}
