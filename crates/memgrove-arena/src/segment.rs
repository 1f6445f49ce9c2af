//! Contiguous segments and the address-ordered doubly-linked segment list.
//!
//! A [`Segment`] is a contiguous byte range of a pool's backing buffer,
//! either free (a gap) or busy (an allocation). Segments live in a
//! [`SegmentArena`], a growable table referenced by index rather than by
//! pointer — so a `Vec` reallocation on growth never invalidates a live
//! reference. [`SegmentList`] threads the arena's slots into the
//! address-ordered doubly-linked list the allocator walks and splits.

use memgrove_core::error::PoolError;

use crate::config::EngineLimits;

/// Whether a segment is free (a gap) or busy (an allocation).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SegmentState {
    Free,
    Busy,
}

/// A single entry in the segment arena.
#[derive(Clone, Debug)]
pub(crate) struct Segment {
    pub(crate) base: usize,
    pub(crate) size: usize,
    pub(crate) state: SegmentState,
    live: bool,
    generation: u32,
    prev: Option<u32>,
    next: Option<u32>,
}

/// Growable table of [`Segment`] records, addressed by index.
///
/// Freed slots are threaded onto `free_list` and reused before the
/// backing `Vec` is grown. Reuse bumps the slot's generation counter,
/// so a stale index paired with its old generation is distinguishable
/// from a fresh allocation that happens to land on the same slot.
pub(crate) struct SegmentArena {
    slots: Vec<Segment>,
    free_list: Vec<u32>,
}

impl SegmentArena {
    pub(crate) fn try_new(capacity: usize) -> Result<Self, PoolError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity).map_err(|_| PoolError::OutOfMemory)?;
        Ok(Self {
            slots,
            free_list: Vec::new(),
        })
    }

    fn ensure_headroom(&mut self) -> Result<(), PoolError> {
        if !self.free_list.is_empty() {
            return Ok(());
        }
        if !EngineLimits::should_grow(self.slots.len(), self.slots.capacity()) {
            return Ok(());
        }
        let target = (self.slots.capacity().max(1)) * EngineLimits::GROWTH_FACTOR;
        let extra = target.saturating_sub(self.slots.capacity());
        if extra > 0 {
            self.slots
                .try_reserve(extra)
                .map_err(|_| PoolError::OutOfMemory)?;
        }
        Ok(())
    }

    /// Insert a new segment record, reusing a freed slot if one exists.
    /// Returns the slot's index and its current generation.
    pub(crate) fn insert(
        &mut self,
        base: usize,
        size: usize,
        state: SegmentState,
        prev: Option<u32>,
        next: Option<u32>,
    ) -> Result<(u32, u32), PoolError> {
        self.ensure_headroom()?;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.base = base;
            slot.size = size;
            slot.state = state;
            slot.live = true;
            slot.prev = prev;
            slot.next = next;
            return Ok((index, slot.generation));
        }
        let index = self.slots.len() as u32;
        self.slots.push(Segment {
            base,
            size,
            state,
            live: true,
            generation: 0,
            prev,
            next,
        });
        Ok((index, 0))
    }

    /// Retire a slot, returning it to the free list and bumping its
    /// generation so outstanding references to it are detectably stale.
    pub(crate) fn free(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.live = false;
        slot.prev = None;
        slot.next = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(index);
    }

    pub(crate) fn get(&self, index: u32) -> &Segment {
        &self.slots[index as usize]
    }

    pub(crate) fn get_mut(&mut self, index: u32) -> &mut Segment {
        &mut self.slots[index as usize]
    }

    /// The slot's current generation, regardless of liveness.
    pub(crate) fn generation_of(&self, index: u32) -> u32 {
        self.slots[index as usize].generation
    }

    /// Resolve an index+generation pair, rejecting stale or dead slots.
    pub(crate) fn get_checked(&self, index: u32, generation: u32) -> Option<&Segment> {
        self.slots
            .get(index as usize)
            .filter(|s| s.live && s.generation == generation)
    }

    #[cfg(test)]
    pub(crate) fn used(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }
}

/// Address-ordered doubly-linked list of a pool's segments.
///
/// Wraps a [`SegmentArena`] plus the index of the list's head (lowest
/// base address). `split`, `merge_with_next`, and `merge_with_prev`
/// implement §4.A of the allocator design: splitting carves a busy
/// prefix off a free segment, and merging absorbs an adjacent free
/// neighbor into the segment being operated on.
pub(crate) struct SegmentList {
    arena: SegmentArena,
    head: u32,
}

impl SegmentList {
    /// Create a list covering `[0, total_size)` as a single free segment.
    /// Returns the list and the index of that sole segment.
    pub(crate) fn try_new(total_size: usize) -> Result<(Self, u32), PoolError> {
        let mut arena = SegmentArena::try_new(EngineLimits::SEGMENT_ARENA_INIT_CAPACITY)?;
        let (index, _generation) = arena.insert(0, total_size, SegmentState::Free, None, None)?;
        Ok((Self { arena, head: index }, index))
    }

    pub(crate) fn arena(&self) -> &SegmentArena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut SegmentArena {
        &mut self.arena
    }

    /// Proactively grow the backing arena if it is near its fill factor,
    /// so the `split` that follows cannot fail partway through.
    pub(crate) fn reserve_headroom(&mut self) -> Result<(), PoolError> {
        self.arena.ensure_headroom()
    }

    /// Carve a busy segment of size `n` out of the free segment at
    /// `index`. Precondition: the segment is free and `size >= n`.
    ///
    /// Returns `Ok(Some((remainder_index, remainder_generation,
    /// remainder_size)))` if a free remainder segment was spliced in
    /// after `index`, or `Ok(None)` if `n` consumed the segment exactly.
    pub(crate) fn split(
        &mut self,
        index: u32,
        n: usize,
    ) -> Result<Option<(u32, u32, usize)>, PoolError> {
        let (base, size, next) = {
            let seg = self.arena.get(index);
            debug_assert!(matches!(seg.state, SegmentState::Free));
            debug_assert!(seg.size >= n);
            (seg.base, seg.size, seg.next)
        };

        if size == n {
            self.arena.get_mut(index).state = SegmentState::Busy;
            return Ok(None);
        }

        let remainder_base = base + n;
        let remainder_size = size - n;
        let (r_index, r_generation) =
            self.arena
                .insert(remainder_base, remainder_size, SegmentState::Free, Some(index), next)?;

        if let Some(next_index) = next {
            self.arena.get_mut(next_index).prev = Some(r_index);
        }
        let seg = self.arena.get_mut(index);
        seg.size = n;
        seg.state = SegmentState::Busy;
        seg.next = Some(r_index);

        Ok(Some((r_index, r_generation, remainder_size)))
    }

    /// Merge the free segment at `index` with its free next neighbor,
    /// if one exists. Returns the merged size on success.
    pub(crate) fn merge_with_next(&mut self, index: u32) -> Option<usize> {
        let next_index = self.arena.get(index).next?;
        if !matches!(self.arena.get(next_index).state, SegmentState::Free) {
            return None;
        }
        let next_next = self.arena.get(next_index).next;
        let next_size = self.arena.get(next_index).size;

        let seg = self.arena.get_mut(index);
        seg.size += next_size;
        seg.next = next_next;
        if let Some(nn) = next_next {
            self.arena.get_mut(nn).prev = Some(index);
        }
        self.arena.free(next_index);
        Some(self.arena.get(index).size)
    }

    /// Merge the free segment at `index` into its free prev neighbor, if
    /// one exists. The segment at `index` is retired; returns the
    /// surviving (previous) index on success.
    pub(crate) fn merge_with_prev(&mut self, index: u32) -> Option<u32> {
        let prev_index = self.arena.get(index).prev?;
        if !matches!(self.arena.get(prev_index).state, SegmentState::Free) {
            return None;
        }
        let next = self.arena.get(index).next;
        let size = self.arena.get(index).size;

        let seg = self.arena.get_mut(prev_index);
        seg.size += size;
        seg.next = next;
        if let Some(n) = next {
            self.arena.get_mut(n).prev = Some(prev_index);
        }
        self.arena.free(index);
        Some(prev_index)
    }

    pub(crate) fn get_checked(&self, index: u32, generation: u32) -> Option<&Segment> {
        self.arena.get_checked(index, generation)
    }

    /// The slot's current generation, regardless of liveness.
    pub(crate) fn generation_of(&self, index: u32) -> u32 {
        self.arena.generation_of(index)
    }

    /// Walk the list in address order, yielding `(index, segment)` pairs.
    pub(crate) fn iter(&self) -> SegmentIter<'_> {
        SegmentIter {
            arena: &self.arena,
            cursor: Some(self.head),
        }
    }
}

/// Address-order iterator over a [`SegmentList`].
pub(crate) struct SegmentIter<'a> {
    arena: &'a SegmentArena,
    cursor: Option<u32>,
}

impl<'a> Iterator for SegmentIter<'a> {
    type Item = (u32, &'a Segment);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let seg = self.arena.get(index);
        self.cursor = seg.next;
        Some((index, seg))
    }
}
