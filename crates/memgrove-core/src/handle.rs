//! Generational handles into the registry and the segment arena.
//!
//! A handle pairs a slot *index* with the *generation* the slot was at
//! when the handle was issued. Slots are recycled (a closed pool's
//! registry slot is reused by a later `open`; a coalesced segment's
//! arena slot is reused by a later `split`), and recycling bumps the
//! slot's generation counter. Resolving a handle compares the stored
//! generation against the slot's current one, so a handle into a
//! recycled slot is rejected in O(1) rather than silently resolving to
//! an unrelated pool or segment.

use std::fmt;

/// A reference to a pool, returned by `open()`.
///
/// Opaque outside this crate family: callers pass it back to `close`,
/// `allocate`, `deallocate`, `inspect`, and `summary`, but cannot
/// construct or inspect one themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct PoolHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl PoolHandle {
    /// Build a handle from its raw parts.
    ///
    /// Not part of the public API surface of this crate family; exposed
    /// `pub` only so the engine crate (a sibling, not a dependent) can
    /// construct handles without reaching into private fields via
    /// `pub(crate)` visibility tricks across a crate boundary.
    pub fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// The registry slot index this handle was issued from.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The registry slot generation this handle was issued at.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PoolHandle(slot={}, gen={})", self.index, self.generation)
    }
}

/// A reference to a busy segment within a specific pool, returned by
/// `allocate()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub struct AllocHandle {
    pub(crate) pool: PoolHandle,
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl AllocHandle {
    /// Build a handle from its raw parts.
    pub fn from_parts(pool: PoolHandle, index: u32, generation: u32) -> Self {
        Self {
            pool,
            index,
            generation,
        }
    }

    /// The pool this allocation belongs to.
    pub fn pool(&self) -> PoolHandle {
        self.pool
    }

    /// The arena slot index this handle was issued from.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The arena slot generation this handle was issued at.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for AllocHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AllocHandle(pool={}, slot={}, gen={})",
            self.pool, self.index, self.generation
        )
    }
}
