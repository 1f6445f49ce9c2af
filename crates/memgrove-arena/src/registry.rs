//! Process-wide table of open pools, addressed by generational handle.
//!
//! [`Registry`] is the thin layer that turns a [`PoolEngine`] into
//! something callers can hold a [`PoolHandle`] to: it owns a growable
//! table of slots, each either empty or holding one open pool, and
//! translates `PoolHandle`/`AllocHandle` pairs into calls against the
//! right engine. A closed pool's slot is reused by a later `open`, with
//! its generation bumped first, so a handle from before the close is
//! rejected rather than silently resolving to the new pool.

use memgrove_core::error::PoolError;
use memgrove_core::handle::{AllocHandle, PoolHandle};
use memgrove_core::policy::AllocPolicy;

use crate::config::EngineLimits;
use crate::engine::{PoolEngine, PoolSummary, SegmentInfo};

struct RegistrySlot {
    engine: Option<PoolEngine>,
    generation: u32,
}

/// Process-wide (or scope-wide, if the caller holds it locally rather
/// than in a global) table of open pools.
///
/// Bracketed by [`Registry::init`] and [`Registry::teardown`]: `open`
/// and `close` are only meaningful between those two calls, matching
/// the source engine's process-wide lifecycle.
pub struct Registry {
    slots: Vec<RegistrySlot>,
    free_list: Vec<u32>,
    initialized: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty, uninitialized registry.
    ///
    /// Call [`Registry::init`] before `open`.
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(EngineLimits::POOL_STORE_INIT_CAPACITY),
            free_list: Vec::new(),
            initialized: false,
        }
    }

    /// Bring the registry into service. Idempotent-by-error: a second
    /// call before [`Registry::teardown`] fails with
    /// [`PoolError::AlreadyInitialized`].
    pub fn init(&mut self) -> Result<(), PoolError> {
        if self.initialized {
            return Err(PoolError::AlreadyInitialized);
        }
        self.initialized = true;
        Ok(())
    }

    /// Tear the registry down. Requires every pool to have been closed
    /// first ([`PoolError::PoolsStillOpen`] otherwise) and the registry
    /// to currently be initialized ([`PoolError::NotInitialized`]
    /// otherwise).
    pub fn teardown(&mut self) -> Result<(), PoolError> {
        if !self.initialized {
            return Err(PoolError::NotInitialized);
        }
        if self.open_pool_count() > 0 {
            return Err(PoolError::PoolsStillOpen);
        }
        self.initialized = false;
        self.slots.clear();
        self.free_list.clear();
        Ok(())
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

    fn resolve(&self, handle: PoolHandle) -> Result<&PoolEngine, PoolError> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.engine.as_ref())
            .ok_or(PoolError::BadPool)
    }

    fn resolve_mut(&mut self, handle: PoolHandle) -> Result<&mut PoolEngine, PoolError> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.engine.as_mut())
            .ok_or(PoolError::BadPool)
    }

    /// Open a new pool of `size` bytes under the given allocation policy
    /// and return a handle to it.
    pub fn open(&mut self, size: usize, policy: AllocPolicy) -> Result<PoolHandle, PoolError> {
        if !self.initialized {
            return Err(PoolError::NotInitialized);
        }
        let engine = PoolEngine::try_open(size, policy)?;
        self.ensure_headroom()?;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.engine = Some(engine);
            return Ok(PoolHandle::from_parts(index, slot.generation));
        }

        let index = self.slots.len() as u32;
        self.slots.push(RegistrySlot {
            engine: Some(engine),
            generation: 0,
        });
        Ok(PoolHandle::from_parts(index, 0))
    }

    /// Close a pool. Fails with [`PoolError::NotEmpty`] if any
    /// allocation is still live, mirroring the source engine's refusal
    /// to discard live handles silently.
    pub fn close(&mut self, handle: PoolHandle) -> Result<(), PoolError> {
        if !self.resolve(handle)?.is_closeable() {
            return Err(PoolError::NotEmpty);
        }
        let index = handle.index();
        self.slots[index as usize].engine = None;
        self.free_list.push(index);
        Ok(())
    }

    /// Allocate `n` bytes from the given pool.
    pub fn allocate(&mut self, pool: PoolHandle, n: usize) -> Result<AllocHandle, PoolError> {
        let engine = self.resolve_mut(pool)?;
        let (index, generation) = engine.allocate(n)?;
        Ok(AllocHandle::from_parts(pool, index, generation))
    }

    /// Release an allocation.
    pub fn deallocate(&mut self, alloc: AllocHandle) -> Result<(), PoolError> {
        let engine = self.resolve_mut(alloc.pool())?;
        engine.deallocate(alloc.index(), alloc.generation())
    }

    /// Borrow the bytes of a live allocation.
    pub fn data(&self, alloc: AllocHandle) -> Result<&[u8], PoolError> {
        let engine = self.resolve(alloc.pool())?;
        engine.data(alloc.index(), alloc.generation())
    }

    /// Mutably borrow the bytes of a live allocation.
    pub fn data_mut(&mut self, alloc: AllocHandle) -> Result<&mut [u8], PoolError> {
        let engine = self.resolve_mut(alloc.pool())?;
        engine.data_mut(alloc.index(), alloc.generation())
    }

    /// Snapshot of a pool's segment list, in address order.
    pub fn inspect(&self, pool: PoolHandle) -> Result<Vec<SegmentInfo>, PoolError> {
        Ok(self.resolve(pool)?.inspect())
    }

    /// Snapshot of a pool's accounting.
    pub fn summary(&self, pool: PoolHandle) -> Result<PoolSummary, PoolError> {
        Ok(self.resolve(pool)?.summary())
    }

    /// Number of currently open pools.
    pub fn open_pool_count(&self) -> usize {
        self.slots.iter().filter(|s| s.engine.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_before_init_is_rejected() {
        let mut reg = Registry::new();
        assert_eq!(reg.open(64, AllocPolicy::FirstFit), Err(PoolError::NotInitialized));
    }

    #[test]
    fn double_init_is_rejected() {
        let mut reg = Registry::new();
        reg.init().unwrap();
        assert_eq!(reg.init(), Err(PoolError::AlreadyInitialized));
    }

    #[test]
    fn teardown_before_init_is_rejected() {
        let mut reg = Registry::new();
        assert_eq!(reg.teardown(), Err(PoolError::NotInitialized));
    }

    #[test]
    fn teardown_with_open_pools_is_rejected() {
        let mut reg = Registry::new();
        reg.init().unwrap();
        let _pool = reg.open(64, AllocPolicy::FirstFit).unwrap();
        assert_eq!(reg.teardown(), Err(PoolError::PoolsStillOpen));
    }

    #[test]
    fn open_then_close_round_trips_the_slot() {
        let mut reg = Registry::new();
        reg.init().unwrap();
        let pool = reg.open(64, AllocPolicy::FirstFit).unwrap();
        assert_eq!(reg.open_pool_count(), 1);
        reg.close(pool).unwrap();
        assert_eq!(reg.open_pool_count(), 0);
        reg.teardown().unwrap();
    }

    #[test]
    fn close_with_live_allocations_is_rejected() {
        let mut reg = Registry::new();
        reg.init().unwrap();
        let pool = reg.open(64, AllocPolicy::FirstFit).unwrap();
        let _alloc = reg.allocate(pool, 8).unwrap();
        assert_eq!(reg.close(pool), Err(PoolError::NotEmpty));
    }

    #[test]
    fn stale_pool_handle_after_close_is_rejected() {
        let mut reg = Registry::new();
        reg.init().unwrap();
        let pool = reg.open(64, AllocPolicy::FirstFit).unwrap();
        reg.close(pool).unwrap();
        assert_eq!(reg.allocate(pool, 8), Err(PoolError::BadPool));
    }

    #[test]
    fn reused_slot_does_not_resolve_the_old_handle() {
        let mut reg = Registry::new();
        reg.init().unwrap();
        let first = reg.open(64, AllocPolicy::FirstFit).unwrap();
        reg.close(first).unwrap();
        let second = reg.open(32, AllocPolicy::BestFit).unwrap();
        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());
        assert_eq!(reg.summary(first), Err(PoolError::BadPool));
        assert!(reg.summary(second).is_ok());
    }

    #[test]
    fn allocate_and_deallocate_round_trip_through_the_registry() {
        let mut reg = Registry::new();
        reg.init().unwrap();
        let pool = reg.open(64, AllocPolicy::FirstFit).unwrap();
        let alloc = reg.allocate(pool, 16).unwrap();
        reg.data_mut(alloc).unwrap().fill(7);
        assert_eq!(reg.data(alloc).unwrap(), &[7; 16]);
        reg.deallocate(alloc).unwrap();
        assert_eq!(reg.summary(pool).unwrap().num_allocs, 0);
    }
}
