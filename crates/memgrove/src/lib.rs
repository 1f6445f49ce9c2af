//! memgrove: a segment-list pool allocator with generational handles.
//!
//! This is the top-level facade crate that re-exports the public API
//! from the sub-crates below. For most users, adding `memgrove` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use memgrove::prelude::*;
//!
//! let mut registry = Registry::new();
//! registry.init().unwrap();
//!
//! let pool = registry.open(1024, AllocPolicy::FirstFit).unwrap();
//! let a = registry.allocate(pool, 64).unwrap();
//! registry.data_mut(a).unwrap().fill(0xAB);
//!
//! let summary = registry.summary(pool).unwrap();
//! assert_eq!(summary.num_allocs, 1);
//!
//! registry.deallocate(a).unwrap();
//! registry.close(pool).unwrap();
//! registry.teardown().unwrap();
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`core`] | `memgrove-core` | `PoolError`, `AllocPolicy`, `PoolHandle`, `AllocHandle` |
//! | [`arena`] | `memgrove-arena` | `Registry`, `EngineLimits`, `PoolSummary`, `SegmentInfo` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Error types, handles, and policy types (`memgrove-core`).
pub use memgrove_core as core;

/// The allocator engine and process-wide registry (`memgrove-arena`).
pub use memgrove_arena as arena;

/// Common imports for typical memgrove usage.
///
/// ```rust
/// use memgrove::prelude::*;
/// ```
pub mod prelude {
    pub use memgrove_arena::{EngineLimits, PoolSummary, Registry, SegmentInfo};
    pub use memgrove_core::{AllocHandle, AllocPolicy, PoolError, PoolHandle};
}
