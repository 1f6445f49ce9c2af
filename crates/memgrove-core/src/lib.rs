//! Core types shared by the memgrove pool allocator.
//!
//! This is the leaf crate: it defines the error taxonomy, placement
//! policy, and the generational handles returned by the engine. It has
//! no dependency on the engine itself, so it can be depended on by
//! anything that needs to name a [`PoolError`] or a handle type without
//! pulling in the allocator logic.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod handle;
pub mod policy;

pub use error::PoolError;
pub use handle::{AllocHandle, PoolHandle};
pub use policy::AllocPolicy;
