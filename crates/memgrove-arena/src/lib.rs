//! Segment-list pool allocator engine.
//!
//! This crate implements the allocator itself: a growable segment
//! arena, a sorted gap index for fast fit-finding, the split/merge
//! state machine that drives `allocate`/`deallocate`, and the
//! process-wide [`registry::Registry`] that hands out generational
//! handles to callers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod config;
mod engine;
mod gap_index;
mod registry;
mod segment;

pub use config::EngineLimits;
pub use engine::{PoolSummary, SegmentInfo};
pub use registry::Registry;
