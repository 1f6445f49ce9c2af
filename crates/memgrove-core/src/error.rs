//! Error taxonomy for the memgrove pool allocator.
//!
//! Maps the error-kind table from the allocator's external interface to a
//! single flat enum. Every public operation returns `Result<T, PoolError>`;
//! no operation panics on a malformed handle or pool reference.

use std::error::Error;
use std::fmt;

/// Errors returned by the registry and pool engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// A sub-allocation (backing buffer, arena, or gap index) failed.
    OutOfMemory,
    /// `init()` was called while the registry was already initialized.
    AlreadyInitialized,
    /// An operation requiring an initialized registry was called before
    /// `init()`, or after `teardown()`.
    NotInitialized,
    /// `teardown()` was called while one or more pools are still open.
    PoolsStillOpen,
    /// The pool handle does not refer to a currently open pool.
    BadPool,
    /// The alloc handle does not refer to a currently busy segment in
    /// the pool it names.
    BadHandle,
    /// The pool has no free segments at all.
    NoGap,
    /// The pool has free segments, but none large enough for the request.
    NoFit,
    /// `close()` was called on a pool that still holds live allocations.
    NotEmpty,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::AlreadyInitialized => write!(f, "registry already initialized"),
            Self::NotInitialized => write!(f, "registry not initialized"),
            Self::PoolsStillOpen => write!(f, "pools still open"),
            Self::BadPool => write!(f, "pool handle does not refer to an open pool"),
            Self::BadHandle => write!(f, "alloc handle does not refer to a live allocation"),
            Self::NoGap => write!(f, "pool has no free segments"),
            Self::NoFit => write!(f, "no free segment large enough for the request"),
            Self::NotEmpty => write!(f, "pool still has live allocations"),
        }
    }
}

impl Error for PoolError {}
