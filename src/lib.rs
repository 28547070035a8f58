//! Lazily constructed, process-wide singletons with a lock-free fast path.
//!
//! This crate implements double-checked locking the way it has to be done on
//! weakly ordered hardware: the "is it built yet?" check is an `Acquire` load
//! and the publish is a `Release` store, so a caller can never receive a handle
//! to a half-constructed instance.
//!
//! - [`Singleton<T, F>`]: the accessor. Holds a constructor and builds the
//!   instance on the first call to [`Singleton::instance`].
//! - [`Slot<T>`]: the storage cell underneath, usable on its own when the
//!   initializer is only known at the call site.
//! - [`lazy_singleton!`]: declares a `fn name() -> Result<&'static T, _>` backed
//!   by a hidden static.
//!
//! # Features
//!
//! - **Lock-free fast path**: once published, reading the instance is one atomic load.
//! - **Single construction**: concurrent first callers block on a futex-based lock
//!   (`parking_lot_core`) while exactly one of them runs the constructor.
//! - **Retryable failure**: a constructor error or panic releases the lock and leaves
//!   the slot empty; the next caller tries again.
//! - **Async support**: `instance_async` waits cooperatively on Tokio.
//!
//! # Example
//!
//! ```rust
//! use lazy_singleton::{BoxError, Singleton};
//!
//! struct Pool {
//!    size: usize,
//! }
//!
//! static POOL: Singleton<Pool> = Singleton::new(|| -> Result<Pool, BoxError> {
//!    Ok(Pool { size: 4 })
//! });
//!
//! let pool = POOL.instance().unwrap();
//! assert_eq!(pool.size, 4);
//! assert_eq!(POOL.stats().lock_acquisitions, 1);
//!
//! // Later calls never touch the lock.
//! for _ in 0..10 {
//!    assert!(std::ptr::eq(POOL.instance().unwrap(), pool));
//! }
//! assert_eq!(POOL.stats().lock_acquisitions, 1);
//! ```

/// Constructor failures.
mod error;

/// Declaration macro.
mod macros;

/// Process-wide accessor.
mod singleton;

/// Storage cell.
mod slot;

/// Internal synchronization state management.
mod state;

pub use error::{BoxError, ConstructionFailure};
pub use singleton::{InitStats, Singleton};
pub use slot::Slot;
