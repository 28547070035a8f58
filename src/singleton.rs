//! Process-wide lazily constructed singletons.
//!
//! A [`Singleton<T, F>`] pairs a [`Slot<T>`] with the constructor that fills
//! it. [`Singleton::instance`] is the double-checked accessor:
//!
//! 1. `Acquire` load of the slot state; if published, return the value. No lock.
//! 2. Otherwise take the slot lock.
//! 3. Re-check under the lock; another caller may have published while we waited.
//! 4. Run the constructor and publish with a `Release` store.
//! 5. Release the lock on every exit path, including constructor errors and panics.
//!
//! A failed construction is not cached. The caller that ran the constructor gets
//! a [`ConstructionFailure`], the slot stays empty, and the next caller retries.

use core::any;
#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
use core::future;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{BoxError, ConstructionFailure};
use crate::slot::Slot;

/// Counters describing how a [`Singleton`] has been initialized so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitStats {
   /// Times the initialization lock was acquired.
   pub lock_acquisitions: usize,
   /// Times the constructor was invoked.
   pub construction_attempts: usize,
   /// Times the constructor returned an error.
   pub construction_failures: usize,
}

/// A lazily constructed, process-wide shared instance of `T`.
///
/// The constructor runs at most once per successful initialization, on the
/// first caller that wins the race for the lock. Every later call is a single
/// atomic load.
///
/// ```rust
/// use lazy_singleton::{BoxError, Singleton};
///
/// struct Registry {
///    name: String,
/// }
///
/// fn build() -> Result<Registry, BoxError> {
///    Ok(Registry { name: "primary".to_string() })
/// }
///
/// static REGISTRY: Singleton<Registry> = Singleton::new(build);
///
/// let a = REGISTRY.instance().unwrap();
/// let b = REGISTRY.instance().unwrap();
/// assert!(std::ptr::eq(a, b));
/// assert_eq!(a.name, "primary");
/// ```
pub struct Singleton<T, F = fn() -> Result<T, BoxError>> {
   slot: Slot<T>,
   constructor: F,
   attempts: AtomicUsize,
   failures: AtomicUsize,
}

impl<T, F> Singleton<T, F> {
   /// Creates an accessor that will build its instance with `constructor` on first use.
   #[inline]
   #[must_use]
   pub const fn new(constructor: F) -> Self {
      Self {
         slot: Slot::new(),
         constructor,
         attempts: AtomicUsize::new(0),
         failures: AtomicUsize::new(0),
      }
   }

   /// Returns the instance if it has already been published. Never constructs
   /// and never blocks.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      self.slot.get()
   }

   /// Returns `true` once the instance has been published. Never blocks.
   #[inline]
   pub fn is_initialized(&self) -> bool {
      self.slot.is_initialized()
   }

   /// Snapshot of the initialization counters.
   pub fn stats(&self) -> InitStats {
      InitStats {
         lock_acquisitions: self.slot.lock_acquisitions(),
         construction_attempts: self.attempts.load(Ordering::Relaxed),
         construction_failures: self.failures.load(Ordering::Relaxed),
      }
   }
}

impl<T, F, E> Singleton<T, F>
where
   F: Fn() -> Result<T, E>,
   E: Into<BoxError>,
{
   /// Returns the shared instance, constructing it if this is the first call.
   ///
   /// Safe to call from any number of threads. Callers that lose the race block
   /// until the winner publishes, then return the same instance. If the winner's
   /// constructor fails, only the winner sees the error; a waiting caller then
   /// takes the lock and runs the constructor again.
   ///
   /// # Errors
   ///
   /// [`ConstructionFailure`] if the constructor ran on this call and failed.
   #[inline]
   pub fn instance(&self) -> Result<&T, ConstructionFailure> {
      if let Some(value) = self.slot.get() {
         return Ok(value);
      }
      self.slot.get_or_try_init(|| self.construct())
   }

   /// Non-blocking version of [`instance`](Self::instance).
   ///
   /// Returns `Ok(None)` instead of waiting when another caller is running the
   /// constructor. Otherwise behaves like `instance`: publishes on success and
   /// leaves the slot empty on failure.
   ///
   /// # Errors
   ///
   /// [`ConstructionFailure`] if the constructor ran on this call and failed.
   pub fn instance_nowait(&self) -> Result<Option<&T>, ConstructionFailure> {
      self.slot.get_or_try_init_nowait(|| self.construct())
   }

   /// Async version of [`instance`](Self::instance).
   ///
   /// The constructor itself is synchronous; only the wait on a contended lock
   /// is made cooperative so that async workers are not parked.
   ///
   /// # Errors
   ///
   /// See [`instance`](Self::instance).
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn instance_async(&self) -> Result<&T, ConstructionFailure> {
      if let Some(value) = self.slot.get() {
         return Ok(value);
      }
      self
         .slot
         .get_or_try_init_async(|| future::ready(self.construct()))
         .await
   }

   /// Runs the constructor. Called with the slot lock held.
   #[cold]
   fn construct(&self) -> Result<T, ConstructionFailure> {
      let type_name = any::type_name::<T>();
      let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
      tracing::debug!(type_name, attempt, "constructing singleton instance");

      match (self.constructor)() {
         Ok(value) => {
            tracing::debug!(type_name, attempt, "singleton instance constructed");
            Ok(value)
         }
         Err(err) => {
            self.failures.fetch_add(1, Ordering::Relaxed);
            let failure = ConstructionFailure::new(type_name, attempt, err.into());
            tracing::warn!(type_name, attempt, error = %failure.source_ref(), "singleton construction failed");
            Err(failure)
         }
      }
   }
}

impl<T: fmt::Debug, F> fmt::Debug for Singleton<T, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Singleton")
         .field("slot", &self.slot)
         .field("stats", &self.stats())
         .finish()
   }
}
