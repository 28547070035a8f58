//! The storage cell behind a singleton.
//!
//! [`Slot<T>`] holds at most one `T`. Reads of an initialized slot are a single
//! `Acquire` load; construction happens under the [`SlotState`] lock and is
//! published with a `Release` store, so a caller that sees the slot as full
//! always sees a fully constructed value.

use core::cell::UnsafeCell;
use core::convert::Infallible;
#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
use core::future::Future;
use core::sync::atomic::Ordering;
use core::{fmt, mem};

use crate::state::{InitGuard, SlotState};

/// A thread-safe slot that is filled at most once and never emptied through a
/// shared reference.
///
/// Unlike a naive "check for null, lock, check again" implementation, every
/// read that leads to a dereference synchronizes with the publishing write.
pub struct Slot<T> {
   value: UnsafeCell<mem::MaybeUninit<T>>,
   state: SlotState,
}

impl<T> Slot<T> {
   /// Creates an empty slot.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         state: SlotState::new(),
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
      }
   }

   /// Returns `true` once a value has been published.
   ///
   /// Never blocks.
   #[inline]
   pub fn is_initialized(&self) -> bool {
      self.state.is_done(Ordering::Acquire)
   }

   /// Returns the published value, or `None` if the slot is empty or a
   /// construction is still in flight.
   ///
   /// This is the lock-free fast path. Never blocks.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.state.is_done(Ordering::Acquire) {
         // SAFETY: DONE was observed with Acquire, pairing with the Release in
         // `set_done`, so the write of the value is visible here.
         Some(unsafe { self.get_unchecked() })
      } else {
         None
      }
   }

   /// Number of times the initialization lock was taken on this slot.
   ///
   /// Stays at `1` forever after a first-attempt success, no matter how many
   /// callers read the slot afterwards.
   #[inline]
   pub fn lock_acquisitions(&self) -> usize {
      self.state.lock_acquisitions()
   }

   /// # Safety
   ///
   /// The slot must be initialized, and DONE must have been observed with
   /// `Acquire` ordering by the calling thread.
   #[inline]
   unsafe fn get_unchecked(&self) -> &T {
      debug_assert!(self.is_initialized(), "get_unchecked called on empty Slot");
      (*self.value.get()).assume_init_ref()
   }

   /// Returns the value, running `f` to build it if the slot is empty.
   ///
   /// Concurrent callers block until the single running `f` publishes. If `f`
   /// panics the slot stays empty and the next caller runs its own `f`.
   #[inline]
   pub fn get_or_init<F>(&self, f: F) -> &T
   where
      F: FnOnce() -> T,
   {
      match self.get_or_try_init(|| Ok::<T, Infallible>(f())) {
         Ok(value) => value,
         Err(never) => match never {},
      }
   }

   /// Returns the value, running the fallible `f` to build it if the slot is empty.
   ///
   /// - On `Ok(value)`, publishes it and returns a reference.
   /// - On `Err(e)`, returns `Err(e)` to this caller and leaves the slot empty.
   ///
   /// Only one `f` runs at a time; callers waiting on a failed attempt wake up
   /// and one of them retries with its own `f`.
   pub fn get_or_try_init<F, E>(&self, f: F) -> Result<&T, E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      match self.state.lock() {
         // On error the guard drops inside `?` and resets the slot.
         Some(guard) => Ok(self.publish(guard, f()?)),
         None => Ok(self.published()),
      }
   }

   /// Like [`get_or_try_init`](Self::get_or_try_init), but never waits.
   ///
   /// Returns `Ok(None)` without running `f` when another caller is in the
   /// middle of constructing the value.
   pub fn get_or_try_init_nowait<F, E>(&self, f: F) -> Result<Option<&T>, E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      if let Some(value) = self.get() {
         return Ok(Some(value));
      }
      match self.state.try_lock() {
         Some(guard) => Ok(Some(self.publish(guard, f()?))),
         // Either published since the first check, or still locked by someone else.
         None => Ok(self.get()),
      }
   }

   /// Async version of [`get_or_init`](Self::get_or_init).
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   #[inline]
   pub async fn get_or_init_async<F, Fut>(&self, f: F) -> &T
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = T>,
   {
      let init = || async move { Ok::<T, Infallible>(f().await) };
      match self.get_or_try_init_async(init).await {
         Ok(value) => value,
         Err(never) => match never {},
      }
   }

   /// Async version of [`get_or_try_init`](Self::get_or_try_init).
   ///
   /// Waiting on a contended lock yields to the Tokio scheduler instead of
   /// parking the worker thread.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_or_try_init_async<F, Fut, E>(&self, f: F) -> Result<&T, E>
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = Result<T, E>>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      match self.state.lock_async().await {
         Some(guard) => Ok(self.publish(guard, f().await?)),
         None => Ok(self.published()),
      }
   }

   /// Writes `value` and releases the lock as DONE.
   #[cold]
   fn publish(&self, guard: InitGuard<'_>, value: T) -> &T {
      // SAFETY: the guard proves exclusive write access to the value.
      let value = unsafe { (*self.value.get()).write(value) };
      guard.commit();
      value
   }

   /// The value after the lock reported the slot as DONE.
   #[inline]
   fn published(&self) -> &T {
      debug_assert!(self.is_initialized());
      // SAFETY: `SlotState::lock` only returns `None` after an Acquire load
      // that observed DONE.
      unsafe { self.get_unchecked() }
   }
}

// SAFETY: shared access hands out `&T` to many threads (`T: Sync`) and the value
// may be constructed on one thread and dropped on another (`T: Send`).
unsafe impl<T: Sync + Send> Sync for Slot<T> {}
// SAFETY: moving the slot moves the `T` it may contain.
unsafe impl<T: Send> Send for Slot<T> {}

impl<T> Default for Slot<T> {
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("Slot");
      match self.get() {
         Some(v) => d.field(v),
         None => d.field(&format_args!("<uninit>")),
      };
      d.finish()
   }
}

impl<T> Drop for Slot<T> {
   #[inline]
   fn drop(&mut self) {
      if self.state.is_done(Ordering::Acquire) {
         // SAFETY: exclusive access and the slot is initialized.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}
