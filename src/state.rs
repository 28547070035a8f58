//! Initialization state machine for the singleton slot.
//!
//! The slot moves through three logical states:
//!
//! - *uninitialized*: neither `DONE` nor `LOCKED` is set.
//! - *initializing*: `LOCKED` is set, a single caller is running the constructor.
//! - *initialized*: `DONE` is set. Terminal; every later read takes the fast path.
//!
//! A failed or panicking constructor drops its [`InitGuard`] without committing,
//! which moves the state from *initializing* back to *uninitialized* so the next
//! caller retries.
//!
//! The state is packed into a single `AtomicU8`:
//! - Bit 0: DONE - slot holds a published instance
//! - Bit 1: LOCKED - a caller holds the initialization lock
//! - Bit 2: WAITING - at least one caller is parked on the lock
//! - Bits 3-7: EPOCH - bumped on every publish/reset so parked callers notice the change
//!
//! Publishing (`set_done`) is a `Release` store and every reader that goes on to
//! touch the value observes `DONE` with an `Acquire` load. That pair is what makes
//! the constructor's writes visible before the handle is.

use core::mem;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Atomic state of a [`Slot`](crate::Slot).
pub(crate) struct SlotState {
   bits: AtomicU8,
   acquisitions: AtomicUsize,
}

impl SlotState {
   /// Bit flag: slot is initialized.
   const DONE: u8 = 1;
   /// Bit flag: slot is locked for initialization.
   const LOCKED: u8 = 2;
   /// Bit flag: at least one caller is waiting on the lock.
   const WAITING: u8 = 4;
   /// Lowest epoch bit.
   const EPOCH_1: u8 = 8;
   /// Mask for epoch bits.
   const EPOCH_MASK: u8 = !(Self::DONE | Self::LOCKED | Self::WAITING);

   #[inline(always)]
   const fn next_epoch(current: u8) -> u8 {
      (current & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// Creates the state of an empty slot.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self {
         bits: AtomicU8::new(0),
         acquisitions: AtomicUsize::new(0),
      }
   }

   /// Number of times the initialization lock has been acquired.
   #[inline]
   pub(crate) fn lock_acquisitions(&self) -> usize {
      self.acquisitions.load(Ordering::Relaxed)
   }

   #[inline]
   fn park_key(&self) -> usize {
      self.bits.as_ptr() as usize
   }

   #[inline]
   fn notify_all(&self) {
      // SAFETY: park and unpark both key on the address of `bits`.
      unsafe {
         parking_lot_core::unpark_all(self.park_key(), DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the calling thread until the state differs from `expected`.
   #[inline]
   fn wait(&self, expected: u8) {
      tracing::trace!(state = expected, "waiting for in-flight construction");
      // SAFETY: see `notify_all`.
      unsafe {
         // The validate closure runs under the bucket lock, so a `notify_all`
         // issued after the state changed cannot be missed.
         let _ = parking_lot_core::park(
            self.park_key(),
            || self.bits.load(Ordering::Acquire) == expected,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Publishes the slot: sets DONE, clears LOCKED/WAITING, bumps the epoch.
   ///
   /// Returns `true` if the slot was not already DONE.
   #[inline]
   pub(crate) fn set_done(&self) -> bool {
      let current = self.bits.load(Ordering::Relaxed);
      let new_state = Self::DONE | Self::next_epoch(current);

      // Release: the value written under the lock happens-before any Acquire
      // load that observes DONE.
      let prev = self.bits.swap(new_state, Ordering::Release);
      if prev & Self::WAITING != 0 {
         self.notify_all();
      }
      prev & Self::DONE == 0
   }

   /// Returns the slot to *uninitialized* and wakes waiters so one of them retries.
   #[inline]
   pub(crate) fn set_uninit(&self) -> bool {
      let current = self.bits.load(Ordering::Relaxed);
      let new_state = Self::next_epoch(current);

      let prev = self.bits.swap(new_state, Ordering::Release);
      if prev & Self::WAITING != 0 {
         self.notify_all();
      }
      prev & Self::DONE != 0
   }

   /// Checks the DONE flag.
   ///
   /// Callers that dereference the value afterwards must pass `Ordering::Acquire`.
   #[inline]
   pub(crate) fn is_done(&self, ordering: Ordering) -> bool {
      self.bits.load(ordering) & Self::DONE != 0
   }

   /// Single attempt at taking the lock.
   ///
   /// - `Ok(None)`: already initialized (observed with `Acquire`).
   /// - `Ok(Some(guard))`: lock taken.
   /// - `Err(state)`: someone else holds the lock; `state` is what to park on.
   ///
   /// With `nowait` the WAITING bit is left alone, since the caller will not park.
   #[inline]
   fn lock_step(&self, nowait: bool) -> Result<Option<InitGuard<'_>>, u8> {
      loop {
         // Second check of the double-checked pattern. Acquire so that a caller
         // returning `Ok(None)` may read the value.
         let current = self.bits.load(Ordering::Acquire);
         if current & Self::DONE != 0 {
            return Ok(None);
         }

         if current & Self::LOCKED == 0 {
            match self.bits.compare_exchange_weak(
               current,
               current | Self::LOCKED,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => {
                  self.acquisitions.fetch_add(1, Ordering::Relaxed);
                  return Ok(Some(InitGuard::new(self)));
               }
               Err(_) => {
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         if !nowait && current & Self::WAITING == 0 {
            let new_state = current | Self::WAITING;
            match self.bits.compare_exchange_weak(
               current,
               new_state,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Err(new_state),
               Err(_) => {
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         return Err(current);
      }
   }

   /// Acquires the initialization lock, parking while another caller holds it.
   ///
   /// Returns `None` once the slot is initialized, in which case the lock was
   /// never taken.
   #[inline]
   pub(crate) fn lock(&self) -> Option<InitGuard<'_>> {
      let mut observed = match self.lock_step(false) {
         Ok(guard) => return guard,
         Err(state) => state,
      };
      loop {
         self.wait(observed);
         match self.lock_step(false) {
            Ok(guard) => return guard,
            Err(state) => observed = state,
         }
      }
   }

   /// Async counterpart of [`lock`](Self::lock).
   ///
   /// Yields to the runtime while the lock is contended. On a multi-threaded
   /// runtime it eventually parks inside `block_in_place`; on any other runtime
   /// it keeps yielding, since the lock holder may be a task on this very thread.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub(crate) async fn lock_async(&self) -> Option<InitGuard<'_>> {
      loop {
         for _ in 0..16 {
            match self.lock_step(false) {
               Ok(guard) => return guard,
               Err(state) => {
                  for _ in 0..32 {
                     tokio::task::yield_now().await;
                     if self.bits.load(Ordering::Relaxed) != state {
                        break;
                     }
                  }
               }
            }
         }

         #[cfg(feature = "async-tokio-mt")]
         if can_block_in_place() {
            return match self.lock_step(false) {
               Ok(guard) => guard,
               Err(state) => tokio::task::block_in_place(|| {
                  self.wait(state);
                  self.lock()
               }),
            };
         }
      }
   }

   /// Takes the lock only if nobody holds it right now.
   ///
   /// Returns `None` both when the slot is already initialized and when another
   /// caller is constructing; never sets WAITING and never parks.
   #[inline]
   pub(crate) fn try_lock(&self) -> Option<InitGuard<'_>> {
      self.lock_step(true).ok().flatten()
   }
}

/// `block_in_place` panics outside the multi-threaded scheduler.
#[cfg(feature = "async-tokio-mt")]
fn can_block_in_place() -> bool {
   use tokio::runtime::{Handle, RuntimeFlavor};

   Handle::try_current().is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
}

/// Scoped ownership of the initialization lock.
///
/// `commit` publishes the slot. Dropping the guard any other way (early `?`
/// return, panic unwinding through the constructor) resets the slot to
/// uninitialized and releases the lock.
pub(crate) struct InitGuard<'a> {
   state: &'a SlotState,
}

impl<'a> InitGuard<'a> {
   #[inline(always)]
   const fn new(state: &'a SlotState) -> Self {
      Self { state }
   }

   /// Marks the slot initialized and wakes every parked caller.
   #[inline(always)]
   pub(crate) fn commit(self) -> bool {
      let published = self.state.set_done();
      mem::forget(self);
      published
   }
}

impl Drop for InitGuard<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      self.state.set_uninit();
   }
}
