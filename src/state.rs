//! One-shot initialization state shared by every singleton slot.
//!
//! A slot moves through `Uninitialized → Initializing → Ready`. The whole
//! state lives in one `AtomicU8`:
//! - Bit 0: READY - the value is published
//! - Bit 1: INITIALIZING - a winner thread is constructing the value
//! - Bit 2: WAITING - at least one loser is parked on this slot
//! - Bits 3-7: EPOCH - bumped on every terminal transition
//!
//! Losers park on the address of the atomic through `parking_lot_core` and
//! are woken when the winner commits or abandons the attempt.

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// Atomic state of a single slot.
#[repr(transparent)]
pub(crate) struct SlotState(AtomicU8);

impl SlotState {
   const READY: u8 = 1;
   const INITIALIZING: u8 = 2;
   const WAITING: u8 = 4;
   const EPOCH_1: u8 = 8;
   const EPOCH_MASK: u8 = !(Self::READY | Self::INITIALIZING | Self::WAITING);

   #[inline(always)]
   const fn next_epoch(state: u8) -> u8 {
      (state & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// Creates the state of an empty slot.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(0))
   }

   #[inline]
   pub(crate) fn is_ready(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) & Self::READY != 0
   }

   fn wake_all(&self) {
      // SAFETY: the key is the address of the atomic, the same key `park` uses.
      unsafe {
         parking_lot_core::unpark_all(self.0.as_ptr() as usize, DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the calling thread while the state still equals `observed`.
   fn park(&self, observed: u8) {
      // SAFETY: see `wake_all`.
      unsafe {
         // Spurious wake-ups are fine, callers re-check the state.
         let _ = parking_lot_core::park(
            self.0.as_ptr() as usize,
            || self.0.load(Ordering::Acquire) == observed,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// `Initializing → Ready`. Wakes parked losers.
   fn publish(&self) {
      let current = self.0.load(Ordering::Relaxed);
      // Release pairs with the Acquire loads in readers: the value write
      // happens-before anyone observes READY.
      let prev = self
         .0
         .swap(Self::READY | Self::next_epoch(current), Ordering::Release);
      debug_assert!(prev & Self::READY == 0, "slot published twice");
      if prev & Self::WAITING != 0 {
         self.wake_all();
      }
   }

   /// `Initializing → Uninitialized` after a failed attempt. Wakes parked
   /// losers so one of them can retry.
   fn abandon(&self) {
      let current = self.0.load(Ordering::Relaxed);
      let prev = self.0.swap(Self::next_epoch(current), Ordering::Release);
      if prev & Self::WAITING != 0 {
         self.wake_all();
      }
   }

   /// One attempt at entering `Initializing`.
   ///
   /// - `Ok(None)`: the slot is already `Ready`.
   /// - `Ok(Some(guard))`: the caller is the winner.
   /// - `Err(state)`: another thread is initializing. Unless `nowait`, the
   ///   WAITING bit is set in the returned state.
   fn try_enter(&self, nowait: bool) -> Result<Option<InitGuard<'_>>, u8> {
      loop {
         let state = self.0.load(Ordering::Relaxed);
         if state & Self::READY != 0 {
            return Ok(None);
         }

         if state & Self::INITIALIZING == 0 {
            match self.0.compare_exchange_weak(
               state,
               state | Self::INITIALIZING,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Ok(Some(InitGuard { state: self })),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         if !nowait && state & Self::WAITING == 0 {
            let waiting = state | Self::WAITING;
            match self
               .0
               .compare_exchange_weak(state, waiting, Ordering::Relaxed, Ordering::Relaxed)
            {
               Ok(_) => return Err(waiting),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         return Err(state);
      }
   }

   /// Blocks until the slot is `Ready` (returns `None`) or the caller wins
   /// the right to initialize it (returns the guard).
   pub(crate) fn lock(&self) -> Option<InitGuard<'_>> {
      loop {
         match self.try_enter(false) {
            Ok(guard) => return guard,
            Err(observed) => self.park(observed),
         }
      }
   }

   /// Async flavour of [`lock`](Self::lock). Yields to the runtime while
   /// another task initializes; only a multi-thread runtime ever parks the
   /// worker thread, and then through `block_in_place`.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub(crate) async fn lock_async(&self) -> Option<InitGuard<'_>> {
      loop {
         for _ in 0..16 {
            match self.try_enter(false) {
               Ok(guard) => return guard,
               Err(observed) => {
                  for _ in 0..32 {
                     tokio::task::yield_now().await;
                     if self.0.load(Ordering::Relaxed) != observed {
                        break;
                     }
                  }
               }
            }
         }

         #[cfg(feature = "async-tokio-mt")]
         {
            if can_block_in_place() {
               return match self.try_enter(false) {
                  Ok(guard) => guard,
                  Err(observed) => tokio::task::block_in_place(|| {
                     self.park(observed);
                     self.lock()
                  }),
               };
            }
         }
      }
   }

   /// Enters `Initializing` only if nobody else holds it.
   #[cfg(test)]
   pub(crate) fn try_lock(&self) -> Option<InitGuard<'_>> {
      self.try_enter(true).ok().flatten()
   }
}

#[cfg(feature = "async-tokio-mt")]
fn can_block_in_place() -> bool {
   use tokio::runtime::{Handle, RuntimeFlavor};

   Handle::try_current()
      .map(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
      .unwrap_or(false)
}

/// Proof that the holder is the single winner for a slot.
///
/// Must be [`commit`](Self::commit)ted once the value is written. Dropping
/// it instead (error, panic, cancelled future) puts the slot back to
/// `Uninitialized`.
pub(crate) struct InitGuard<'a> {
   state: &'a SlotState,
}

impl InitGuard<'_> {
   /// `Initializing → Ready`.
   #[inline]
   pub(crate) fn commit(self) {
      self.state.publish();
      mem::forget(self);
   }
}

impl Drop for InitGuard<'_> {
   fn drop(&mut self) {
      self.state.abandon();
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_commit_makes_ready() {
      let state = SlotState::new();
      assert!(!state.is_ready(Ordering::Acquire));

      let guard = state.lock().expect("empty slot must hand out a guard");
      assert!(state.try_lock().is_none(), "second winner while initializing");
      guard.commit();

      assert!(state.is_ready(Ordering::Acquire));
      assert!(state.lock().is_none());
      assert!(state.try_lock().is_none());
   }

   #[test]
   fn test_dropped_guard_resets() {
      let state = SlotState::new();
      drop(state.lock());
      assert!(!state.is_ready(Ordering::Acquire));

      // The slot can be won again.
      let guard = state.try_lock().expect("abandoned slot must be lockable");
      guard.commit();
      assert!(state.is_ready(Ordering::Acquire));
   }

   #[test]
   fn test_epoch_wraps() {
      let state = SlotState::new();
      for _ in 0..64 {
         drop(state.lock());
      }
      assert!(!state.is_ready(Ordering::Acquire));
      assert_eq!(state.0.load(Ordering::Relaxed) & !SlotState::EPOCH_MASK, 0);
   }
}
