//! Storage for one lazily constructed instance.
//!
//! [`Slot<T>`] is the building block behind both the [`Registry`](crate::Registry)
//! and the [`singleton!`](crate::singleton) macro. It can live in a `static`,
//! reads of a ready slot are a single atomic load, and initialization runs
//! exactly once per successful attempt no matter how many threads race for it.
//!
//! A slot has no way back from `Ready`: there is no `take`, `reset` or
//! `replace`, and it cannot be cloned.
//!
//! ```compile_fail
//! use lazy_singleton::Slot;
//!
//! let slot: Slot<String> = Slot::new();
//! let copy: Slot<String> = slot.clone();
//! ```

use core::cell::UnsafeCell;
use core::sync::atomic::Ordering;
use core::{fmt, mem};

use crate::state::SlotState;

/// A thread-safe cell holding at most one lazily constructed value.
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
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
         state: SlotState::new(),
      }
   }

   /// Returns `true` once the value is published. Never blocks.
   #[inline]
   pub fn is_ready(&self) -> bool {
      self.state.is_ready(Ordering::Acquire)
   }

   /// Returns the value if it is published. Never blocks and never
   /// initializes.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.is_ready() {
         // SAFETY: READY was observed with Acquire ordering.
         Some(unsafe { self.get_unchecked() })
      } else {
         None
      }
   }

   /// # Safety
   ///
   /// The slot must be ready.
   #[inline]
   unsafe fn get_unchecked(&self) -> &T {
      debug_assert!(self.is_ready(), "read of an empty slot");
      (*self.value.get()).assume_init_ref()
   }

   /// Installs `value` if the slot is empty, blocking while another thread
   /// initializes it.
   ///
   /// Returns `Err(value)` if the slot was already (or concurrently) filled.
   pub fn set(&self, value: T) -> Result<(), T> {
      let Some(guard) = self.state.lock() else {
         return Err(value);
      };
      // SAFETY: we are the winner, nobody reads the value before commit.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
      Ok(())
   }

   /// Returns the value, running `f` to construct it if the slot is empty.
   ///
   /// Concurrent callers block until the winner's `f` returns and then all
   /// observe the same value. If `f` panics the slot stays empty and the
   /// next caller runs its own initializer.
   #[inline]
   pub fn get_or_init<F>(&self, f: F) -> &T
   where
      F: FnOnce() -> T,
   {
      if let Some(value) = self.get() {
         return value;
      }
      self.initialize(f);
      // SAFETY: `initialize` only returns once the slot is ready.
      unsafe { self.get_unchecked() }
   }

   /// Like [`get_or_init`](Self::get_or_init) for a fallible constructor.
   ///
   /// An `Err` is handed to the caller that ran `f` and leaves the slot empty,
   /// so a later call retries.
   pub fn get_or_try_init<F, E>(&self, f: F) -> Result<&T, E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.try_initialize(f)?;
      // SAFETY: `try_initialize` returned Ok, the slot is ready.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Async flavour of [`get_or_init`](Self::get_or_init). Waiting tasks
   /// yield instead of parking the executor thread.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_or_init_async<F, Fut>(&self, f: F) -> &T
   where
      F: FnOnce() -> Fut,
      Fut: core::future::Future<Output = T>,
   {
      if let Some(value) = self.get() {
         return value;
      }
      if let Some(guard) = self.state.lock_async().await {
         let value = f().await;
         // SAFETY: we are the winner.
         unsafe { (*self.value.get()).write(value) };
         guard.commit();
      }
      // SAFETY: either we committed or `lock_async` saw READY.
      unsafe { self.get_unchecked() }
   }

   /// Async flavour of [`get_or_try_init`](Self::get_or_try_init).
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_or_try_init_async<F, Fut, E>(&self, f: F) -> Result<&T, E>
   where
      F: FnOnce() -> Fut,
      Fut: core::future::Future<Output = Result<T, E>>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      if let Some(guard) = self.state.lock_async().await {
         let value = f().await?;
         // SAFETY: we are the winner.
         unsafe { (*self.value.get()).write(value) };
         guard.commit();
      }
      // SAFETY: either we committed or `lock_async` saw READY.
      Ok(unsafe { self.get_unchecked() })
   }

   #[cold]
   fn initialize<F>(&self, f: F)
   where
      F: FnOnce() -> T,
   {
      let Some(guard) = self.state.lock() else {
         return;
      };
      // A panic in `f` drops the guard and resets the slot.
      let value = f();
      // SAFETY: we are the winner.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
   }

   #[cold]
   fn try_initialize<F, E>(&self, f: F) -> Result<(), E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      let Some(guard) = self.state.lock() else {
         return Ok(());
      };
      let value = f()?;
      // SAFETY: we are the winner.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
      Ok(())
   }
}

// SAFETY: shared access hands out `&T` to many threads (`T: Sync`) and the
// value may be constructed on one thread and dropped on another (`T: Send`).
unsafe impl<T: Sync + Send> Sync for Slot<T> {}
// SAFETY: moving the slot moves ownership of the `T`.
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
   fn drop(&mut self) {
      if self.is_ready() {
         // SAFETY: the slot is ready and we have exclusive access.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}
