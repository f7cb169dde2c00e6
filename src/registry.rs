//! Type-keyed registry of lazily constructed singletons.
//!
//! A [`Registry`] owns at most one instance per type. The first
//! [`get_instance`](Registry::get_instance) for a type constructs it, reports
//! it to the registry's [`Notifier`] and publishes it; every later call, from
//! any thread, returns a reference to that same instance.
//!
//! The process-wide registry behind [`get_instance`](crate::get_instance) is
//! one of these. Tests build their own so every test starts from empty slots.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::error::Error as StdError;

use parking_lot::RwLock;

use crate::error::ConstructionError;
use crate::notify::{BoxedNotifier, LogNotifier, Notifier};
use crate::slot::Slot;

type ErasedSlot = Box<dyn Any + Send + Sync>;

/// Types whose construction can fail.
///
/// Used by [`Registry::try_get_instance`]. A failed attempt leaves the type
/// uninitialized and is retried on the next access.
pub trait TryCreate: Sized {
   type Error: StdError + Send + Sync + 'static;

   fn try_create() -> Result<Self, Self::Error>;
}

/// One slot per type, plus the notifier told about each initialization.
///
/// Registries cannot be cloned; references handed out live as long as the
/// registry.
///
/// ```compile_fail
/// use lazy_singleton::Registry;
///
/// let registry = Registry::new();
/// let copy: Registry = registry.clone();
/// ```
#[derive(Debug)]
pub struct Registry {
   slots: RwLock<HashMap<TypeId, ErasedSlot>>,
   notifier: BoxedNotifier,
}

impl Registry {
   /// Creates an empty registry that logs each initialization.
   pub fn new() -> Self {
      Self::with_notifier(LogNotifier)
   }

   /// Creates an empty registry reporting to `notifier`.
   pub fn with_notifier(notifier: impl Notifier + 'static) -> Self {
      Self {
         slots: RwLock::new(HashMap::new()),
         notifier: BoxedNotifier(Box::new(notifier)),
      }
   }

   /// The sink this registry reports initializations to.
   pub fn notifier(&self) -> &dyn Notifier {
      &*self.notifier.0
   }

   /// Returns the single instance of `T`, constructing it with
   /// `T::default()` on first access.
   ///
   /// Threads racing on the first access block until the winner has built
   /// the instance and notified; all of them then get the same reference.
   /// A panicking `T::default()` leaves `T` uninitialized and the next call
   /// tries again.
   ///
   /// `T::default()` may access other singletons of this registry, but not
   /// `T` itself.
   ///
   /// ```
   /// use lazy_singleton::Registry;
   ///
   /// #[derive(Default)]
   /// struct ShortcutManager {
   ///    bindings: Vec<String>,
   /// }
   ///
   /// let registry = Registry::new();
   /// let a = registry.get_instance::<ShortcutManager>();
   /// let b = registry.get_instance::<ShortcutManager>();
   /// assert!(std::ptr::eq(a, b));
   /// assert!(a.bindings.is_empty());
   /// ```
   pub fn get_instance<T>(&self) -> &T
   where
      T: Default + Send + Sync + 'static,
   {
      self.slot::<T>().get_or_init(|| self.construct(T::default))
   }

   /// Like [`get_instance`](Self::get_instance) for types built by
   /// [`TryCreate`].
   ///
   /// The caller that ran the failing constructor gets the error; no
   /// notification is sent and the next call retries.
   pub fn try_get_instance<T>(&self) -> Result<&T, ConstructionError>
   where
      T: TryCreate + Send + Sync + 'static,
   {
      self.slot::<T>().get_or_try_init(|| {
         let value = T::try_create().map_err(ConstructionError::new::<T, _>)?;
         self.notifier.0.notify(std::any::type_name::<T>());
         Ok(value)
      })
   }

   /// Async flavour of [`get_instance`](Self::get_instance): tasks waiting
   /// on another task's construction yield instead of parking the worker.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_instance_async<T>(&self) -> &T
   where
      T: Default + Send + Sync + 'static,
   {
      self
         .slot::<T>()
         .get_or_init_async(|| async { self.construct(T::default) })
         .await
   }

   /// Returns the instance of `T` if it has been constructed. Never
   /// constructs and never notifies.
   pub fn get<T>(&self) -> Option<&T>
   where
      T: Send + Sync + 'static,
   {
      self.existing_slot::<T>().and_then(Slot::get)
   }

   /// Returns `true` once `T`'s instance is published.
   pub fn is_initialized<T>(&self) -> bool
   where
      T: Send + Sync + 'static,
   {
      self.get::<T>().is_some()
   }

   /// Builds a value and reports it before it becomes visible.
   fn construct<T>(&self, f: impl FnOnce() -> T) -> T {
      let value = f();
      self.notifier.0.notify(std::any::type_name::<T>());
      value
   }

   fn existing_slot<T>(&self) -> Option<&Slot<T>>
   where
      T: Send + Sync + 'static,
   {
      let slots = self.slots.read();
      let erased = slots.get(&TypeId::of::<T>())?;
      // SAFETY: see `unerase`.
      Some(unsafe { Self::unerase(erased) })
   }

   /// Finds or creates `T`'s slot. The map lock is released before the
   /// slot is initialized.
   fn slot<T>(&self) -> &Slot<T>
   where
      T: Send + Sync + 'static,
   {
      if let Some(slot) = self.existing_slot::<T>() {
         return slot;
      }
      let mut slots = self.slots.write();
      let erased = slots
         .entry(TypeId::of::<T>())
         .or_insert_with(|| Box::new(Slot::<T>::new()));
      // SAFETY: see `unerase`.
      unsafe { Self::unerase(erased) }
   }

   /// # Safety
   ///
   /// `erased` must be the entry stored under `TypeId::of::<T>()`. Entries
   /// are never removed or replaced while the registry is alive and each
   /// slot sits in its own heap allocation, so the slot outlives the map
   /// lock guard and stays valid for the registry's lifetime `'a`.
   unsafe fn unerase<'a, T>(erased: &ErasedSlot) -> &'a Slot<T>
   where
      T: Send + Sync + 'static,
   {
      debug_assert!((**erased).is::<Slot<T>>(), "slot stored under the wrong type");
      &*(&**erased as *const (dyn Any + Send + Sync)).cast::<Slot<T>>()
   }
}

impl Default for Registry {
   fn default() -> Self {
      Self::new()
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[derive(Default)]
   struct Camera {
      fov: f32,
   }

   #[test]
   fn test_slot_address_survives_rehash() {
      let registry = Registry::with_notifier(|_: &'static str| {});
      let camera: *const Camera = registry.get_instance::<Camera>();

      // Force the map to grow well past its first allocation.
      macro_rules! fill {
         ($($n:literal)*) => {$(
            registry.get_instance::<[u8; $n]>();
         )*};
      }
      fill!(1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31 32);

      assert!(std::ptr::eq(camera, registry.get_instance::<Camera>()));
      assert_eq!(registry.get_instance::<Camera>().fov, 0.0);
   }

   #[test]
   fn test_existing_slot_does_not_create() {
      let registry = Registry::with_notifier(|_: &'static str| {});
      assert!(registry.existing_slot::<Camera>().is_none());
      assert!(registry.slots.read().is_empty());
   }
}
