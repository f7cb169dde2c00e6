//! Process-wide singletons.
//!
//! Two ways to declare a type as a singleton:
//!
//! - call [`get_instance::<T>()`](get_instance) for any `T: Default`; the
//!   instance lives in the [`global`] registry, keyed by `TypeId`;
//! - or invoke [`singleton!`](crate::singleton) on the type, which adds a
//!   [`Singleton::instance`] accessor. It resolves the global registry's slot
//!   once and caches the reference in a per-type `static`.
//!
//! Both paths reach the same instance, so the first access through either
//! logs `"<type> Initialize"` once, and the instance is never dropped.

use crate::error::ConstructionError;
use crate::registry::{Registry, TryCreate};
use crate::slot::Slot;

static GLOBAL: Slot<Registry> = Slot::new();

/// The registry backing every process-wide singleton.
///
/// Created with a [`LogNotifier`](crate::LogNotifier) on first use unless
/// [`install_global`] ran before.
pub fn global() -> &'static Registry {
   GLOBAL.get_or_init(Registry::new)
}

/// Makes `registry` the process-wide registry, e.g. to route initialization
/// notices to a custom [`Notifier`](crate::Notifier).
///
/// Must run before anything touches [`global`]; afterwards the registry is
/// handed back in `Err`.
pub fn install_global(registry: Registry) -> Result<(), Registry> {
   GLOBAL.set(registry)
}

/// Returns the process-wide instance of `T`, constructing it on first
/// access.
///
/// ```
/// #[derive(Default)]
/// struct AssetManager {
///    loaded: std::sync::Mutex<Vec<String>>,
/// }
///
/// let assets = lazy_singleton::get_instance::<AssetManager>();
/// assets.loaded.lock().unwrap().push("cube.obj".into());
///
/// let again = lazy_singleton::get_instance::<AssetManager>();
/// assert_eq!(again.loaded.lock().unwrap().len(), 1);
/// ```
pub fn get_instance<T>() -> &'static T
where
   T: Default + Send + Sync + 'static,
{
   global().get_instance::<T>()
}

/// Fallible counterpart of [`get_instance`].
pub fn try_get_instance<T>() -> Result<&'static T, ConstructionError>
where
   T: TryCreate + Send + Sync + 'static,
{
   global().try_get_instance::<T>()
}

/// A type with exactly one process-wide instance.
///
/// Implemented by [`singleton!`](crate::singleton).
pub trait Singleton: Sized + Send + Sync + 'static {
   /// Returns the instance, constructing it on first access.
   fn instance() -> &'static Self;
}

/// Implements [`Singleton`] for a `Default` type.
///
/// The instance is the one [`get_instance`] returns; the macro only caches
/// the reference in a per-type static so later calls skip the registry
/// lookup.
///
/// ```
/// use lazy_singleton::{get_instance, singleton, Singleton};
///
/// #[derive(Default)]
/// pub struct PanelManager {
///    panels: Vec<&'static str>,
/// }
///
/// singleton!(PanelManager);
///
/// assert!(std::ptr::eq(PanelManager::instance(), PanelManager::instance()));
/// assert!(std::ptr::eq(PanelManager::instance(), get_instance::<PanelManager>()));
/// assert!(PanelManager::instance().panels.is_empty());
/// ```
#[macro_export]
macro_rules! singleton {
   ($ty:ty) => {
      impl $crate::Singleton for $ty {
         fn instance() -> &'static Self {
            static CACHED: $crate::Slot<&'static $ty> = $crate::Slot::new();
            CACHED.get_or_init(|| $crate::global().get_instance::<$ty>())
         }
      }
   };
}
