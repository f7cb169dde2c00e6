//! The sink told about every singleton that finishes initializing.

use std::fmt;

/// Receives one call per singleton type, right after its instance is
/// constructed and before any caller can observe it.
///
/// A notifier runs while the slot is still `Initializing`, so it must not
/// access the singleton it is reporting on.
pub trait Notifier: Send + Sync {
   /// Called once with the name of the type that was initialized.
   fn notify(&self, type_name: &'static str);
}

impl<F> Notifier for F
where
   F: Fn(&'static str) + Send + Sync,
{
   #[inline]
   fn notify(&self, type_name: &'static str) {
      self(type_name)
   }
}

/// Default notifier: one `info` line per initialized type.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
   fn notify(&self, type_name: &'static str) {
      tracing::info!("{type_name} Initialize");
   }
}

/// Wraps a boxed notifier so the registry can print itself.
pub(crate) struct BoxedNotifier(pub(crate) Box<dyn Notifier>);

impl fmt::Debug for BoxedNotifier {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str("Notifier")
   }
}
