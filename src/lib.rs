//! Lazily constructed, process-wide singletons.
//!
//! Every singleton type gets exactly one instance, built on first access and
//! kept until the process exits. The first access also reports
//! `"<type> Initialize"` to a [`Notifier`], exactly once, even when many
//! threads race for it: one thread constructs and notifies, the others block
//! until it is done and then share its instance.
//!
//! # Examples
//!
//! ## Any `Default` type
//!
//! ```rust
//! #[derive(Default)]
//! struct ProjectManager {
//!    open: std::sync::Mutex<Option<String>>,
//! }
//!
//! let projects = lazy_singleton::get_instance::<ProjectManager>();
//! *projects.open.lock().unwrap() = Some("sandbox".into());
//!
//! assert!(std::ptr::eq(projects, lazy_singleton::get_instance::<ProjectManager>()));
//! ```
//!
//! ## A dedicated static slot
//!
//! ```rust
//! use lazy_singleton::{singleton, Singleton};
//!
//! #[derive(Default)]
//! struct FileReloader {
//!    watched: Vec<String>,
//! }
//!
//! singleton!(FileReloader);
//!
//! assert!(FileReloader::instance().watched.is_empty());
//! ```
//!
//! ## An isolated registry
//!
//! ```rust
//! use lazy_singleton::Registry;
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct SelectionManager;
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&log);
//! let registry = Registry::with_notifier(move |name: &'static str| sink.lock().unwrap().push(name));
//!
//! registry.get_instance::<SelectionManager>();
//! registry.get_instance::<SelectionManager>();
//! assert_eq!(log.lock().unwrap().len(), 1);
//! ```
//!
//! Instances are handed out by shared reference only; a singleton cannot be
//! moved out or duplicated through the accessor:
//!
//! ```compile_fail
//! #[derive(Default)]
//! struct Renderer;
//!
//! let owned: Renderer = *lazy_singleton::get_instance::<Renderer>();
//! ```

/// Error types.
mod error;

/// Log configuration and subscriber setup.
pub mod logging;

/// Initialization notices.
mod notify;

/// Type-keyed singleton registry.
mod registry;

/// Process-wide registry and the `singleton!` macro.
mod singleton;

/// Lazily filled storage cell.
mod slot;

/// One-shot state machine.
mod state;

pub use error::ConstructionError;
pub use notify::{LogNotifier, Notifier};
pub use registry::{Registry, TryCreate};
pub use singleton::{get_instance, global, install_global, try_get_instance, Singleton};
pub use slot::Slot;
