use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use lazy_singleton::{get_instance, global, install_global, singleton, Registry, Singleton};

#[derive(Default)]
struct EditorCamera {
   zoom: Mutex<f32>,
}

#[derive(Default)]
struct ImGuiBuilder {
   frames: AtomicUsize,
}

singleton!(ImGuiBuilder);

#[derive(Default)]
struct PanelManager {
   panels: Mutex<Vec<&'static str>>,
}

singleton!(PanelManager);

#[test]
fn test_free_accessor_returns_same_instance() {
   let camera = get_instance::<EditorCamera>();
   *camera.zoom.lock().unwrap() = 2.5;

   let again = get_instance::<EditorCamera>();
   assert!(std::ptr::eq(camera, again));
   assert_eq!(*again.zoom.lock().unwrap(), 2.5);
   assert!(global().is_initialized::<EditorCamera>());
}

#[test]
fn test_macro_singleton_across_threads() {
   const THREADS: usize = 32;
   let barrier = Arc::new(Barrier::new(THREADS));

   let handles: Vec<_> = (0..THREADS)
      .map(|_| {
         let barrier = Arc::clone(&barrier);
         thread::spawn(move || {
            barrier.wait();
            let builder = ImGuiBuilder::instance();
            builder.frames.fetch_add(1, Ordering::SeqCst);
            builder as *const ImGuiBuilder as usize
         })
      })
      .collect();

   let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
   assert!(addresses.windows(2).all(|w| w[0] == w[1]));
   assert_eq!(ImGuiBuilder::instance().frames.load(Ordering::SeqCst), THREADS);
}

#[test]
fn test_macro_and_free_accessor_share_one_instance() {
   PanelManager::instance().panels.lock().unwrap().push("hierarchy");

   assert!(global().is_initialized::<PanelManager>());
   assert!(std::ptr::eq(PanelManager::instance(), get_instance::<PanelManager>()));
   assert_eq!(*get_instance::<PanelManager>().panels.lock().unwrap(), vec!["hierarchy"]);
}

#[derive(Default)]
struct InspectorPanel;

singleton!(InspectorPanel);

#[test]
fn test_free_accessor_first_then_macro() {
   let free = get_instance::<InspectorPanel>();
   assert!(std::ptr::eq(free, InspectorPanel::instance()));
}

#[test]
fn test_install_after_first_use_is_rejected() {
   let _ = get_instance::<EditorCamera>();
   let rejected = install_global(Registry::new());
   assert!(rejected.is_err());
}
