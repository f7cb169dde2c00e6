use std::sync::atomic::{AtomicBool, Ordering};

use lazy_singleton::logging::{setup_log, LogConfig};
use lazy_singleton::{global, try_get_instance, TryCreate};

static CONTEXT_READY: AtomicBool = AtomicBool::new(false);

#[derive(Debug, thiserror::Error)]
#[error("graphics context is not ready")]
struct ContextNotReady;

struct Renderer {
   api: &'static str,
}

impl TryCreate for Renderer {
   type Error = ContextNotReady;

   fn try_create() -> Result<Self, Self::Error> {
      if CONTEXT_READY.load(Ordering::SeqCst) {
         Ok(Self { api: "OpenGL" })
      } else {
         Err(ContextNotReady)
      }
   }
}

fn main() {
   setup_log(&LogConfig::from_json_str(r#"{ "core": { "log_level": "debug" } }"#).unwrap_or_default());

   // First attempt fails, the renderer stays uninitialized.
   match try_get_instance::<Renderer>() {
      Ok(_) => panic!("Should have failed"),
      Err(e) => println!("Caught error: {e}"),
   }
   assert!(!global().is_initialized::<Renderer>());

   CONTEXT_READY.store(true, Ordering::SeqCst);

   // Second attempt succeeds and logs "Renderer Initialize".
   let renderer = try_get_instance::<Renderer>().expect("context is ready now");
   println!("Renderer using {}", renderer.api);

   // Later calls return the same instance without constructing again.
   CONTEXT_READY.store(false, Ordering::SeqCst);
   assert!(std::ptr::eq(renderer, try_get_instance::<Renderer>().unwrap()));
}
