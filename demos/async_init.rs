use std::sync::atomic::{AtomicUsize, Ordering};

use lazy_singleton::logging::{setup_log, LogConfig};

static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

struct ShaderLibrary {
   shaders: Vec<&'static str>,
}

impl Default for ShaderLibrary {
   fn default() -> Self {
      CONSTRUCTED.fetch_add(1, Ordering::Relaxed);
      std::thread::sleep(std::time::Duration::from_millis(50));
      Self {
         shaders: vec!["pbr", "skybox", "grid"],
      }
   }
}

#[tokio::main]
async fn main() {
   setup_log(&LogConfig::default());

   let tasks: Vec<_> = (0..5)
      .map(|_| {
         tokio::spawn(async {
            let library = lazy_singleton::global()
               .get_instance_async::<ShaderLibrary>()
               .await;
            println!("Task sees {} shaders", library.shaders.len());
         })
      })
      .collect();

   for t in tasks {
      t.await.unwrap();
   }

   assert_eq!(CONSTRUCTED.load(Ordering::Relaxed), 1);
}
