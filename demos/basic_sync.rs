use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use lazy_singleton::logging::{setup_log, LogConfig};
use lazy_singleton::{singleton, Singleton};

static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

struct AssetManager {
   loaded: Mutex<Vec<String>>,
}

impl Default for AssetManager {
   fn default() -> Self {
      CONSTRUCTED.fetch_add(1, Ordering::Relaxed);
      // Simulate scanning the asset directory.
      std::thread::sleep(std::time::Duration::from_millis(50));
      Self {
         loaded: Mutex::new(Vec::new()),
      }
   }
}

singleton!(AssetManager);

fn main() {
   setup_log(&LogConfig::default());

   let threads: Vec<_> = (0..5)
      .map(|i| {
         std::thread::spawn(move || {
            let assets = AssetManager::instance();
            assets.loaded.lock().unwrap().push(format!("mesh_{i}.obj"));
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }

   assert_eq!(CONSTRUCTED.load(Ordering::Relaxed), 1); // "AssetManager Initialize" logged once
   println!("Loaded: {:?}", AssetManager::instance().loaded.lock().unwrap());
}
