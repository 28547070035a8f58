use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use lazy_singleton::{BoxError, Singleton};

static BUILDS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct Catalog {
   entries: Vec<&'static str>,
}

fn load_catalog() -> Result<Catalog, BoxError> {
   BUILDS.fetch_add(1, Ordering::Relaxed);
   // Simulate work
   thread::sleep(Duration::from_millis(50));
   Ok(Catalog {
      entries: vec!["alpha", "beta", "gamma"],
   })
}

static CATALOG: Singleton<Catalog> = Singleton::new(load_catalog);

fn main() -> Result<(), BoxError> {
   tracing_subscriber::fmt()
      .with_max_level(tracing::Level::DEBUG)
      .with_thread_ids(true)
      .compact()
      .init();

   let threads: Vec<_> = (0..5)
      .map(|_| {
         thread::spawn(|| {
            let catalog = CATALOG.instance()?;
            println!("Thread access: {} entries at {:p}", catalog.entries.len(), catalog);
            Ok::<_, BoxError>(())
         })
      })
      .collect();

   for t in threads {
      t.join().map_err(|_| "worker thread panicked")??;
   }

   assert_eq!(BUILDS.load(Ordering::Relaxed), 1);
   println!("Final catalog: {:?}", CATALOG.instance()?);
   println!("Stats: {:?}", CATALOG.stats());
   Ok(())
}
