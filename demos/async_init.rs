use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lazy_singleton::{BoxError, Slot};
use tokio::time::sleep;

static COUNTER: AtomicUsize = AtomicUsize::new(0);
static ASYNC_DATA: Slot<String> = Slot::new();

async fn get_async_data() -> &'static String {
   ASYNC_DATA
      .get_or_init_async(|| async {
         COUNTER.fetch_add(1, Ordering::Relaxed);
         tracing::info!("initializing async data");
         sleep(Duration::from_millis(50)).await;
         "Async expensive data".to_string()
      })
      .await
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
   tracing_subscriber::fmt()
      .with_max_level(tracing::Level::DEBUG)
      .compact()
      .init();

   let tasks: Vec<_> = (0..5)
      .map(|_| {
         tokio::spawn(async {
            println!("Task access: {}", get_async_data().await);
         })
      })
      .collect();

   for t in tasks {
      t.await?;
   }

   assert_eq!(ASYNC_DATA.get(), Some(&"Async expensive data".to_string()));
   assert_eq!(COUNTER.load(Ordering::Relaxed), 1);
   println!("Final async data: {}", get_async_data().await);
   Ok(())
}
