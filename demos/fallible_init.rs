use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use lazy_singleton::{ConstructionFailure, Singleton};

static BACKEND_UP: AtomicBool = AtomicBool::new(false);

#[derive(Debug)]
struct Connection {
   endpoint: &'static str,
}

fn connect() -> Result<Connection, io::Error> {
   if BACKEND_UP.load(Ordering::SeqCst) {
      Ok(Connection {
         endpoint: "10.0.0.1:5432",
      })
   } else {
      Err(io::Error::new(io::ErrorKind::ConnectionRefused, "backend not reachable"))
   }
}

static CONNECTION: Singleton<Connection, fn() -> Result<Connection, io::Error>> =
   Singleton::new(connect);

fn main() -> Result<(), ConstructionFailure> {
   tracing_subscriber::fmt()
      .with_max_level(tracing::Level::DEBUG)
      .compact()
      .init();

   // First attempt fails
   match CONNECTION.instance() {
      Ok(_) => panic!("Should have failed"),
      Err(e) => println!("Caught error: {e}"),
   }
   assert!(!CONNECTION.is_initialized());

   // Second attempt succeeds
   BACKEND_UP.store(true, Ordering::SeqCst);
   let conn = CONNECTION.instance()?;
   println!("Connected to {}", conn.endpoint);

   // Later calls return the published instance even if the backend goes away
   BACKEND_UP.store(false, Ordering::SeqCst);
   assert!(std::ptr::eq(CONNECTION.instance()?, conn));
   println!("Stats: {:?}", CONNECTION.stats());
   Ok(())
}
