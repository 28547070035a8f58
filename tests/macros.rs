use std::num::ParseIntError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use lazy_singleton::lazy_singleton;

#[derive(Debug, PartialEq)]
struct Limits {
   max_connections: u32,
}

static LIMIT_BUILDS: AtomicUsize = AtomicUsize::new(0);

fn load_limits() -> Result<Limits, ParseIntError> {
   LIMIT_BUILDS.fetch_add(1, Ordering::SeqCst);
   Ok(Limits {
      max_connections: "256".parse()?,
   })
}

fn load_broken() -> Result<u32, ParseIntError> {
   "not a number".parse()
}

lazy_singleton! {
   /// Connection limits.
   pub fn limits() -> Limits = load_limits;
   fn broken() -> u32 = load_broken;
   fn greeting() -> String = || Ok::<_, std::fmt::Error>(String::from("hello"));
}

#[test]
fn test_accessor_builds_once() {
   let threads: Vec<_> = (0..8)
      .map(|_| thread::spawn(|| limits().unwrap() as *const Limits as usize))
      .collect();
   let addresses: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();

   assert!(addresses.windows(2).all(|w| w[0] == w[1]));
   assert_eq!(limits().unwrap(), &Limits { max_connections: 256 });
   assert_eq!(LIMIT_BUILDS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_accessor_propagates_failure() {
   let err = broken().unwrap_err();
   assert_eq!(err.type_name(), "u32");
   assert!(err.downcast_ref::<ParseIntError>().is_some());

   // Not cached: the next call tries again
   assert_eq!(broken().unwrap_err().attempt(), 2);
}

#[test]
fn test_accessor_accepts_closure() {
   assert_eq!(greeting().unwrap(), "hello");
   assert!(std::ptr::eq(greeting().unwrap(), greeting().unwrap()));
}
