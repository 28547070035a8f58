use std::error::Error as StdError;

use thiserror::Error;

/// Boxed constructor error carried by [`ConstructionFailure`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Building the singleton instance failed.
///
/// Returned only to the caller whose constructor call failed. The slot is left
/// empty, so a later call to [`Singleton::instance`](crate::Singleton::instance)
/// runs the constructor again.
#[derive(Debug, Error)]
#[error("failed to construct `{type_name}` (attempt {attempt}): {source}")]
pub struct ConstructionFailure {
   type_name: &'static str,
   attempt: usize,
   #[source]
   source: BoxError,
}

impl ConstructionFailure {
   pub(crate) fn new(type_name: &'static str, attempt: usize, source: BoxError) -> Self {
      Self {
         type_name,
         attempt,
         source,
      }
   }

   /// Name of the type that failed to construct.
   pub fn type_name(&self) -> &'static str {
      self.type_name
   }

   /// Which construction attempt failed, counting from 1.
   pub fn attempt(&self) -> usize {
      self.attempt
   }

   /// The constructor's own error.
   pub fn source_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
      &*self.source
   }

   /// Downcasts the constructor's error to a concrete type.
   pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
      self.source.downcast_ref::<E>()
   }

   /// Consumes the failure, returning the constructor's own error.
   pub fn into_source(self) -> BoxError {
      self.source
   }
}
