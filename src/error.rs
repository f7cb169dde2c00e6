use std::error::Error as StdError;

use thiserror::Error;

/// A singleton constructor returned an error.
///
/// The slot it was building stays uninitialized, so the next access runs the
/// constructor again.
#[derive(Debug, Error)]
#[error("failed to construct singleton {type_name}: {source}")]
pub struct ConstructionError {
   /// Name of the type whose constructor failed.
   pub type_name: &'static str,
   /// The constructor's own error.
   #[source]
   pub source: Box<dyn StdError + Send + Sync + 'static>,
}

impl ConstructionError {
   pub(crate) fn new<T, E>(source: E) -> Self
   where
      E: StdError + Send + Sync + 'static,
   {
      Self {
         type_name: std::any::type_name::<T>(),
         source: Box::new(source),
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[derive(Debug, Error)]
   #[error("device lost")]
   struct DeviceLost;

   struct Renderer;

   #[test]
   fn test_display_names_type_and_cause() {
      let err = ConstructionError::new::<Renderer, _>(DeviceLost);
      assert!(err.type_name.ends_with("Renderer"));
      assert_eq!(
         err.to_string(),
         format!("failed to construct singleton {}: device lost", err.type_name)
      );
   }

   #[test]
   fn test_source_is_kept() {
      let err = ConstructionError::new::<Renderer, _>(DeviceLost);
      let source = err.source().expect("source must be set");
      assert!(source.downcast_ref::<DeviceLost>().is_some());
   }
}
