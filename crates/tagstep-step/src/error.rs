//! Step error types.

use tagstep_catalog::CatalogError;

/// Errors that end a step invocation.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
  /// The source image identity could not be determined.
  #[error("could not resolve base image {reference}: {reason}")]
  Resolution { reference: String, reason: String },

  /// A catalog call failed with something other than a tolerated outcome.
  #[error("could not {operation} {target}: {source}")]
  Catalog {
    operation: &'static str,
    target: String,
    #[source]
    source: CatalogError,
  },

  /// The surrounding call context was cancelled.
  #[error("execution cancelled")]
  Cancelled,
}

impl StepError {
  pub(crate) fn catalog(
    operation: &'static str,
    target: impl Into<String>,
    source: CatalogError,
  ) -> Self {
    Self::Catalog {
      operation,
      target: target.into(),
      source,
    }
  }
}

/// Errors resolving a provided parameter.
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
  /// The image stream exposes neither a public nor an internal repository.
  #[error("image stream {stream} has no accessible image registry value")]
  RegistryUnavailable { stream: String },

  /// The backing object could not be fetched.
  #[error("could not retrieve {target}: {source}")]
  Catalog {
    target: String,
    #[source]
    source: CatalogError,
  },

  /// Resolution was cancelled before it finished.
  #[error("parameter resolution cancelled")]
  Cancelled,
}
