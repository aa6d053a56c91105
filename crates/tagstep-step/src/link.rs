use std::fmt;

/// One end of a dependency edge between steps.
///
/// Links are compared structurally: two links are equal when they denote the
/// same resource, no matter which step declared them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepLink {
  /// A tag of the job's pipeline image stream exists.
  InternalImage(String),

  /// A tag in an externally visible image stream exists.
  ExternalImage {
    namespace: String,
    name: String,
    tag: String,
  },

  /// The release images of the job are available.
  ReleaseImages,
}

impl StepLink {
  pub fn internal_image(tag: impl Into<String>) -> Self {
    Self::InternalImage(tag.into())
  }

  pub fn external_image(
    namespace: impl Into<String>,
    name: impl Into<String>,
    tag: impl Into<String>,
  ) -> Self {
    Self::ExternalImage {
      namespace: namespace.into(),
      name: name.into(),
      tag: tag.into(),
    }
  }

  pub fn release_images() -> Self {
    Self::ReleaseImages
  }
}

impl fmt::Display for StepLink {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::InternalImage(tag) => write!(f, "pipeline:{}", tag),
      Self::ExternalImage {
        namespace,
        name,
        tag,
      } => write!(f, "{}/{}:{}", namespace, name, tag),
      Self::ReleaseImages => f.write_str("[release images]"),
    }
  }
}
