use thiserror::Error;

pub const IMAGE_STREAM_KIND: &str = "imagestream";
pub const IMAGE_STREAM_TAG_KIND: &str = "imagestreamtag";

/// Errors returned by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
  /// The object being created is already present.
  #[error("{kind} \"{name}\" already exists in namespace \"{namespace}\"")]
  AlreadyExists {
    kind: &'static str,
    namespace: String,
    name: String,
  },

  /// The requested object does not exist.
  #[error("{kind} \"{name}\" not found in namespace \"{namespace}\"")]
  NotFound {
    kind: &'static str,
    namespace: String,
    name: String,
  },

  /// IO error when reading/writing catalog files or rendering objects.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// An object could not be serialized or parsed.
  #[error("invalid catalog object: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Any other failure reported by the catalog backend.
  #[error("catalog error: {message}")]
  Backend { message: String },
}

impl CatalogError {
  pub fn already_exists(
    kind: &'static str,
    namespace: impl Into<String>,
    name: impl Into<String>,
  ) -> Self {
    Self::AlreadyExists {
      kind,
      namespace: namespace.into(),
      name: name.into(),
    }
  }

  pub fn not_found(kind: &'static str, namespace: impl Into<String>, name: impl Into<String>) -> Self {
    Self::NotFound {
      kind,
      namespace: namespace.into(),
      name: name.into(),
    }
  }

  pub fn backend(message: impl Into<String>) -> Self {
    Self::Backend {
      message: message.into(),
    }
  }

  pub fn is_already_exists(&self) -> bool {
    matches!(self, Self::AlreadyExists { .. })
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound { .. })
  }
}
