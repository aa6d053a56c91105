use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::step::OutputImageTagStepConfiguration;

/// Ambient information about the job the steps run for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
  /// Namespace the job builds its pipeline images in.
  pub namespace: String,
}

impl JobSpec {
  pub fn new(namespace: impl Into<String>) -> Self {
    Self {
      namespace: namespace.into(),
    }
  }
}

/// Where the image catalog lives and how its streams are exposed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDef {
  /// Root directory of a filesystem-backed catalog.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub root: Option<PathBuf>,

  /// Registry host recorded as the internal repository of new streams.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub registry_host: Option<String>,

  /// Registry host recorded as the public repository of new streams.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub public_registry_host: Option<String>,
}

/// A job definition as read from a job file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDef {
  pub namespace: String,

  #[serde(default)]
  pub catalog: CatalogDef,

  #[serde(default)]
  pub output_image_tags: Vec<OutputImageTagStepConfiguration>,
}

impl JobDef {
  pub fn job_spec(&self) -> JobSpec {
    JobSpec::new(self.namespace.clone())
  }
}
