use std::fmt;

use serde::{Deserialize, Serialize};

/// Image stream holding the intermediate images built by a job.
pub const PIPELINE_IMAGE_STREAM: &str = "pipeline";

/// Image stream holding the images a job publishes.
pub const STABLE_IMAGE_STREAM: &str = "stable";

/// A tag in the job's pipeline image stream, e.g. `"bin"` for `pipeline:bin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineImageStreamTagReference(String);

impl PipelineImageStreamTagReference {
  pub fn new(tag: impl Into<String>) -> Self {
    Self(tag.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// The `name:tag` form used to address this tag in the pipeline stream.
  pub fn stream_tag_name(&self) -> String {
    format!("{}:{}", PIPELINE_IMAGE_STREAM, self.0)
  }
}

impl fmt::Display for PipelineImageStreamTagReference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for PipelineImageStreamTagReference {
  fn from(tag: &str) -> Self {
    Self::new(tag)
  }
}

impl From<String> for PipelineImageStreamTagReference {
  fn from(tag: String) -> Self {
    Self(tag)
  }
}

/// Reference to a tag in an externally visible image stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageStreamTagReference {
  /// Namespace of the stream. Empty means the job namespace.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub namespace: String,

  pub name: String,

  pub tag: String,

  /// Optional short alias the tagged image is also known by inside the job.
  #[serde(rename = "as", default, skip_serializing_if = "String::is_empty")]
  pub as_name: String,
}

impl ImageStreamTagReference {
  /// Whether an alias is declared for this reference.
  pub fn has_alias(&self) -> bool {
    !self.as_name.is_empty()
  }

  /// The `name:tag` form used to address this tag in its stream.
  pub fn stream_tag_name(&self) -> String {
    format!("{}:{}", self.name, self.tag)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_pipeline_reference_is_plain_string() {
    let reference: PipelineImageStreamTagReference = serde_json::from_str("\"bin\"").unwrap();
    assert_eq!(reference.as_str(), "bin");
    assert_eq!(reference.stream_tag_name(), "pipeline:bin");
    assert_eq!(serde_json::to_string(&reference).unwrap(), "\"bin\"");
  }

  #[test]
  fn test_tag_reference_alias_field() {
    let reference: ImageStreamTagReference =
      serde_json::from_str(r#"{"name": "stable", "tag": "latest", "as": "my-app"}"#).unwrap();
    assert!(reference.namespace.is_empty());
    assert!(reference.has_alias());
    assert_eq!(reference.as_name, "my-app");
    assert_eq!(reference.stream_tag_name(), "stable:latest");
  }

  #[test]
  fn test_tag_reference_omits_empty_fields() {
    let reference = ImageStreamTagReference {
      name: "stable".to_string(),
      tag: "latest".to_string(),
      ..Default::default()
    };
    let json = serde_json::to_value(&reference).unwrap();
    assert_eq!(json, serde_json::json!({ "name": "stable", "tag": "latest" }));
  }
}
