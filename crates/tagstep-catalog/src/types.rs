use serde::{Deserialize, Serialize};

/// Reference kind naming one image of an image stream, as `"stream@image"`.
pub const IMAGE_STREAM_IMAGE_KIND: &str = "ImageStreamImage";

/// Identity of a catalog object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
  pub name: String,
  pub namespace: String,
}

/// A named collection of tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStream {
  pub metadata: ObjectMeta,
  #[serde(default, skip_serializing_if = "ImageStreamStatus::is_empty")]
  pub status: ImageStreamStatus,
}

/// Where the images of a stream can be pulled from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamStatus {
  /// Repository on the cluster-internal registry.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub docker_image_repository: String,

  /// Repository on the publicly reachable registry.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub public_docker_image_repository: String,
}

impl ImageStreamStatus {
  pub fn is_empty(&self) -> bool {
    self.docker_image_repository.is_empty() && self.public_docker_image_repository.is_empty()
  }

  /// The repository consumers should pull from, preferring the public one.
  pub fn repository(&self) -> Option<&str> {
    if !self.public_docker_image_repository.is_empty() {
      Some(&self.public_docker_image_repository)
    } else if !self.docker_image_repository.is_empty() {
      Some(&self.docker_image_repository)
    } else {
      None
    }
  }
}

/// Registry hosts a catalog records on the streams it creates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryHosts {
  pub internal: Option<String>,
  pub public: Option<String>,
}

impl RegistryHosts {
  /// Status of a stream exposed through these hosts as `<host>/<namespace>/<name>`.
  pub fn status_for(&self, namespace: &str, name: &str) -> ImageStreamStatus {
    let repository = |host: &Option<String>| {
      host
        .as_deref()
        .map(|host| format!("{}/{}/{}", host, namespace, name))
        .unwrap_or_default()
    };

    ImageStreamStatus {
      docker_image_repository: repository(&self.internal),
      public_docker_image_repository: repository(&self.public),
    }
  }
}

/// How a tag's image is resolved by consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagReferencePolicyType {
  /// Consumers pull from the upstream location of the image.
  #[default]
  Source,
  /// The catalog tracks the image locally and serves it from its own registry.
  Local,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagReferencePolicy {
  #[serde(rename = "type")]
  pub policy_type: TagReferencePolicyType,
}

/// Reference to another catalog object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReference {
  pub kind: String,
  pub name: String,
  pub namespace: String,
}

/// Declares what image a tag resolves to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagReference {
  pub from: ObjectReference,
  pub reference_policy: TagReferencePolicy,
}

/// The image a tag currently resolves to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
  /// Image identity, usually a digest such as `sha256:...`.
  pub name: String,
}

/// A single tag of an image stream, named `"stream:tag"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageStreamTag {
  pub metadata: ObjectMeta,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tag: Option<TagReference>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image: Option<Image>,
}

impl ImageStreamTag {
  /// Split the tag name into its stream and tag parts.
  pub fn split_name(&self) -> Option<(&str, &str)> {
    split_tag_name(&self.metadata.name)
  }

  /// Identity of the image this tag currently resolves to, if known.
  pub fn image_name(&self) -> Option<&str> {
    self
      .image
      .as_ref()
      .map(|image| image.name.as_str())
      .filter(|name| !name.is_empty())
  }

  /// Image identity named by an `ImageStreamImage` source reference.
  pub fn source_image_name(&self) -> Option<&str> {
    let from = &self.tag.as_ref()?.from;
    if from.kind != IMAGE_STREAM_IMAGE_KIND {
      return None;
    }
    from
      .name
      .split_once('@')
      .map(|(_, image)| image)
      .filter(|image| !image.is_empty())
  }

  /// Fill in the resolved image from the source reference when it is not set.
  pub(crate) fn resolved(mut self) -> Self {
    if self.image_name().is_none()
      && let Some(name) = self.source_image_name()
    {
      self.image = Some(Image {
        name: name.to_string(),
      });
    }
    self
  }
}

/// Split a `"stream:tag"` name into its parts.
pub(crate) fn split_tag_name(name: &str) -> Option<(&str, &str)> {
  name
    .split_once(':')
    .filter(|(stream, tag)| !stream.is_empty() && !tag.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_repository_prefers_public() {
    let status = ImageStreamStatus {
      docker_image_repository: "registry.svc:5000/ns/stable".to_string(),
      public_docker_image_repository: "registry.example.com/ns/stable".to_string(),
    };
    assert_eq!(status.repository(), Some("registry.example.com/ns/stable"));

    let status = ImageStreamStatus {
      docker_image_repository: "registry.svc:5000/ns/stable".to_string(),
      ..Default::default()
    };
    assert_eq!(status.repository(), Some("registry.svc:5000/ns/stable"));

    assert_eq!(ImageStreamStatus::default().repository(), None);
  }

  #[test]
  fn test_registry_hosts_status() {
    let hosts = RegistryHosts {
      internal: Some("registry.svc:5000".to_string()),
      public: None,
    };
    let status = hosts.status_for("ns", "stable");
    assert_eq!(status.docker_image_repository, "registry.svc:5000/ns/stable");
    assert!(status.public_docker_image_repository.is_empty());
    assert!(RegistryHosts::default().status_for("ns", "stable").is_empty());
  }

  #[test]
  fn test_split_tag_name() {
    assert_eq!(split_tag_name("stable:latest"), Some(("stable", "latest")));
    assert_eq!(split_tag_name("stable"), None);
    assert_eq!(split_tag_name(":latest"), None);
    assert_eq!(split_tag_name("stable:"), None);
  }

  #[test]
  fn test_resolved_uses_source_image() {
    let tag = ImageStreamTag {
      metadata: ObjectMeta {
        name: "stable:latest".to_string(),
        namespace: "ns".to_string(),
      },
      tag: Some(TagReference {
        from: ObjectReference {
          kind: IMAGE_STREAM_IMAGE_KIND.to_string(),
          name: "pipeline@sha256:abc".to_string(),
          namespace: "ns".to_string(),
        },
        reference_policy: TagReferencePolicy::default(),
      }),
      image: None,
    };

    assert_eq!(tag.source_image_name(), Some("sha256:abc"));
    assert_eq!(tag.resolved().image_name(), Some("sha256:abc"));
  }
}
