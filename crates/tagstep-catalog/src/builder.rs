//! Construction of the catalog objects a step converges.
//!
//! These functions perform no I/O and accept any names verbatim; whether a
//! name is valid is for the catalog to decide.

use crate::types::{
  IMAGE_STREAM_IMAGE_KIND, ImageStream, ImageStreamStatus, ImageStreamTag, ObjectMeta,
  ObjectReference, TagReference, TagReferencePolicy, TagReferencePolicyType,
};

/// An image stream named `name` in `namespace`.
pub fn new_image_stream(namespace: &str, name: &str) -> ImageStream {
  ImageStream {
    metadata: ObjectMeta {
      name: name.to_string(),
      namespace: namespace.to_string(),
    },
    status: ImageStreamStatus::default(),
  }
}

/// A tag `to_name:to_tag` in `to_namespace` resolving to image `from_image` of
/// stream `from_name` in `from_namespace`.
///
/// The tag uses the local reference policy, so the catalog tracks the image
/// itself instead of pointing consumers at the source stream.
pub fn new_image_stream_tag(
  from_namespace: &str,
  from_name: &str,
  from_image: &str,
  to_namespace: &str,
  to_name: &str,
  to_tag: &str,
) -> ImageStreamTag {
  ImageStreamTag {
    metadata: ObjectMeta {
      name: format!("{}:{}", to_name, to_tag),
      namespace: to_namespace.to_string(),
    },
    tag: Some(TagReference {
      from: ObjectReference {
        kind: IMAGE_STREAM_IMAGE_KIND.to_string(),
        name: format!("{}@{}", from_name, from_image),
        namespace: from_namespace.to_string(),
      },
      reference_policy: TagReferencePolicy {
        policy_type: TagReferencePolicyType::Local,
      },
    }),
    image: None,
  }
}
