//! Tagstep Catalog
//!
//! This crate provides the image catalog trait, the catalog objects steps
//! converge, and catalog implementations.
//!
//! The [`ImageCatalog`] trait defines operations for:
//! - Creating and reading image streams
//! - Creating, reading and deleting image stream tags
//!
//! Mutations can be simulated with the dry-run helpers in this crate
//! ([`create_image_stream`], [`create_image_stream_tag`],
//! [`delete_image_stream_tag`]), which render the intended object to a
//! [`DryRunSink`] instead of calling the catalog.

mod builder;
mod error;
mod fs;
mod memory;
mod render;
mod types;

pub use builder::{new_image_stream, new_image_stream_tag};
pub use error::{CatalogError, IMAGE_STREAM_KIND, IMAGE_STREAM_TAG_KIND};
pub use fs::FsCatalog;
pub use memory::{CallOutcome, CatalogCall, CatalogOp, InMemoryCatalog};
pub use render::{
  DryRunSink, SharedBuffer, create_image_stream, create_image_stream_tag, delete_image_stream_tag,
};
pub use types::{
  IMAGE_STREAM_IMAGE_KIND, Image, ImageStream, ImageStreamStatus, ImageStreamTag, ObjectMeta,
  ObjectReference, RegistryHosts, TagReference, TagReferencePolicy, TagReferencePolicyType,
};

use async_trait::async_trait;

/// Operations on a remote catalog of image streams and their tags.
///
/// Tags are addressed by namespace and a `"stream:tag"` name.
#[async_trait]
pub trait ImageCatalog: Send + Sync {
  /// Create an image stream. Fails with [`CatalogError::AlreadyExists`] if present.
  async fn create_stream(&self, stream: &ImageStream) -> Result<ImageStream, CatalogError>;

  /// Get an image stream. Fails with [`CatalogError::NotFound`] if absent.
  async fn get_stream(&self, namespace: &str, name: &str) -> Result<ImageStream, CatalogError>;

  /// Create an image stream tag. Fails with [`CatalogError::AlreadyExists`] if present.
  async fn create_tag(&self, tag: &ImageStreamTag) -> Result<ImageStreamTag, CatalogError>;

  /// Get an image stream tag. Fails with [`CatalogError::NotFound`] if absent.
  async fn get_tag(&self, namespace: &str, name: &str) -> Result<ImageStreamTag, CatalogError>;

  /// Delete an image stream tag. Fails with [`CatalogError::NotFound`] if absent.
  async fn delete_tag(&self, namespace: &str, name: &str) -> Result<(), CatalogError>;
}
