use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::ImageCatalog;
use crate::error::{CatalogError, IMAGE_STREAM_KIND, IMAGE_STREAM_TAG_KIND};
use crate::types::{ImageStream, ImageStreamTag, RegistryHosts, split_tag_name};

/// Filesystem-based image catalog.
///
/// Objects are stored as JSON in a directory structure:
/// ```text
/// {root}/
/// └── my-namespace/
///     └── stable/
///         ├── stream.json
///         └── tags/
///             └── latest.json
/// ```
pub struct FsCatalog {
  root: PathBuf,
  hosts: RegistryHosts,
}

impl FsCatalog {
  /// Create a new filesystem catalog at the given root path.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      hosts: RegistryHosts::default(),
    }
  }

  /// Record repositories on these hosts in the status of created streams.
  pub fn with_registry_hosts(mut self, hosts: RegistryHosts) -> Self {
    self.hosts = hosts;
    self
  }

  /// Get the root directory of the catalog.
  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Directory of the stream `name` in `namespace`.
  fn stream_dir(&self, namespace: &str, name: &str) -> Result<PathBuf, CatalogError> {
    Ok(
      self
        .root
        .join(path_segment(namespace)?)
        .join(path_segment(name)?),
    )
  }

  /// File of the tag `stream:tag` in `namespace`.
  fn tag_path(&self, namespace: &str, name: &str) -> Result<PathBuf, CatalogError> {
    let (stream, tag) = split_tag_name(name).ok_or_else(|| {
      CatalogError::backend(format!(
        "invalid imagestreamtag name \"{}\": expected <stream>:<tag>",
        name
      ))
    })?;

    Ok(
      self
        .stream_dir(namespace, stream)?
        .join("tags")
        .join(format!("{}.json", path_segment(tag)?)),
    )
  }
}

#[async_trait]
impl ImageCatalog for FsCatalog {
  async fn create_stream(&self, stream: &ImageStream) -> Result<ImageStream, CatalogError> {
    let namespace = &stream.metadata.namespace;
    let name = &stream.metadata.name;
    let path = self.stream_dir(namespace, name)?.join("stream.json");

    let mut created = stream.clone();
    if created.status.is_empty() {
      created.status = self.hosts.status_for(namespace, name);
    }

    write_new(&path, &created)
      .await
      .map_err(|e| exists_as(e, IMAGE_STREAM_KIND, namespace, name))?;

    debug!(path = %path.display(), "created imagestream");
    Ok(created)
  }

  async fn get_stream(&self, namespace: &str, name: &str) -> Result<ImageStream, CatalogError> {
    let path = self.stream_dir(namespace, name)?.join("stream.json");
    read(&path)
      .await
      .map_err(|e| missing_as(e, IMAGE_STREAM_KIND, namespace, name))
  }

  async fn create_tag(&self, tag: &ImageStreamTag) -> Result<ImageStreamTag, CatalogError> {
    let namespace = &tag.metadata.namespace;
    let name = &tag.metadata.name;
    let path = self.tag_path(namespace, name)?;

    let created = tag.clone().resolved();
    write_new(&path, &created)
      .await
      .map_err(|e| exists_as(e, IMAGE_STREAM_TAG_KIND, namespace, name))?;

    debug!(path = %path.display(), "created imagestreamtag");
    Ok(created)
  }

  async fn get_tag(&self, namespace: &str, name: &str) -> Result<ImageStreamTag, CatalogError> {
    let path = self.tag_path(namespace, name)?;
    read(&path)
      .await
      .map_err(|e| missing_as(e, IMAGE_STREAM_TAG_KIND, namespace, name))
  }

  async fn delete_tag(&self, namespace: &str, name: &str) -> Result<(), CatalogError> {
    let path = self.tag_path(namespace, name)?;
    fs::remove_file(&path)
      .await
      .map_err(|e| missing_as(e.into(), IMAGE_STREAM_TAG_KIND, namespace, name))?;

    debug!(path = %path.display(), "deleted imagestreamtag");
    Ok(())
  }
}

/// Reject names that would escape their directory.
fn path_segment(name: &str) -> Result<&str, CatalogError> {
  if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
    return Err(CatalogError::backend(format!(
      "invalid object name \"{}\"",
      name
    )));
  }
  Ok(name)
}

/// Write `object` to a file that must not exist yet.
///
/// The content is staged next to `path` and hard linked into place, so
/// readers see either no file or the complete object.
async fn write_new<T: Serialize>(path: &Path, object: &T) -> Result<(), CatalogError> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).await?;
  }

  let content = serde_json::to_vec_pretty(object)?;
  let staging = staging_path(path);
  let mut file = fs::OpenOptions::new()
    .write(true)
    .create_new(true)
    .open(&staging)
    .await?;
  let written = async {
    file.write_all(&content).await?;
    file.sync_all().await
  }
  .await;
  drop(file);

  let linked = match written {
    Ok(()) => fs::hard_link(&staging, path).await,
    Err(e) => Err(e),
  };
  fs::remove_file(&staging).await?;
  Ok(linked?)
}

/// Unique sibling of `path` used while its content is written.
fn staging_path(path: &Path) -> PathBuf {
  static NEXT: AtomicU64 = AtomicU64::new(0);
  let file_name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  path.with_file_name(format!(
    ".{}.{}.{}.tmp",
    file_name,
    std::process::id(),
    NEXT.fetch_add(1, Ordering::Relaxed)
  ))
}

async fn read<T: DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
  let content = fs::read_to_string(path).await?;
  Ok(serde_json::from_str(&content)?)
}

fn exists_as(err: CatalogError, kind: &'static str, namespace: &str, name: &str) -> CatalogError {
  match err {
    CatalogError::Io(e) if e.kind() == ErrorKind::AlreadyExists => {
      CatalogError::already_exists(kind, namespace, name)
    }
    other => other,
  }
}

fn missing_as(err: CatalogError, kind: &'static str, namespace: &str, name: &str) -> CatalogError {
  match err {
    CatalogError::Io(e) if e.kind() == ErrorKind::NotFound => {
      CatalogError::not_found(kind, namespace, name)
    }
    other => other,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_tag_path() {
    let catalog = FsCatalog::new("/var/lib/tagstep");
    assert_eq!(
      catalog.tag_path("ns", "stable:latest").unwrap(),
      PathBuf::from("/var/lib/tagstep/ns/stable/tags/latest.json")
    );
  }

  #[test]
  fn test_tag_path_rejects_bad_names() {
    let catalog = FsCatalog::new("/var/lib/tagstep");
    assert!(catalog.tag_path("ns", "stable").is_err());
    assert!(catalog.tag_path("..", "stable:latest").is_err());
    assert!(catalog.tag_path("ns", "a/b:latest").is_err());
  }
}
