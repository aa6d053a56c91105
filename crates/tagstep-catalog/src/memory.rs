use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::ImageCatalog;
use crate::error::{CatalogError, IMAGE_STREAM_KIND, IMAGE_STREAM_TAG_KIND};
use crate::types::{ImageStream, ImageStreamTag, RegistryHosts};

/// A catalog operation, as recorded by [`InMemoryCatalog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogOp {
  CreateStream,
  GetStream,
  CreateTag,
  GetTag,
  DeleteTag,
}

/// How a recorded catalog call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
  Ok,
  AlreadyExists,
  NotFound,
  Failed,
}

/// A call made against an [`InMemoryCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogCall {
  pub op: CatalogOp,
  /// `namespace/name` of the addressed object.
  pub target: String,
  pub outcome: CallOutcome,
}

type Key = (String, String);

#[derive(Debug, Default)]
struct State {
  streams: HashMap<Key, ImageStream>,
  tags: HashMap<Key, ImageStreamTag>,
  calls: Vec<CatalogCall>,
  failures: HashMap<CatalogOp, String>,
}

/// In-memory image catalog.
///
/// Suitable for single-process use or testing. Every call is recorded and can
/// be inspected with [`InMemoryCatalog::calls`]; a failure can be injected for
/// the next call of an operation with [`InMemoryCatalog::fail_next`].
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
  state: Mutex<State>,
  hosts: RegistryHosts,
}

impl InMemoryCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record repositories on these hosts in the status of created streams.
  pub fn with_registry_hosts(mut self, hosts: RegistryHosts) -> Self {
    self.hosts = hosts;
    self
  }

  /// Store a stream as-is, without recording a call.
  pub fn insert_stream(&self, stream: ImageStream) {
    let key = (stream.metadata.namespace.clone(), stream.metadata.name.clone());
    self.lock().streams.insert(key, stream);
  }

  /// Store a tag as-is, without recording a call.
  pub fn insert_tag(&self, tag: ImageStreamTag) {
    let key = (tag.metadata.namespace.clone(), tag.metadata.name.clone());
    self.lock().tags.insert(key, tag.resolved());
  }

  /// Look up a stored tag without recording a call.
  pub fn tag(&self, namespace: &str, name: &str) -> Option<ImageStreamTag> {
    self
      .lock()
      .tags
      .get(&(namespace.to_string(), name.to_string()))
      .cloned()
  }

  /// Look up a stored stream without recording a call.
  pub fn stream(&self, namespace: &str, name: &str) -> Option<ImageStream> {
    self
      .lock()
      .streams
      .get(&(namespace.to_string(), name.to_string()))
      .cloned()
  }

  /// Make the next call of `op` fail with a backend error.
  pub fn fail_next(&self, op: CatalogOp, message: impl Into<String>) {
    self.lock().failures.insert(op, message.into());
  }

  /// All calls made so far, in order.
  pub fn calls(&self) -> Vec<CatalogCall> {
    self.lock().calls.clone()
  }

  /// Forget recorded calls.
  pub fn clear_calls(&self) {
    self.lock().calls.clear();
  }

  fn lock(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Run `f` against the state unless a failure is pending for `op`, and record the call.
  fn call<T>(
    &self,
    op: CatalogOp,
    namespace: &str,
    name: &str,
    f: impl FnOnce(&mut State) -> Result<T, CatalogError>,
  ) -> Result<T, CatalogError> {
    let mut state = self.lock();

    let result = match state.failures.remove(&op) {
      Some(message) => Err(CatalogError::backend(message)),
      None => f(&mut state),
    };

    let outcome = match &result {
      Ok(_) => CallOutcome::Ok,
      Err(e) if e.is_already_exists() => CallOutcome::AlreadyExists,
      Err(e) if e.is_not_found() => CallOutcome::NotFound,
      Err(_) => CallOutcome::Failed,
    };
    state.calls.push(CatalogCall {
      op,
      target: format!("{}/{}", namespace, name),
      outcome,
    });

    result
  }
}

#[async_trait]
impl ImageCatalog for InMemoryCatalog {
  async fn create_stream(&self, stream: &ImageStream) -> Result<ImageStream, CatalogError> {
    let namespace = &stream.metadata.namespace;
    let name = &stream.metadata.name;

    self.call(CatalogOp::CreateStream, namespace, name, |state| {
      let key = (namespace.clone(), name.clone());
      if state.streams.contains_key(&key) {
        return Err(CatalogError::already_exists(
          IMAGE_STREAM_KIND,
          namespace,
          name,
        ));
      }

      let mut created = stream.clone();
      if created.status.is_empty() {
        created.status = self.hosts.status_for(namespace, name);
      }
      state.streams.insert(key, created.clone());
      Ok(created)
    })
  }

  async fn get_stream(&self, namespace: &str, name: &str) -> Result<ImageStream, CatalogError> {
    self.call(CatalogOp::GetStream, namespace, name, |state| {
      state
        .streams
        .get(&(namespace.to_string(), name.to_string()))
        .cloned()
        .ok_or_else(|| CatalogError::not_found(IMAGE_STREAM_KIND, namespace, name))
    })
  }

  async fn create_tag(&self, tag: &ImageStreamTag) -> Result<ImageStreamTag, CatalogError> {
    let namespace = &tag.metadata.namespace;
    let name = &tag.metadata.name;

    self.call(CatalogOp::CreateTag, namespace, name, |state| {
      let key = (namespace.clone(), name.clone());
      if state.tags.contains_key(&key) {
        return Err(CatalogError::already_exists(
          IMAGE_STREAM_TAG_KIND,
          namespace,
          name,
        ));
      }

      let created = tag.clone().resolved();
      state.tags.insert(key, created.clone());
      Ok(created)
    })
  }

  async fn get_tag(&self, namespace: &str, name: &str) -> Result<ImageStreamTag, CatalogError> {
    self.call(CatalogOp::GetTag, namespace, name, |state| {
      state
        .tags
        .get(&(namespace.to_string(), name.to_string()))
        .cloned()
        .ok_or_else(|| CatalogError::not_found(IMAGE_STREAM_TAG_KIND, namespace, name))
    })
  }

  async fn delete_tag(&self, namespace: &str, name: &str) -> Result<(), CatalogError> {
    self.call(CatalogOp::DeleteTag, namespace, name, |state| {
      state
        .tags
        .remove(&(namespace.to_string(), name.to_string()))
        .map(|_| ())
        .ok_or_else(|| CatalogError::not_found(IMAGE_STREAM_TAG_KIND, namespace, name))
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::builder::{new_image_stream, new_image_stream_tag};

  #[tokio::test]
  async fn test_in_memory_catalog_streams() {
    let catalog = InMemoryCatalog::new().with_registry_hosts(RegistryHosts {
      internal: Some("registry.svc:5000".to_string()),
      public: None,
    });

    let missing = catalog.get_stream("ns", "stable").await.unwrap_err();
    assert!(missing.is_not_found());

    let created = catalog
      .create_stream(&new_image_stream("ns", "stable"))
      .await
      .unwrap();
    assert_eq!(
      created.status.docker_image_repository,
      "registry.svc:5000/ns/stable"
    );

    let again = catalog
      .create_stream(&new_image_stream("ns", "stable"))
      .await
      .unwrap_err();
    assert!(again.is_already_exists());

    let fetched = catalog.get_stream("ns", "stable").await.unwrap();
    assert_eq!(fetched, created);
  }

  #[tokio::test]
  async fn test_in_memory_catalog_tags() {
    let catalog = InMemoryCatalog::new();
    let tag = new_image_stream_tag("ci", "pipeline", "sha256:abc", "ns", "stable", "latest");

    let created = catalog.create_tag(&tag).await.unwrap();
    assert_eq!(created.image_name(), Some("sha256:abc"));

    let again = catalog.create_tag(&tag).await.unwrap_err();
    assert!(again.is_already_exists());

    let fetched = catalog.get_tag("ns", "stable:latest").await.unwrap();
    assert_eq!(fetched.image_name(), Some("sha256:abc"));

    catalog.delete_tag("ns", "stable:latest").await.unwrap();
    let gone = catalog.delete_tag("ns", "stable:latest").await.unwrap_err();
    assert!(gone.is_not_found());
    assert!(catalog.tag("ns", "stable:latest").is_none());
  }

  #[tokio::test]
  async fn test_calls_are_recorded() {
    let catalog = InMemoryCatalog::new();

    let _ = catalog.get_tag("ns", "stable:latest").await;
    catalog
      .create_stream(&new_image_stream("ns", "stable"))
      .await
      .unwrap();

    assert_eq!(
      catalog.calls(),
      vec![
        CatalogCall {
          op: CatalogOp::GetTag,
          target: "ns/stable:latest".to_string(),
          outcome: CallOutcome::NotFound,
        },
        CatalogCall {
          op: CatalogOp::CreateStream,
          target: "ns/stable".to_string(),
          outcome: CallOutcome::Ok,
        },
      ]
    );

    catalog.clear_calls();
    assert!(catalog.calls().is_empty());
  }

  #[tokio::test]
  async fn test_fail_next_applies_once() {
    let catalog = InMemoryCatalog::new();
    catalog.fail_next(CatalogOp::CreateStream, "etcd unavailable");

    let stream = new_image_stream("ns", "stable");
    let err = catalog.create_stream(&stream).await.unwrap_err();
    assert!(matches!(err, CatalogError::Backend { .. }));
    assert!(catalog.stream("ns", "stable").is_none());

    catalog.create_stream(&stream).await.unwrap();
    assert_eq!(catalog.calls()[0].outcome, CallOutcome::Failed);
    assert_eq!(catalog.calls()[1].outcome, CallOutcome::Ok);
  }
}
