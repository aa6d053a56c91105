//! Dry-run aware catalog mutations.
//!
//! In dry-run mode the intended object is written to a [`DryRunSink`] as
//! two-space indented JSON followed by a newline, and the catalog is never
//! called. Rendering the same object twice produces identical bytes.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::debug;

use crate::ImageCatalog;
use crate::error::CatalogError;
use crate::types::{ImageStream, ImageStreamTag};

/// Destination for objects rendered in dry-run mode.
#[derive(Clone)]
pub struct DryRunSink {
  out: Arc<Mutex<dyn Write + Send>>,
}

impl DryRunSink {
  /// Render to the given writer.
  pub fn new(writer: impl Write + Send + 'static) -> Self {
    Self {
      out: Arc::new(Mutex::new(writer)),
    }
  }

  /// Render to standard output.
  pub fn stdout() -> Self {
    Self::new(io::stdout())
  }

  /// Write `object` as indented JSON followed by a newline.
  pub fn render<T: Serialize>(&self, object: &T) -> Result<(), CatalogError> {
    let json = serde_json::to_string_pretty(object)?;
    let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
    writeln!(out, "{}", json)?;
    out.flush()?;
    Ok(())
  }
}

impl Default for DryRunSink {
  fn default() -> Self {
    Self::stdout()
  }
}

impl fmt::Debug for DryRunSink {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DryRunSink").finish_non_exhaustive()
  }
}

/// In-memory writer whose contents stay readable after being handed to a sink.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
  bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Everything written so far, lossily decoded as UTF-8.
  pub fn contents(&self) -> String {
    let bytes = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
    String::from_utf8_lossy(&bytes).into_owned()
  }
}

impl Write for SharedBuffer {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    let mut bytes = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
    bytes.extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

/// Create `stream`, or render it when `dry` is set.
pub async fn create_image_stream<C: ImageCatalog + ?Sized>(
  catalog: &C,
  stream: &ImageStream,
  dry: bool,
  sink: &DryRunSink,
) -> Result<(), CatalogError> {
  if dry {
    return sink.render(stream);
  }

  catalog.create_stream(stream).await?;
  Ok(())
}

/// Create `tag`, or render it when `dry` is set.
pub async fn create_image_stream_tag<C: ImageCatalog + ?Sized>(
  catalog: &C,
  tag: &ImageStreamTag,
  dry: bool,
  sink: &DryRunSink,
) -> Result<(), CatalogError> {
  if dry {
    return sink.render(tag);
  }

  catalog.create_tag(tag).await?;
  Ok(())
}

/// Delete the tag `name` in `namespace`. Does nothing when `dry` is set.
pub async fn delete_image_stream_tag<C: ImageCatalog + ?Sized>(
  catalog: &C,
  namespace: &str,
  name: &str,
  dry: bool,
) -> Result<(), CatalogError> {
  if dry {
    debug!(namespace = %namespace, name = %name, "dry run: skipping imagestreamtag deletion");
    return Ok(());
  }

  catalog.delete_tag(namespace, name).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::builder::{new_image_stream, new_image_stream_tag};
  use crate::memory::{CatalogOp, InMemoryCatalog};

  #[tokio::test]
  async fn test_dry_run_renders_without_calling_catalog() {
    let catalog = InMemoryCatalog::new();
    let buffer = SharedBuffer::new();
    let sink = DryRunSink::new(buffer.clone());

    let stream = new_image_stream("ns", "stable");
    let tag = new_image_stream_tag("ci", "pipeline", "dry-fake", "ns", "stable", "latest");

    create_image_stream(&catalog, &stream, true, &sink).await.unwrap();
    delete_image_stream_tag(&catalog, "ns", "stable:latest", true)
      .await
      .unwrap();
    create_image_stream_tag(&catalog, &tag, true, &sink).await.unwrap();

    assert!(catalog.calls().is_empty());
    assert_eq!(
      buffer.contents(),
      concat!(
        "{\n",
        "  \"metadata\": {\n",
        "    \"name\": \"stable\",\n",
        "    \"namespace\": \"ns\"\n",
        "  }\n",
        "}\n",
        "{\n",
        "  \"metadata\": {\n",
        "    \"name\": \"stable:latest\",\n",
        "    \"namespace\": \"ns\"\n",
        "  },\n",
        "  \"tag\": {\n",
        "    \"from\": {\n",
        "      \"kind\": \"ImageStreamImage\",\n",
        "      \"name\": \"pipeline@dry-fake\",\n",
        "      \"namespace\": \"ci\"\n",
        "    },\n",
        "    \"referencePolicy\": {\n",
        "      \"type\": \"Local\"\n",
        "    }\n",
        "  }\n",
        "}\n",
      )
    );
  }

  #[tokio::test]
  async fn test_apply_calls_catalog() {
    let catalog = InMemoryCatalog::new();
    let sink = DryRunSink::new(SharedBuffer::new());

    let stream = new_image_stream("ns", "stable");
    create_image_stream(&catalog, &stream, false, &sink).await.unwrap();

    let err = create_image_stream(&catalog, &stream, false, &sink)
      .await
      .unwrap_err();
    assert!(err.is_already_exists());

    let err = delete_image_stream_tag(&catalog, "ns", "stable:latest", false)
      .await
      .unwrap_err();
    assert!(err.is_not_found());

    let ops: Vec<CatalogOp> = catalog.calls().iter().map(|c| c.op).collect();
    assert_eq!(
      ops,
      vec![
        CatalogOp::CreateStream,
        CatalogOp::CreateStream,
        CatalogOp::DeleteTag
      ]
    );
  }
}
