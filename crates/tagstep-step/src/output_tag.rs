//! Step that publishes a pipeline image as a tag of an output image stream.

use std::sync::Arc;

use async_trait::async_trait;
use tagstep_catalog::{
  DryRunSink, ImageCatalog, ImageStreamTag, create_image_stream, create_image_stream_tag,
  delete_image_stream_tag, new_image_stream, new_image_stream_tag,
};
use tagstep_config::{
  JobSpec, OutputImageTagStepConfiguration, PIPELINE_IMAGE_STREAM, STABLE_IMAGE_STREAM,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::{ParameterError, StepError};
use crate::link::StepLink;
use crate::parameter::{ParameterFn, ParameterMap, image_parameter_name};
use crate::step::{InputDefinition, Step, cancellable};

/// Image identity used in place of the real source image during a dry run.
const DRY_RUN_IMAGE: &str = "dry-fake";

/// Ensures a tag exists in the configured image stream that resolves to the
/// built pipeline image.
///
/// Every run deletes and recreates the target tag, since the pipeline image
/// behind it may have changed since the tag was last written.
pub struct OutputImageTagStep {
  config: OutputImageTagStepConfiguration,
  catalog: Arc<dyn ImageCatalog>,
  job_spec: Arc<JobSpec>,
  sink: DryRunSink,
}

impl OutputImageTagStep {
  pub fn new(
    config: OutputImageTagStepConfiguration,
    catalog: Arc<dyn ImageCatalog>,
    job_spec: Arc<JobSpec>,
  ) -> Self {
    Self {
      config,
      catalog,
      job_spec,
      sink: DryRunSink::stdout(),
    }
  }

  /// Render dry-run output to `sink` instead of standard output.
  pub fn with_dry_run_sink(mut self, sink: DryRunSink) -> Self {
    self.sink = sink;
    self
  }

  /// Namespace of the target stream.
  fn namespace(&self) -> &str {
    if self.config.to.namespace.is_empty() {
      &self.job_spec.namespace
    } else {
      &self.config.to.namespace
    }
  }

  fn target(&self) -> String {
    format!("{}/{}", self.namespace(), self.config.to.stream_tag_name())
  }

  fn image_stream_tag(&self, from_image: &str) -> ImageStreamTag {
    new_image_stream_tag(
      &self.job_spec.namespace,
      PIPELINE_IMAGE_STREAM,
      from_image,
      self.namespace(),
      &self.config.to.name,
      &self.config.to.tag,
    )
  }

  fn external_link(&self) -> StepLink {
    StepLink::external_image(
      self.namespace(),
      self.config.to.name.clone(),
      self.config.to.tag.clone(),
    )
  }

  /// Identity of the pipeline image being published.
  async fn resolve_source(&self, cancel: &CancellationToken) -> Result<String, StepError> {
    let reference = self.config.from.stream_tag_name();
    let source = cancellable(
      cancel,
      self.catalog.get_tag(&self.job_spec.namespace, &reference),
    )
    .await?
    .map_err(|e| StepError::Resolution {
      reference: reference.clone(),
      reason: e.to_string(),
    })?;

    source
      .image_name()
      .map(str::to_string)
      .ok_or_else(|| StepError::Resolution {
        reference,
        reason: "tag does not resolve to an image".to_string(),
      })
  }
}

#[async_trait]
impl Step for OutputImageTagStep {
  async fn inputs(&self, _dry: bool) -> Result<InputDefinition, StepError> {
    Ok(InputDefinition::new())
  }

  #[instrument(name = "output_image_tag_run", skip(self, cancel), fields(step = %self.name()))]
  async fn run(&self, dry: bool, cancel: &CancellationToken) -> Result<(), StepError> {
    let to = &self.config.to;
    let to_namespace = self.namespace();
    if self.config.from.as_str() == to.tag
      && to_namespace == self.job_spec.namespace
      && to.name == STABLE_IMAGE_STREAM
    {
      info!("Tagging {} into {}", self.config.from, to.name);
    } else {
      info!(
        "Tagging {} into {}/{}:{}",
        self.config.from, to_namespace, to.name, to.tag
      );
    }

    let from_image = if dry {
      DRY_RUN_IMAGE.to_string()
    } else {
      self.resolve_source(cancel).await?
    };

    let stream = new_image_stream(to_namespace, &to.name);
    let tag = self.image_stream_tag(&from_image);
    let catalog = self.catalog.as_ref();

    if let Err(e) = cancellable(cancel, create_image_stream(catalog, &stream, dry, &self.sink)).await?
      && !e.is_already_exists()
    {
      return Err(StepError::catalog(
        "create output imagestream",
        format!("{}/{}", to_namespace, to.name),
        e,
      ));
    }

    // The tag is force-updated: the pipeline image behind it may differ from
    // the one it pointed at after a previous run.
    if let Err(e) = cancellable(
      cancel,
      delete_image_stream_tag(catalog, &tag.metadata.namespace, &tag.metadata.name, dry),
    )
    .await?
      && !e.is_not_found()
    {
      return Err(StepError::catalog(
        "remove output imagestreamtag",
        self.target(),
        e,
      ));
    }

    // Someone converging the same tag concurrently may have created it first.
    if let Err(e) = cancellable(cancel, create_image_stream_tag(catalog, &tag, dry, &self.sink)).await?
      && !e.is_already_exists()
    {
      return Err(StepError::catalog(
        "create output imagestreamtag",
        self.target(),
        e,
      ));
    }

    Ok(())
  }

  async fn done(&self, cancel: &CancellationToken) -> Result<bool, StepError> {
    let to_namespace = self.namespace();
    info!(
      "Checking for existence of {}/{}:{}",
      to_namespace, self.config.to.name, self.config.to.tag
    );

    match cancellable(
      cancel,
      self
        .catalog
        .get_tag(to_namespace, &self.config.to.stream_tag_name()),
    )
    .await?
    {
      Ok(_) => Ok(true),
      Err(e) if e.is_not_found() => Ok(false),
      Err(e) => Err(StepError::catalog(
        "retrieve output imagestreamtag",
        self.target(),
        e,
      )),
    }
  }

  fn requires(&self) -> Vec<StepLink> {
    vec![
      StepLink::internal_image(self.config.from.as_str()),
      StepLink::release_images(),
    ]
  }

  fn creates(&self) -> Vec<StepLink> {
    let mut links = vec![self.external_link()];
    if self.config.to.has_alias() {
      links.push(StepLink::internal_image(self.config.to.as_name.clone()));
    }
    links
  }

  fn provides(&self) -> (Option<ParameterMap>, Option<StepLink>) {
    if !self.config.to.has_alias() {
      return (None, None);
    }

    let catalog = Arc::clone(&self.catalog);
    let namespace = self.namespace().to_string();
    let stream = self.config.to.name.clone();
    let tag = self.config.to.tag.clone();
    let alias = self.config.to.as_name.clone();

    let resolver = ParameterFn::new(move || {
      let catalog = Arc::clone(&catalog);
      let namespace = namespace.clone();
      let stream = stream.clone();
      let tag = tag.clone();
      let alias = alias.clone();
      async move {
        let is = catalog
          .get_stream(&namespace, &stream)
          .await
          .map_err(|source| ParameterError::Catalog {
            target: format!("output imagestream {}/{}", namespace, stream),
            source,
          })?;

        let registry = is
          .status
          .repository()
          .ok_or(ParameterError::RegistryUnavailable { stream: alias })?;
        Ok(format!("{}:{}", registry, tag))
      }
    });

    let mut parameters = ParameterMap::new();
    parameters.insert(image_parameter_name(&self.config.to.as_name), resolver);
    (Some(parameters), Some(self.external_link()))
  }

  fn name(&self) -> String {
    if self.config.to.has_alias() {
      self.config.to.as_name.clone()
    } else {
      format!("[output:{}:{}]", self.config.to.name, self.config.to.tag)
    }
  }

  fn description(&self) -> String {
    if self.config.to.has_alias() {
      format!(
        "Tag the image {} into the stable image stream",
        self.config.from
      )
    } else {
      format!(
        "Tag the image {} into the image stream tag {}:{}",
        self.config.from, self.config.to.name, self.config.to.tag
      )
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tagstep_catalog::InMemoryCatalog;
  use tagstep_config::ImageStreamTagReference;

  fn create_step(namespace: &str, as_name: &str) -> OutputImageTagStep {
    let config = OutputImageTagStepConfiguration {
      from: "builder".into(),
      to: ImageStreamTagReference {
        namespace: namespace.to_string(),
        name: "stable".to_string(),
        tag: "latest".to_string(),
        as_name: as_name.to_string(),
      },
    };
    OutputImageTagStep::new(
      config,
      Arc::new(InMemoryCatalog::new()),
      Arc::new(JobSpec::new("ns")),
    )
  }

  #[test]
  fn test_links_with_alias() {
    let step = create_step("ns", "my-app");

    assert_eq!(
      step.requires(),
      vec![StepLink::internal_image("builder"), StepLink::release_images()]
    );
    assert_eq!(
      step.creates(),
      vec![
        StepLink::external_image("ns", "stable", "latest"),
        StepLink::internal_image("my-app"),
      ]
    );
    assert_eq!(step.name(), "my-app");
    assert_eq!(
      step.description(),
      "Tag the image builder into the stable image stream"
    );

    let (parameters, link) = step.provides();
    let parameters = parameters.unwrap();
    assert_eq!(
      parameters.keys().collect::<Vec<_>>(),
      vec!["IMAGE_MY_APP"]
    );
    assert_eq!(link, Some(StepLink::external_image("ns", "stable", "latest")));
  }

  #[test]
  fn test_links_without_alias() {
    let step = create_step("ns", "");

    assert_eq!(
      step.creates(),
      vec![StepLink::external_image("ns", "stable", "latest")]
    );
    assert_eq!(step.name(), "[output:stable:latest]");
    assert_eq!(
      step.description(),
      "Tag the image builder into the image stream tag stable:latest"
    );

    let (parameters, link) = step.provides();
    assert!(parameters.is_none());
    assert!(link.is_none());
  }

  #[test]
  fn test_namespace_defaults_to_job_namespace() {
    let step = create_step("", "");
    assert_eq!(step.namespace(), "ns");
    assert_eq!(
      step.creates(),
      vec![StepLink::external_image("ns", "stable", "latest")]
    );

    let step = create_step("release", "");
    assert_eq!(step.namespace(), "release");
    assert_eq!(step.target(), "release/stable:latest");
  }

  #[test]
  fn test_image_stream_tag_points_at_pipeline_image() {
    let step = create_step("release", "");
    let tag = step.image_stream_tag("sha256:abc");

    assert_eq!(tag.metadata.namespace, "release");
    assert_eq!(tag.metadata.name, "stable:latest");
    let from = &tag.tag.as_ref().unwrap().from;
    assert_eq!(from.namespace, "ns");
    assert_eq!(from.name, "pipeline@sha256:abc");
  }

  #[tokio::test]
  async fn test_inputs_are_empty() {
    let step = create_step("ns", "");
    assert!(step.inputs(false).await.unwrap().is_empty());
  }
}
