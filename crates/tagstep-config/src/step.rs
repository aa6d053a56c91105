use serde::{Deserialize, Serialize};

use crate::reference::{ImageStreamTagReference, PipelineImageStreamTagReference};

/// Configuration for a step that tags a pipeline image into an output image stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputImageTagStepConfiguration {
  /// The pipeline image to publish.
  pub from: PipelineImageStreamTagReference,

  /// Where the image is published.
  pub to: ImageStreamTagReference,
}
