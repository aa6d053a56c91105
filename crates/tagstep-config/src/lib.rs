//! Tagstep Config
//!
//! This crate contains the serializable configuration types for tagstep.
//! These types describe a job before its steps are built and scheduled.
//!
//! Configuration is loaded from JSON job files (via CLI with `tagstep run job.json`):
//!
//! ```json
//! {
//!   "namespace": "ci-op-1234",
//!   "output_image_tags": [
//!     { "from": "bin", "to": { "name": "stable", "tag": "bin", "as": "my-app" } }
//!   ]
//! }
//! ```

mod job;
mod reference;
mod step;

pub use job::{CatalogDef, JobDef, JobSpec};
pub use reference::{
  ImageStreamTagReference, PIPELINE_IMAGE_STREAM, PipelineImageStreamTagReference,
  STABLE_IMAGE_STREAM,
};
pub use step::OutputImageTagStepConfiguration;
