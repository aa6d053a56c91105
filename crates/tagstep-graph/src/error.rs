use tagstep_step::StepLink;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
  #[error("duplicate step name: {0}")]
  DuplicateStep(String),

  #[error("step {step} requires {link}, which no step creates")]
  UnsatisfiedRequirement { step: String, link: StepLink },

  #[error("cycle detected in step graph")]
  CycleDetected,
}
