use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::StepError;
use crate::link::StepLink;
use crate::parameter::ParameterMap;

/// Values that identify the inputs of a step, used to detect changed inputs.
pub type InputDefinition = Vec<String>;

/// A unit of idempotent work that converges remote state.
///
/// Steps hold no state of their own; everything they produce lives in the
/// remote catalog. A scheduler runs a step once every link it
/// [requires](Step::requires) has been [created](Step::creates) by another
/// step, and may use [`Step::done`] to skip steps that already converged.
#[async_trait]
pub trait Step: Send + Sync {
  /// Inputs of the step.
  async fn inputs(&self, dry: bool) -> Result<InputDefinition, StepError>;

  /// Converge the remote state. With `dry` set, mutations are rendered instead
  /// of applied.
  async fn run(&self, dry: bool, cancel: &CancellationToken) -> Result<(), StepError>;

  /// Whether the work of this step is already present.
  async fn done(&self, cancel: &CancellationToken) -> Result<bool, StepError>;

  /// Links that must exist before the step runs.
  fn requires(&self) -> Vec<StepLink>;

  /// Links that exist once the step succeeded.
  fn creates(&self) -> Vec<StepLink>;

  /// Parameters the step exposes to later consumers, and the link that must
  /// exist before they can be resolved.
  fn provides(&self) -> (Option<ParameterMap>, Option<StepLink>);

  fn name(&self) -> String;

  fn description(&self) -> String;
}

/// Await `future` unless `cancel` fires first.
pub(crate) async fn cancellable<T>(
  cancel: &CancellationToken,
  future: impl Future<Output = T>,
) -> Result<T, StepError> {
  tokio::select! {
    biased;
    _ = cancel.cancelled() => Err(StepError::Cancelled),
    output = future => Ok(output),
  }
}
