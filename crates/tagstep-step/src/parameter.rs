use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::ParameterError;

/// Parameters provided by a step, keyed by name.
pub type ParameterMap = BTreeMap<String, ParameterFn>;

type Resolver = dyn Fn() -> BoxFuture<'static, Result<String, ParameterError>> + Send + Sync;

/// A lazily evaluated parameter value.
///
/// Nothing is computed until [`ParameterFn::resolve`] is called, and every
/// call evaluates the resolver again.
#[derive(Clone)]
pub struct ParameterFn {
  resolver: Arc<Resolver>,
}

impl ParameterFn {
  pub fn new<F, Fut>(resolver: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, ParameterError>> + Send + 'static,
  {
    Self {
      resolver: Arc::new(move || resolver().boxed()),
    }
  }

  /// Evaluate the parameter.
  pub async fn resolve(&self) -> Result<String, ParameterError> {
    (self.resolver)().await
  }

  /// Evaluate the parameter, giving up once `cancel` fires.
  pub async fn resolve_with_cancel(
    &self,
    cancel: &CancellationToken,
  ) -> Result<String, ParameterError> {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => Err(ParameterError::Cancelled),
      resolved = self.resolve() => resolved,
    }
  }
}

impl fmt::Debug for ParameterFn {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ParameterFn").finish_non_exhaustive()
  }
}

/// Name of the parameter exposing the pull spec of an image aliased `alias`,
/// e.g. `my-app` becomes `IMAGE_MY_APP`.
pub fn image_parameter_name(alias: &str) -> String {
  format!("IMAGE_{}", alias.replace('-', "_").to_uppercase())
}
