//! Pluggable extension points invoked by the import resolver.

use crate::error::ResolveResult;
use crate::models::Resource;
use crate::processor::ResolveContext;

/// Build strategy turning original content plus its resolved imports into final output.
///
/// Hooks may call back into the resolver through `ctx` to process imported resources
/// within the same run. Errors are propagated to the caller of the resolver unchanged.
pub trait TransformHook: Send + Sync {
  /// Produce the final content for the resource described by `ctx`.
  fn transform(
    &self,
    ctx: &ResolveContext<'_>,
    content: &str,
    imports: &[Resource],
  ) -> ResolveResult<String>;
}

impl<F> TransformHook for F
where
  F: Fn(&ResolveContext<'_>, &str, &[Resource]) -> ResolveResult<String> + Send + Sync,
{
  fn transform(
    &self,
    ctx: &ResolveContext<'_>,
    content: &str,
    imports: &[Resource],
  ) -> ResolveResult<String> {
    self(ctx, content, imports)
  }
}

/// Side-channel notifications emitted while resolving.
///
/// Both callbacks default to doing nothing and must not panic.
pub trait ImportListener: Send + Sync {
  /// Called once for every unique import discovered in a resource, in document order.
  fn on_import_detected(&self, _uri: &str) {}

  /// Called when `resource` is reached again within the same run.
  fn on_cycle_detected(&self, _resource: &Resource) {}
}

/// Listener ignoring every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl ImportListener for NoopListener {}

/// Hook returning the original content untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl TransformHook for PassThrough {
  fn transform(
    &self,
    _ctx: &ResolveContext<'_>,
    content: &str,
    _imports: &[Resource],
  ) -> ResolveResult<String> {
    Ok(content.to_string())
  }
}
