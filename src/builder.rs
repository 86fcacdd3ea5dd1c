//! Wiring of the collaborators an [`ImportResolver`] depends on.

use std::sync::Arc;

use crate::config::ResolverConfig;
use crate::correlation::{CorrelationIdProvider, CorrelationStore, ThreadCorrelation};
use crate::hook::{ImportListener, NoopListener, PassThrough, TransformHook};
use crate::locator::{FileSystemLocator, ResourceLocator};
use crate::processor::ImportResolver;
use crate::scanner::{CssImportScanner, ImportScanner};

/// Builder for [`ImportResolver`].
///
/// Defaults to the CSS scanner, a pass-through hook, a no-op listener and thread-scoped
/// correlation. No locator is configured by default; processing without one fails with a
/// configuration error.
pub struct ImportResolverBuilder {
  locator: Option<Arc<dyn ResourceLocator>>,
  scanner: Arc<dyn ImportScanner>,
  hook: Arc<dyn TransformHook>,
  listener: Arc<dyn ImportListener>,
  correlation: Arc<dyn CorrelationIdProvider>,
}

impl Default for ImportResolverBuilder {
  fn default() -> Self {
    Self {
      locator: None,
      scanner: Arc::new(CssImportScanner),
      hook: Arc::new(PassThrough),
      listener: Arc::new(NoopListener),
      correlation: Arc::new(ThreadCorrelation),
    }
  }
}

impl ImportResolverBuilder {
  /// Create a builder with default collaborators.
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder preconfigured from project settings, serving resources from the configured
  /// root directory.
  pub fn from_config(config: &ResolverConfig, base_dir: &std::path::Path) -> Self {
    Self::new().locator(FileSystemLocator::new(config.root_dir_path(base_dir)))
  }

  /// Locate imported resources with `locator`.
  pub fn locator(self, locator: impl ResourceLocator + 'static) -> Self {
    self.shared_locator(Arc::new(locator))
  }

  /// Locate imported resources with a shared locator.
  pub fn shared_locator(mut self, locator: Arc<dyn ResourceLocator>) -> Self {
    self.locator = Some(locator);
    self
  }

  /// Extract raw import URLs with `scanner`.
  pub fn scanner(mut self, scanner: impl ImportScanner + 'static) -> Self {
    self.scanner = Arc::new(scanner);
    self
  }

  /// Transform resolved resources with `hook`.
  pub fn hook(self, hook: impl TransformHook + 'static) -> Self {
    self.shared_hook(Arc::new(hook))
  }

  /// Transform resolved resources with a shared hook.
  pub fn shared_hook(mut self, hook: Arc<dyn TransformHook>) -> Self {
    self.hook = hook;
    self
  }

  /// Deliver notifications to `listener`.
  pub fn listener(self, listener: impl ImportListener + 'static) -> Self {
    self.shared_listener(Arc::new(listener))
  }

  /// Deliver notifications to a shared listener.
  pub fn shared_listener(mut self, listener: Arc<dyn ImportListener>) -> Self {
    self.listener = listener;
    self
  }

  /// Scope cycle detection with run identifiers from `provider`.
  pub fn correlation(mut self, provider: impl CorrelationIdProvider + 'static) -> Self {
    self.correlation = Arc::new(provider);
    self
  }

  /// Finish configuration.
  pub fn build(self) -> ImportResolver {
    ImportResolver {
      locator: self.locator,
      scanner: self.scanner,
      hook: self.hook,
      listener: self.listener,
      correlation: self.correlation,
      store: CorrelationStore::new(),
    }
  }
}
