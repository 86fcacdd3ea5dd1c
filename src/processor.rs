//! Recursive, cycle-safe `@import` resolution for stylesheet resources.
//!
//! Each call walks through the same states: a read-only cycle check, then (unless the
//! resource was already reached in this run) import discovery and delegation to the
//! configured [`TransformHook`], with run state released on every exit path.

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::builder::ImportResolverBuilder;
use crate::correlation::{CorrelationId, CorrelationIdProvider, CorrelationStore};
use crate::error::{ResolveError, ResolveResult};
use crate::hook::{ImportListener, TransformHook};
use crate::locator::ResourceLocator;
use crate::models::{Resource, ResourceType};
use crate::paths::{canonical_separators, normalize};
use crate::scanner::ImportScanner;

/// A step of the build pipeline applied to resource content.
pub trait ResourceProcessor {
  /// Transform `content` belonging to `resource`.
  fn process(&self, resource: &Resource, content: &str) -> ResolveResult<String>;

  /// Resource type this processor applies to, `None` when it applies to all.
  fn supported_type(&self) -> Option<ResourceType> {
    None
  }

  /// Returns `true` when the pipeline must also run this processor on resources reached
  /// through an import directive.
  fn is_import_aware(&self) -> bool {
    false
  }
}

/// Resolves the `@import` references of stylesheet resources.
///
/// One resolver is meant to be shared by every concurrent build. Cycle detection is scoped
/// to the run reported by the configured [`CorrelationIdProvider`], or to the identifier
/// passed to [`ImportResolver::process_in_run`].
pub struct ImportResolver {
  pub(crate) locator: Option<Arc<dyn ResourceLocator>>,
  pub(crate) scanner: Arc<dyn ImportScanner>,
  pub(crate) hook: Arc<dyn TransformHook>,
  pub(crate) listener: Arc<dyn ImportListener>,
  pub(crate) correlation: Arc<dyn CorrelationIdProvider>,
  pub(crate) store: CorrelationStore,
}

impl ImportResolver {
  /// Start configuring a resolver.
  pub fn builder() -> ImportResolverBuilder {
    ImportResolverBuilder::new()
  }

  /// Cycle-detection state shared by all runs.
  pub fn store(&self) -> &CorrelationStore {
    &self.store
  }

  /// The configured resource locator.
  pub fn locator(&self) -> ResolveResult<&dyn ResourceLocator> {
    self
      .locator
      .as_deref()
      .ok_or_else(|| ResolveError::configuration("no resource locator configured"))
  }

  /// Resolve the imports of `resource` within the current run and transform its content.
  pub fn process(&self, resource: &Resource, content: &str) -> ResolveResult<String> {
    let run = self.correlation.current();
    self.process_in_run(&run, resource, content)
  }

  /// Resolve the imports of `resource` within run `run` and transform its content.
  ///
  /// A resource already reached earlier in the same run resolves to empty content.
  pub fn process_in_run(
    &self,
    run: &CorrelationId,
    resource: &Resource,
    content: &str,
  ) -> ResolveResult<String> {
    self.locator()?;

    let uri = canonical_separators(resource.uri());
    if self.store.is_processed(run, &uri) {
      tracing::debug!(run = %run, resource = %resource, "recursive import detected");
      self.listener.on_cycle_detected(resource);
      return Ok(String::new());
    }

    let _guard = self.store.enter(run);
    // Another thread of the same run may have recorded the URI since the check above.
    if !self.store.record_processed(run, &uri) {
      tracing::debug!(run = %run, resource = %resource, "recursive import detected");
      self.listener.on_cycle_detected(resource);
      return Ok(String::new());
    }

    let imports = self.find_imported_resources(&uri, content);
    let ctx = ResolveContext {
      resolver: self,
      run,
      resource,
    };
    self.hook.transform(&ctx, content, &imports)
  }

  /// Read `resource` from `reader`, process it and write the result to `writer`.
  ///
  /// Both handles are consumed and released before returning, whatever the outcome.
  pub fn process_stream<R, W>(
    &self,
    resource: &Resource,
    mut reader: R,
    mut writer: W,
  ) -> ResolveResult<()>
  where
    R: Read,
    W: Write,
  {
    self.locator()?;

    let mut content = String::new();
    reader
      .read_to_string(&mut content)
      .map_err(|err| ResolveError::io(resource.uri(), err))?;
    drop(reader);

    let result = self.process(resource, &content)?;
    writer
      .write_all(result.as_bytes())
      .and_then(|()| writer.flush())
      .map_err(|err| ResolveError::io(resource.uri(), err))
  }

  fn find_imported_resources(&self, resource_uri: &str, content: &str) -> Vec<Resource> {
    let mut imports: Vec<Resource> = Vec::new();
    for import_url in self.scanner.find_imports(content) {
      let imported = Resource::css(normalize(resource_uri, &import_url));
      if imports.contains(&imported) {
        tracing::debug!(resource = %resource_uri, import = %imported, "duplicate imported resource");
        continue;
      }

      tracing::trace!(resource = %resource_uri, raw = %import_url, import = %imported, "resolved import");
      self.listener.on_import_detected(imported.uri());
      imports.push(imported);
    }
    imports
  }
}

impl ResourceProcessor for ImportResolver {
  fn process(&self, resource: &Resource, content: &str) -> ResolveResult<String> {
    ImportResolver::process(self, resource, content)
  }

  fn supported_type(&self) -> Option<ResourceType> {
    Some(ResourceType::Css)
  }

  fn is_import_aware(&self) -> bool {
    true
  }
}

impl fmt::Debug for ImportResolver {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ImportResolver")
      .field("has_locator", &self.locator.is_some())
      .field("store", &self.store)
      .finish_non_exhaustive()
  }
}

/// View of an in-progress resolution handed to a [`TransformHook`].
///
/// Nested calls made through the context belong to the same run as the resource being
/// transformed, regardless of which thread performs them.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
  resolver: &'a ImportResolver,
  run: &'a CorrelationId,
  resource: &'a Resource,
}

impl<'a> ResolveContext<'a> {
  /// Resolver driving the current run.
  pub fn resolver(&self) -> &'a ImportResolver {
    self.resolver
  }

  /// Identifier of the current run.
  pub fn run(&self) -> &'a CorrelationId {
    self.run
  }

  /// Resource being transformed.
  pub fn resource(&self) -> &'a Resource {
    self.resource
  }

  /// Process already loaded content of an imported resource within the current run.
  pub fn process(&self, resource: &Resource, content: &str) -> ResolveResult<String> {
    self.resolver.process_in_run(self.run, resource, content)
  }

  /// Fetch an imported resource through the locator and process it within the current run.
  pub fn resolve(&self, resource: &Resource) -> ResolveResult<String> {
    let content = self.resolver.locator()?.read_to_string(resource.uri())?;
    self.process(resource, &content)
  }
}

#[cfg(test)]
mod tests {
  use std::io::{self, Cursor};
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::{Barrier, OnceLock};
  use std::thread;

  use anyhow::anyhow;
  use parking_lot::Mutex;
  use regex::Regex;

  use super::*;
  use crate::correlation::{FixedCorrelation, ThreadCorrelation};
  use crate::locator::MemoryLocator;

  #[derive(Default)]
  struct Recorder {
    imports: Mutex<Vec<String>>,
    cycles: AtomicUsize,
  }

  impl ImportListener for Recorder {
    fn on_import_detected(&self, uri: &str) {
      self.imports.lock().push(uri.to_string());
    }

    fn on_cycle_detected(&self, _resource: &Resource) {
      self.cycles.fetch_add(1, Ordering::SeqCst);
    }
  }

  impl Recorder {
    fn imports(&self) -> Vec<String> {
      self.imports.lock().clone()
    }

    fn cycles(&self) -> usize {
      self.cycles.load(Ordering::SeqCst)
    }
  }

  fn transform_fn<F>(f: F) -> F
  where
    F: Fn(&ResolveContext<'_>, &str, &[Resource]) -> ResolveResult<String> + Send + Sync,
  {
    f
  }

  fn strip_imports(content: &str) -> String {
    static IMPORTS: OnceLock<Regex> = OnceLock::new();
    IMPORTS
      .get_or_init(|| Regex::new(r"@import[^;]*;\s*").unwrap())
      .replace_all(content, "")
      .into_owned()
  }

  /// Test stand-in for an inlining strategy: children first, then the stripped body.
  fn inline_children(
    ctx: &ResolveContext<'_>,
    content: &str,
    imports: &[Resource],
  ) -> ResolveResult<String> {
    let mut out = Vec::new();
    for import in imports {
      let child = ctx.resolve(import)?;
      if !child.is_empty() {
        out.push(child);
      }
    }
    out.push(strip_imports(content));
    Ok(out.join("\n"))
  }

  fn resolver_with(
    locator: MemoryLocator,
    hook: impl TransformHook + 'static,
    recorder: &Arc<Recorder>,
  ) -> ImportResolver {
    ImportResolver::builder()
      .locator(locator)
      .hook(hook)
      .shared_listener(recorder.clone())
      .build()
  }

  #[test]
  fn strips_imports_end_to_end() {
    let recorder = Arc::new(Recorder::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_hook = seen.clone();
    let resolver = resolver_with(
      MemoryLocator::new(),
      transform_fn(move |_ctx, content, imports| {
        seen_in_hook.lock().extend(imports.iter().cloned());
        Ok(strip_imports(content))
      }),
      &recorder,
    );

    let run = CorrelationId::from("build-1");
    let resource = Resource::css("styles/main.css");
    let output = resolver
      .process_in_run(&run, &resource, r#"@import "widgets/a.css"; body{color:red}"#)
      .unwrap();

    assert_eq!(output, "body{color:red}");
    assert_eq!(*seen.lock(), vec![Resource::css("styles/widgets/a.css")]);
    assert_eq!(recorder.imports(), vec!["styles/widgets/a.css".to_string()]);
    assert_eq!(resolver.store().depth(&run), 0);
    assert!(resolver.store().is_empty());
  }

  #[test]
  fn terminates_on_import_cycles() {
    let recorder = Arc::new(Recorder::default());
    let locator = MemoryLocator::new()
      .with("css/a.css", r#"@import "b.css"; a{}"#)
      .with("css/b.css", r#"@import "a.css"; b{}"#);
    let resolver = resolver_with(locator, transform_fn(inline_children), &recorder);

    let output = resolver
      .process(&Resource::css("css/a.css"), r#"@import "b.css"; a{}"#)
      .unwrap();

    assert_eq!(output, "b{}\na{}");
    assert_eq!(recorder.cycles(), 1);
    assert_eq!(recorder.imports(), vec!["css/b.css".to_string(), "css/a.css".to_string()]);
    assert!(resolver.store().is_empty());
  }

  #[test]
  fn self_import_resolves_to_empty_content() {
    let recorder = Arc::new(Recorder::default());
    let locator = MemoryLocator::new().with("a.css", r#"@import "a.css"; a{}"#);
    let resolver = resolver_with(locator, transform_fn(inline_children), &recorder);

    let output = resolver
      .process(&Resource::css("a.css"), r#"@import "a.css"; a{}"#)
      .unwrap();

    assert_eq!(output, "a{}");
    assert_eq!(recorder.cycles(), 1);
  }

  #[test]
  fn resources_are_resolved_once_per_run() {
    let recorder = Arc::new(Recorder::default());
    let locator = MemoryLocator::new()
      .with("b.css", r#"@import "d.css"; b{}"#)
      .with("c.css", r#"@import "d.css"; c{}"#)
      .with("d.css", "d{}");
    let resolver = resolver_with(locator, transform_fn(inline_children), &recorder);

    let output = resolver
      .process(&Resource::css("a.css"), r#"@import "b.css"; @import "c.css"; a{}"#)
      .unwrap();

    assert_eq!(output, "d{}\nb{}\nc{}\na{}");
    assert_eq!(recorder.cycles(), 1);
  }

  #[test]
  fn duplicate_imports_are_reported_once() {
    let recorder = Arc::new(Recorder::default());
    let count = Arc::new(AtomicUsize::new(0));
    let count_in_hook = count.clone();
    let resolver = resolver_with(
      MemoryLocator::new(),
      transform_fn(move |_ctx, content, imports| {
        count_in_hook.store(imports.len(), Ordering::SeqCst);
        Ok(content.to_string())
      }),
      &recorder,
    );

    resolver
      .process(&Resource::css("main.css"), r#"@import "a.css"; @import "a.css";"#)
      .unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.imports(), vec!["a.css".to_string()]);
  }

  #[test]
  fn preserves_document_order_of_imports() {
    let recorder = Arc::new(Recorder::default());
    let resolver = resolver_with(MemoryLocator::new(), crate::hook::PassThrough, &recorder);

    resolver
      .process(
        &Resource::css("site/main.css"),
        r#"@import "z.css"; @import "../a.css"; @import url(m/x.css); @import "z.css";"#,
      )
      .unwrap();

    assert_eq!(recorder.imports(), vec![
      "site/z.css".to_string(),
      "a.css".to_string(),
      "site/m/x.css".to_string(),
    ]);
  }

  #[test]
  fn missing_locator_is_a_configuration_error() {
    let recorder = Arc::new(Recorder::default());
    let called = Arc::new(AtomicUsize::new(0));
    let called_in_hook = called.clone();
    let resolver = ImportResolver::builder()
      .hook(transform_fn(move |_ctx, content, _imports| {
        called_in_hook.fetch_add(1, Ordering::SeqCst);
        Ok(content.to_string())
      }))
      .shared_listener(recorder.clone())
      .build();

    let err = resolver
      .process(&Resource::css("a.css"), r#"@import "b.css";"#)
      .unwrap_err();

    assert!(matches!(err, ResolveError::Configuration(_)));
    assert!(resolver.store().is_empty());
    assert!(recorder.imports().is_empty());
    assert_eq!(called.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn hook_errors_propagate_after_cleanup() {
    let recorder = Arc::new(Recorder::default());
    let resolver = resolver_with(
      MemoryLocator::new(),
      transform_fn(|_ctx, _content, _imports| Err(anyhow!("minifier rejected input").into())),
      &recorder,
    );

    let run = CorrelationId::from("failing");
    let err = resolver
      .process_in_run(&run, &Resource::css("a.css"), "a{}")
      .unwrap_err();

    assert_eq!(err.to_string(), "minifier rejected input");
    assert_eq!(resolver.store().depth(&run), 0);
    assert!(resolver.store().is_empty());
  }

  #[test]
  fn missing_nested_imports_propagate_after_cleanup() {
    let recorder = Arc::new(Recorder::default());
    let locator = MemoryLocator::new().with("b.css", r#"@import "gone.css"; b{}"#);
    let resolver = resolver_with(locator, transform_fn(inline_children), &recorder);

    let err = resolver
      .process(&Resource::css("a.css"), r#"@import "b.css";"#)
      .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("gone.css"));
    assert!(resolver.store().is_empty());
  }

  #[test]
  fn panicking_hooks_still_release_run_state() {
    let recorder = Arc::new(Recorder::default());
    let resolver = resolver_with(
      MemoryLocator::new(),
      transform_fn(|_ctx, _content, _imports| panic!("hook bug")),
      &recorder,
    );

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
      resolver.process(&Resource::css("a.css"), "a{}")
    }));

    assert!(result.is_err());
    assert!(resolver.store().is_empty());
  }

  #[test]
  fn sequential_runs_on_one_thread_do_not_see_each_other() {
    let recorder = Arc::new(Recorder::default());
    let resolver = ImportResolver::builder()
      .locator(MemoryLocator::new())
      .correlation(ThreadCorrelation)
      .shared_listener(recorder.clone())
      .build();

    let resource = Resource::css("a.css");
    assert_eq!(resolver.process(&resource, "a{}").unwrap(), "a{}");
    assert_eq!(resolver.process(&resource, "a{}").unwrap(), "a{}");
    assert_eq!(recorder.cycles(), 0);
  }

  #[test]
  fn reuses_fixed_run_only_while_active() {
    let recorder = Arc::new(Recorder::default());
    let resolver = ImportResolver::builder()
      .locator(MemoryLocator::new())
      .correlation(FixedCorrelation(CorrelationId::from("pinned")))
      .shared_listener(recorder.clone())
      .build();

    let resource = Resource::css("a.css");
    resolver.process(&resource, "a{}").unwrap();
    resolver.process(&resource, "a{}").unwrap();
    assert_eq!(recorder.cycles(), 0);
  }

  #[test]
  fn concurrent_runs_on_the_same_uri_are_isolated() {
    const RUNS: usize = 4;
    let recorder = Arc::new(Recorder::default());
    let barrier = Arc::new(Barrier::new(RUNS));
    let hook_barrier = barrier.clone();
    let locator = MemoryLocator::new().with("child.css", "child{}");
    let resolver = resolver_with(
      locator,
      transform_fn(move |ctx, content, imports| {
        if ctx.resource().uri() == "shared.css" {
          hook_barrier.wait();
        }
        inline_children(ctx, content, imports)
      }),
      &recorder,
    );

    thread::scope(|scope| {
      for _ in 0..RUNS {
        scope.spawn(|| {
          let _run = ThreadCorrelation::begin();
          let output = resolver
            .process(&Resource::css("shared.css"), r#"@import "child.css"; shared{}"#)
            .unwrap();
          assert_eq!(output, "child{}\nshared{}");
        });
      }
    });

    assert_eq!(recorder.cycles(), 0);
    assert!(resolver.store().is_empty());
  }

  #[test]
  fn explicit_runs_share_state_across_threads() {
    let recorder = Arc::new(Recorder::default());
    let resolver = resolver_with(MemoryLocator::new(), crate::hook::PassThrough, &recorder);
    let run = CorrelationId::from("cooperative");
    let resource = Resource::css("a.css");

    let _outer = resolver.store().enter(&run);
    resolver.store().record_processed(&run, "a.css");

    thread::scope(|scope| {
      scope.spawn(|| {
        let output = resolver.process_in_run(&run, &resource, "a{}").unwrap();
        assert!(output.is_empty());
      });
    });

    assert_eq!(recorder.cycles(), 1);
    assert_eq!(resolver.store().depth(&run), 1);
  }

  #[test]
  fn canonicalises_backslash_uris() {
    let recorder = Arc::new(Recorder::default());
    let resolver = resolver_with(MemoryLocator::new(), crate::hook::PassThrough, &recorder);
    let run = CorrelationId::from("windows");

    let _outer = resolver.store().enter(&run);
    resolver
      .process_in_run(&run, &Resource::css("styles\\main.css"), r#"@import "widgets\a.css";"#)
      .unwrap();

    assert!(resolver.store().is_processed(&run, "styles/main.css"));
    assert_eq!(recorder.imports(), vec!["styles/widgets/a.css".to_string()]);

    let again = resolver
      .process_in_run(&run, &Resource::css("styles/main.css"), "")
      .unwrap();
    assert!(again.is_empty());
    assert_eq!(recorder.cycles(), 1);
  }

  #[test]
  fn processes_streams() {
    let recorder = Arc::new(Recorder::default());
    let resolver = resolver_with(
      MemoryLocator::new(),
      transform_fn(|_ctx, content, _imports| Ok(strip_imports(content))),
      &recorder,
    );

    let mut output = Vec::new();
    resolver
      .process_stream(
        &Resource::css("main.css"),
        Cursor::new(r#"@import "a.css"; main{}"#),
        &mut output,
      )
      .unwrap();

    assert_eq!(String::from_utf8(output).unwrap(), "main{}");
    assert!(resolver.store().is_empty());
  }

  struct BrokenWriter;

  impl Write for BrokenWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
      Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
      Ok(())
    }
  }

  #[test]
  fn stream_write_failures_surface_as_io_errors() {
    let recorder = Arc::new(Recorder::default());
    let resolver = resolver_with(MemoryLocator::new(), crate::hook::PassThrough, &recorder);

    let err = resolver
      .process_stream(&Resource::css("main.css"), Cursor::new("main{}"), BrokenWriter)
      .unwrap_err();

    assert!(matches!(err, ResolveError::Io { ref uri, .. } if uri == "main.css"));
    assert!(resolver.store().is_empty());
  }

  struct BrokenReader;

  impl io::Read for BrokenReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
      Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
    }
  }

  #[test]
  fn stream_read_failures_surface_as_io_errors() {
    let recorder = Arc::new(Recorder::default());
    let called = Arc::new(AtomicUsize::new(0));
    let called_in_hook = called.clone();
    let resolver = resolver_with(
      MemoryLocator::new(),
      transform_fn(move |_ctx, content, _imports| {
        called_in_hook.fetch_add(1, Ordering::SeqCst);
        Ok(content.to_string())
      }),
      &recorder,
    );

    let mut output = Vec::new();
    let err = resolver
      .process_stream(&Resource::css("styles/main.css"), BrokenReader, &mut output)
      .unwrap_err();

    assert!(matches!(
      err,
      ResolveError::Io { ref uri, ref source }
        if uri == "styles/main.css" && source.kind() == io::ErrorKind::ConnectionReset
    ));
    assert_eq!(called.load(Ordering::SeqCst), 0);
    assert!(output.is_empty());
    assert!(resolver.store().is_empty());
  }

  #[test]
  fn threads_sharing_a_run_transform_each_uri_once() {
    for iteration in 0..200 {
      let recorder = Arc::new(Recorder::default());
      let transforms = Arc::new(AtomicUsize::new(0));
      let transforms_in_hook = transforms.clone();
      let resolver = resolver_with(
        MemoryLocator::new(),
        transform_fn(move |_ctx, content, _imports| {
          transforms_in_hook.fetch_add(1, Ordering::SeqCst);
          Ok(content.to_string())
        }),
        &recorder,
      );
      let run = CorrelationId::from(format!("shared-{iteration}"));
      let resource = Resource::css("a.css");
      let start = Barrier::new(2);

      let outer = resolver.store().enter(&run);
      thread::scope(|scope| {
        for _ in 0..2 {
          scope.spawn(|| {
            start.wait();
            resolver.process_in_run(&run, &resource, "a{}").unwrap();
          });
        }
      });

      assert_eq!(transforms.load(Ordering::SeqCst), 1);
      assert_eq!(recorder.cycles(), 1);
      assert_eq!(resolver.store().depth(&run), 1);
      drop(outer);
      assert!(resolver.store().is_empty());
    }
  }

  #[test]
  fn advertises_import_awareness() {
    let resolver = ImportResolver::builder().build();
    let processor: &dyn ResourceProcessor = &resolver;
    assert!(processor.is_import_aware());
    assert_eq!(processor.supported_type(), Some(ResourceType::Css));
  }
}
