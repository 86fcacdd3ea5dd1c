//! Import graph collection used to inspect how a stylesheet tree resolves.
//!
//! [`ImportGraphCollector`] acts as both hook and listener: it leaves content untouched,
//! walks every import through the resolver and records what it saw.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Context;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::ResolveResult;
use crate::hook::{ImportListener, TransformHook};
use crate::models::Resource;
use crate::paths::canonical_separators;
use crate::processor::ResolveContext;

/// Serialisable summary of a resolved import graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportGraph {
  /// Resources visited, in depth-first order.
  pub resources: Vec<String>,
  /// Resolved imports of every visited resource.
  pub imports: BTreeMap<String, Vec<String>>,
  /// Imports skipped because their resource could not be located.
  pub missing: BTreeSet<String>,
  /// Resources reached a second time within a run.
  pub cycles: Vec<String>,
}

/// Hook and listener building an [`ImportGraph`].
///
/// A collector records a single run. Runs sharing one collector are merged into the same
/// graph, which keeps growing until [`ImportGraphCollector::take`] is called.
#[derive(Debug, Default)]
pub struct ImportGraphCollector {
  ignore_missing_resources: bool,
  graph: Mutex<ImportGraph>,
}

impl ImportGraphCollector {
  /// Create a collector; with `ignore_missing_resources` unresolvable imports are recorded
  /// instead of failing the run.
  pub fn new(ignore_missing_resources: bool) -> Self {
    Self {
      ignore_missing_resources,
      graph: Mutex::new(ImportGraph::default()),
    }
  }

  /// Copy of the graph collected so far.
  pub fn graph(&self) -> ImportGraph {
    self.graph.lock().clone()
  }

  /// Discard everything collected so far, returning it.
  pub fn take(&self) -> ImportGraph {
    std::mem::take(&mut *self.graph.lock())
  }
}

impl TransformHook for ImportGraphCollector {
  fn transform(
    &self,
    ctx: &ResolveContext<'_>,
    content: &str,
    imports: &[Resource],
  ) -> ResolveResult<String> {
    let uri = canonical_separators(ctx.resource().uri());
    {
      let mut graph = self.graph.lock();
      graph.resources.push(uri.clone());
      graph.imports.insert(
        uri.clone(),
        imports.iter().map(|import| import.uri().to_string()).collect(),
      );
    }

    for import in imports {
      match ctx.resolve(import) {
        Ok(_) => {}
        Err(err) if self.ignore_missing_resources && err.is_not_found() => {
          tracing::warn!(resource = %uri, import = %import.uri(), "skipping missing import");
          self.graph.lock().missing.insert(import.uri().to_string());
        }
        Err(err) => {
          return Err(
            anyhow::Error::new(err)
              .context(format!("failed to resolve import {} of {uri}", import.uri()))
              .into(),
          );
        }
      }
    }

    Ok(content.to_string())
  }
}

impl ImportListener for ImportGraphCollector {
  fn on_cycle_detected(&self, resource: &Resource) {
    self
      .graph
      .lock()
      .cycles
      .push(canonical_separators(resource.uri()));
  }
}

/// Render `graph` as prettified JSON.
pub fn render_json(graph: &ImportGraph) -> anyhow::Result<String> {
  serde_json::to_string_pretty(graph).context("failed to serialise import graph")
}
