use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use indexmap::IndexSet;

use super::CorrelationId;

/// Cycle-detection state of one active run.
#[derive(Debug, Default)]
struct CorrelationEntry {
  processed: IndexSet<String>,
  depth: usize,
}

/// Point-in-time copy of a run's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationSnapshot {
  /// URIs already resolved within the run, in the order they were recorded.
  pub processed: Vec<String>,
  /// Number of nested resolver invocations currently active for the run.
  pub depth: usize,
}

/// Concurrent map from run identifier to cycle-detection state.
///
/// Operations on the same run are linearizable. Distinct runs only share the map's shard
/// locks, which are never held across calls.
#[derive(Debug, Default)]
pub struct CorrelationStore {
  entries: DashMap<CorrelationId, CorrelationEntry>,
}

impl CorrelationStore {
  /// Create an empty store.
  pub fn new() -> Self {
    Self::default()
  }

  /// Snapshot the state of `id`.
  ///
  /// An unknown run yields an empty snapshot. No entry is created, so reading never
  /// leaves state behind.
  pub fn get(&self, id: &CorrelationId) -> CorrelationSnapshot {
    self
      .entries
      .get(id)
      .map(|entry| CorrelationSnapshot {
        processed: entry.processed.iter().cloned().collect(),
        depth: entry.depth,
      })
      .unwrap_or_default()
  }

  /// Increase the nesting depth of `id`, creating its entry on first use.
  ///
  /// The returned guard calls [`CorrelationStore::exit`] when dropped.
  #[must_use = "dropping the guard immediately exits the run"]
  pub fn enter(&self, id: &CorrelationId) -> RunGuard<'_> {
    let mut entry = self.entries.entry(id.clone()).or_default();
    entry.depth += 1;
    tracing::trace!(run = %id, depth = entry.depth, "entered import resolution");
    drop(entry);

    RunGuard {
      store: self,
      id: id.clone(),
    }
  }

  /// Decrease the nesting depth of `id`, evicting its entry once the depth reaches zero.
  pub fn exit(&self, id: &CorrelationId) {
    match self.entries.entry(id.clone()) {
      Entry::Occupied(mut occupied) => {
        let entry = occupied.get_mut();
        entry.depth = entry.depth.saturating_sub(1);
        tracing::trace!(run = %id, depth = entry.depth, "exited import resolution");
        if entry.depth == 0 {
          occupied.remove();
        }
      }
      Entry::Vacant(_) => {
        tracing::trace!(run = %id, "exit requested for inactive run");
      }
    }
  }

  /// Record `uri` as resolved within run `id`.
  ///
  /// Callers confirm with [`CorrelationStore::is_processed`] first. Returns `false` when the
  /// URI was already present or the run is not active.
  pub fn record_processed(&self, id: &CorrelationId, uri: &str) -> bool {
    self
      .entries
      .get_mut(id)
      .is_some_and(|mut entry| entry.processed.insert(uri.to_string()))
  }

  /// Returns `true` when `uri` was already resolved within run `id`.
  pub fn is_processed(&self, id: &CorrelationId, uri: &str) -> bool {
    self
      .entries
      .get(id)
      .is_some_and(|entry| entry.processed.contains(uri))
  }

  /// Current nesting depth of `id`, zero when the run is not active.
  pub fn depth(&self, id: &CorrelationId) -> usize {
    self.entries.get(id).map_or(0, |entry| entry.depth)
  }

  /// Number of runs with live state.
  pub fn active_runs(&self) -> usize {
    self.entries.len()
  }

  /// Returns `true` when no run holds state.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Scoped participation in a run; exits the run when dropped.
///
/// Dropping happens on every exit path, including early returns, propagated errors and
/// unwinding panics.
#[derive(Debug)]
pub struct RunGuard<'a> {
  store: &'a CorrelationStore,
  id: CorrelationId,
}

impl RunGuard<'_> {
  /// Identifier of the run this guard belongs to.
  pub fn id(&self) -> &CorrelationId {
    &self.id
  }
}

impl Drop for RunGuard<'_> {
  fn drop(&mut self) {
    self.store.exit(&self.id);
  }
}
