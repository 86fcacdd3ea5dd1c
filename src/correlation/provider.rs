use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier shared by every call belonging to one logical run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
  /// Generate a fresh identifier that will not collide with concurrent runs.
  pub fn generate() -> Self {
    Self(Uuid::new_v4().to_string())
  }

  /// Borrow the identifier as a string slice.
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for CorrelationId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for CorrelationId {
  fn from(value: String) -> Self {
    Self(value)
  }
}

impl From<&str> for CorrelationId {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

/// Supplies the identifier of the run the caller currently belongs to.
///
/// The value must stay stable for the duration of a run, across every reentrant call.
pub trait CorrelationIdProvider: Send + Sync {
  /// Identifier of the current run.
  fn current(&self) -> CorrelationId;
}

/// Always reports the same run.
#[derive(Debug, Clone)]
pub struct FixedCorrelation(pub CorrelationId);

impl CorrelationIdProvider for FixedCorrelation {
  fn current(&self) -> CorrelationId {
    self.0.clone()
  }
}

thread_local! {
  static CURRENT: RefCell<Option<CorrelationId>> = const { RefCell::new(None) };
}

/// Thread-scoped run identifiers, the natural fit for one worker thread per request.
///
/// Callers mark the beginning of a run with [`ThreadCorrelation::scope`]. Without an active
/// scope the thread is lazily assigned a generated identifier which it keeps afterwards;
/// this is safe for sequential runs because run state is evicted when each run finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadCorrelation;

impl ThreadCorrelation {
  /// Bind `id` to the current thread until the returned scope is dropped.
  ///
  /// Scopes nest: dropping one restores the identifier that was active before it.
  #[must_use = "the identifier is unbound as soon as the scope is dropped"]
  pub fn scope(id: CorrelationId) -> CorrelationScope {
    let previous = CURRENT.with(|current| current.borrow_mut().replace(id));
    CorrelationScope {
      previous,
      _not_send: PhantomData,
    }
  }

  /// Bind a freshly generated identifier to the current thread.
  #[must_use = "the identifier is unbound as soon as the scope is dropped"]
  pub fn begin() -> CorrelationScope {
    Self::scope(CorrelationId::generate())
  }
}

impl CorrelationIdProvider for ThreadCorrelation {
  fn current(&self) -> CorrelationId {
    CURRENT.with(|current| {
      current
        .borrow_mut()
        .get_or_insert_with(CorrelationId::generate)
        .clone()
    })
  }
}

/// Restores the previous thread identifier when dropped.
#[derive(Debug)]
pub struct CorrelationScope {
  previous: Option<CorrelationId>,
  _not_send: PhantomData<*const ()>,
}

impl Drop for CorrelationScope {
  fn drop(&mut self) {
    let previous = self.previous.take();
    CURRENT.with(|current| *current.borrow_mut() = previous);
  }
}
