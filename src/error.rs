//! Error types surfaced by the import resolver.

use thiserror::Error;

/// Convenience alias used across the resolver API.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors that can occur while resolving imports for a resource.
///
/// A detected import cycle is not an error: the offending occurrence resolves to empty
/// content and the run continues.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// A required collaborator was not configured.
  #[error("configuration error: {0}")]
  Configuration(String),

  /// Reading, writing or locating resource content failed.
  #[error("I/O error for {uri}: {source}")]
  Io {
    /// URI of the resource being read or written.
    uri: String,
    /// Underlying I/O failure.
    #[source]
    source: std::io::Error,
  },

  /// The transformation hook failed.
  #[error(transparent)]
  Transform(#[from] anyhow::Error),
}

impl ResolveError {
  /// Create a configuration error.
  pub fn configuration(message: impl Into<String>) -> Self {
    Self::Configuration(message.into())
  }

  /// Wrap an I/O failure for the given resource URI.
  pub fn io(uri: impl Into<String>, source: std::io::Error) -> Self {
    Self::Io {
      uri: uri.into(),
      source,
    }
  }

  /// Returns `true` when the error reports a resource that could not be found.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
  }
}
