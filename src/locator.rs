//! Collaborators turning absolute resource identifiers into readable content.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use crate::error::{ResolveError, ResolveResult};

/// Resolves an absolute identifier to fetchable content.
pub trait ResourceLocator: Send + Sync {
  /// Open the content of `uri` for reading.
  fn locate(&self, uri: &str) -> io::Result<Box<dyn Read + Send>>;

  /// Read the full content of `uri` as UTF-8 text.
  fn read_to_string(&self, uri: &str) -> ResolveResult<String> {
    let mut reader = self.locate(uri).map_err(|err| ResolveError::io(uri, err))?;
    let mut content = String::new();
    reader
      .read_to_string(&mut content)
      .map_err(|err| ResolveError::io(uri, err))?;
    Ok(content)
  }
}

/// Locates resources below a root directory, treating URIs as root-relative paths.
#[derive(Debug, Clone)]
pub struct FileSystemLocator {
  root: PathBuf,
}

impl FileSystemLocator {
  /// Create a locator serving files from `root`.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Root directory resources are served from.
  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Filesystem path backing `uri`.
  pub fn path_for(&self, uri: &str) -> PathBuf {
    let relative = uri.trim_start_matches(['/', '\\']);
    self.root.join(relative)
  }
}

impl ResourceLocator for FileSystemLocator {
  fn locate(&self, uri: &str) -> io::Result<Box<dyn Read + Send>> {
    let path = self.path_for(uri);
    let file = File::open(&path)
      .map_err(|err| io::Error::new(err.kind(), format!("{}: {err}", path.display())))?;
    Ok(Box::new(BufReader::new(file)))
  }
}

/// Serves resources from an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocator {
  resources: HashMap<String, String>,
}

impl MemoryLocator {
  /// Create an empty locator.
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style variant of [`MemoryLocator::insert`].
  pub fn with(mut self, uri: impl Into<String>, content: impl Into<String>) -> Self {
    self.insert(uri, content);
    self
  }

  /// Register `content` under `uri`, replacing any previous value.
  pub fn insert(&mut self, uri: impl Into<String>, content: impl Into<String>) {
    self.resources.insert(uri.into(), content.into());
  }
}

impl ResourceLocator for MemoryLocator {
  fn locate(&self, uri: &str) -> io::Result<Box<dyn Read + Send>> {
    match self.resources.get(uri) {
      Some(content) => Ok(Box::new(Cursor::new(content.clone().into_bytes()))),
      None => Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no resource registered for {uri}"),
      )),
    }
  }
}
