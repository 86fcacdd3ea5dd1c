//! Project configuration loader for the import resolution stage.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// File name searched for by [`ResolverConfig::discover`].
pub const DEFAULT_CONFIG_FILE: &str = "css-imports.config.json";

/// Discoverable settings describing where resources live and how missing ones are treated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolverConfig {
  /// Directory resources are served from, relative to the configuration directory.
  pub root_dir: String,
  /// Skip imports whose resource cannot be located instead of failing the build.
  pub ignore_missing_resources: bool,
  /// Default `tracing` filter directive used when `RUST_LOG` is not set.
  pub log_filter: String,
}

impl Default for ResolverConfig {
  fn default() -> Self {
    Self {
      root_dir: ".".into(),
      ignore_missing_resources: false,
      log_filter: "warn".into(),
    }
  }
}

impl ResolverConfig {
  /// Attempt to load configuration from the provided directory.
  ///
  /// A missing or unparsable file yields the defaults.
  pub fn discover(dir: &Path) -> Self {
    Self::try_discover(dir).unwrap_or_else(|err| {
      let reason = format!("{err:#}");
      tracing::warn!(dir = %dir.display(), error = %reason, "ignoring invalid configuration");
      Self::default()
    })
  }

  /// Load configuration from the provided directory, defaulting only when no file exists.
  pub fn try_discover(dir: &Path) -> Result<Self> {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    if !candidate.exists() {
      return Ok(Self::default());
    }
    Self::from_path(&candidate)
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path)
      .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
      .with_context(|| format!("failed to parse {}", path.display()))
  }

  /// Resource root resolved against `base_dir`.
  pub fn root_dir_path(&self, base_dir: &Path) -> PathBuf {
    base_dir.join(&self.root_dir)
  }
}
