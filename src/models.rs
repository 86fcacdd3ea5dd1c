//! Data structures shared by the import resolution stage.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Content type tag attached to a [`Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
  /// Stylesheet content.
  Css,
  /// Script content.
  Js,
}

impl fmt::Display for ResourceType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Css => f.write_str("css"),
      Self::Js => f.write_str("js"),
    }
  }
}

/// A build resource identified by its absolute URI and content type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Resource {
  uri: String,
  #[serde(rename = "type")]
  kind: ResourceType,
}

impl Resource {
  /// Create a resource of the given type.
  pub fn new(uri: impl Into<String>, kind: ResourceType) -> Self {
    Self {
      uri: uri.into(),
      kind,
    }
  }

  /// Create a stylesheet resource.
  pub fn css(uri: impl Into<String>) -> Self {
    Self::new(uri, ResourceType::Css)
  }

  /// Absolute URI identifying the resource.
  pub fn uri(&self) -> &str {
    &self.uri
  }

  /// Content type of the resource.
  pub fn kind(&self) -> ResourceType {
    self.kind
  }
}

impl fmt::Display for Resource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.uri, self.kind)
  }
}
