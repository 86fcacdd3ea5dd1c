//! Extraction of raw `@import` references from stylesheet content.

use std::sync::OnceLock;

use regex::Regex;

/// Collaborator extracting raw import URLs from resource content.
///
/// Implementations must return URLs exactly as written in the source, in document order.
pub trait ImportScanner: Send + Sync {
  /// Find every import URL referenced by `content`.
  fn find_imports(&self, content: &str) -> Vec<String>;
}

impl<F> ImportScanner for F
where
  F: Fn(&str) -> Vec<String> + Send + Sync,
{
  fn find_imports(&self, content: &str) -> Vec<String> {
    self(content)
  }
}

/// Default scanner recognising the CSS `@import` forms.
///
/// Handles quoted strings and `url(...)` with or without quotes. Imports that appear inside
/// block comments are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssImportScanner;

impl ImportScanner for CssImportScanner {
  fn find_imports(&self, content: &str) -> Vec<String> {
    let (comments, imports) = patterns();
    let stripped = comments.replace_all(content, "");

    imports
      .captures_iter(&stripped)
      .filter_map(|caps| {
        caps
          .iter()
          .skip(1)
          .flatten()
          .next()
          .map(|m| m.as_str().trim().to_string())
      })
      .filter(|url| !url.is_empty())
      .collect()
  }
}

fn patterns() -> &'static (Regex, Regex) {
  static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
  PATTERNS.get_or_init(|| {
    (
      Regex::new(r"(?s)/\*.*?\*/").expect("invalid comment regex"),
      Regex::new(
        r#"(?i)@import\s*(?:url\(\s*(?:"([^"]*)"|'([^']*)'|([^)\s]*))\s*\)|"([^"]*)"|'([^']*)')"#,
      )
      .expect("invalid import regex"),
    )
  })
}
