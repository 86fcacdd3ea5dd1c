use super::clean::{canonical_separators, clean_path};

/// Directory portion of a URI, up to and including the last separator.
///
/// Returns an empty string when the URI holds no separator.
pub fn full_path(uri: &str) -> String {
  let uri = canonical_separators(uri);
  match uri.rfind('/') {
    Some(index) => uri[..=index].to_string(),
    None => String::new(),
  }
}

/// Compute the absolute identifier of `import_url` as referenced from `containing_uri`.
pub fn normalize(containing_uri: &str, import_url: &str) -> String {
  let folder = full_path(containing_uri);
  clean_path(&format!("{folder}{}", canonical_separators(import_url)))
}
