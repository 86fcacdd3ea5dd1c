/// Replace every backslash separator with a forward slash.
pub fn canonical_separators(path: &str) -> String {
  path.replace('\\', "/")
}

/// Collapse `.` and `..` segments of a path.
///
/// A scheme or drive prefix (`classpath:`, `C:`) and any leading slashes are preserved, as
/// is a trailing slash. Empty interior segments are dropped. Parent segments that cannot be
/// collapsed are kept for relative paths and discarded for rooted ones.
pub fn clean_path(path: &str) -> String {
  let path = canonical_separators(path);
  let (prefix, rest) = split_prefix(&path);

  let body = rest.trim_start_matches('/');
  let leading = &rest[..rest.len() - body.len()];
  let rooted = !leading.is_empty() || !prefix.is_empty();

  let mut segments: Vec<&str> = Vec::new();
  let mut unresolved_parents = 0usize;
  for segment in body.split('/') {
    match segment {
      "" | "." => {}
      ".." => {
        if segments.pop().is_none() {
          unresolved_parents += 1;
        }
      }
      other => segments.push(other),
    }
  }

  let mut parts: Vec<&str> = Vec::with_capacity(unresolved_parents + segments.len());
  if !rooted {
    parts.extend(std::iter::repeat_n("..", unresolved_parents));
  }
  parts.extend(segments);

  let mut cleaned = format!("{prefix}{leading}{}", parts.join("/"));
  if body.ends_with('/') && !parts.is_empty() {
    cleaned.push('/');
  }
  cleaned
}

fn split_prefix(path: &str) -> (&str, &str) {
  if let Some(index) = path.find(':')
    && !path[..index].contains('/')
  {
    return path.split_at(index + 1);
  }
  ("", path)
}
