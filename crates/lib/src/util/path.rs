//! Slash-separated path helpers.
//!
//! Go import paths always use `/`, whatever the host separator is, so these
//! operate on strings rather than [`std::path::Path`].

/// Lexically clean a slash-separated path: collapse repeated slashes, drop
/// `.` elements and resolve `..` against the preceding element.
///
/// An empty result becomes `"."` (or `"/"` for rooted input).
pub fn clean(path: &str) -> String {
  if path.is_empty() {
    return ".".to_string();
  }
  let rooted = path.starts_with('/');

  let mut parts: Vec<&str> = Vec::new();
  for segment in path.split('/') {
    match segment {
      "" | "." => {}
      ".." => match parts.last() {
        Some(&last) if last != ".." => {
          parts.pop();
        }
        _ if rooted => {}
        _ => parts.push(".."),
      },
      other => parts.push(other),
    }
  }

  let joined = parts.join("/");
  match (rooted, joined.is_empty()) {
    (true, _) => format!("/{joined}"),
    (false, true) => ".".to_string(),
    (false, false) => joined,
  }
}

/// Join path elements with `/`, ignoring empty elements, and clean the
/// result. Returns an empty string when every element is empty.
pub fn join<'a>(elements: impl IntoIterator<Item = &'a str>) -> String {
  let parts: Vec<&str> = elements.into_iter().filter(|e| !e.is_empty()).collect();
  if parts.is_empty() {
    return String::new();
  }
  clean(&parts.join("/"))
}

/// Convert host separators to `/`. Backslashes are converted on every
/// host so Windows-style input behaves the same everywhere.
pub fn to_slash(path: &str) -> String {
  path.replace('\\', "/")
}
