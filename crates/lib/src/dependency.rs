//! Plugin references and module replacements.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A Go package path paired with a version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
  /// The import path of the package. Above major version 1 it should carry
  /// the semantic import version suffix (e.g. `/v2`). Used with `go get`.
  #[serde(rename = "module_path", default, skip_serializing_if = "String::is_empty")]
  pub package_path: String,

  /// Any version `go get` understands: a tag, branch, commit, or empty for
  /// whatever the module graph selects.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub version: String,
}

impl Dependency {
  pub fn new(package_path: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      package_path: package_path.into(),
      version: version.into(),
    }
  }
}

impl fmt::Display for Dependency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.version.is_empty() {
      f.write_str(&self.package_path)
    } else {
      write!(f, "{}@{}", self.package_path, self.version)
    }
  }
}

/// One side of a replace directive: a module path (optionally followed by a
/// space and a version, as `go.mod` writes it) or a filesystem path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplacementPath(String);

impl ReplacementPath {
  pub fn new(path: impl Into<String>) -> Self {
    Self(path.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// The form `go mod edit -replace` accepts: the first space becomes `@`.
  pub fn param(&self) -> String {
    self.0.replacen(' ', "@", 1)
  }

  /// The module path without any version suffix.
  pub fn module_path(&self) -> &str {
    let end = self.0.find([' ', '@']).unwrap_or(self.0.len());
    &self.0[..end]
  }
}

impl fmt::Display for ReplacementPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ReplacementPath {
  fn from(value: &str) -> Self {
    Self(value.to_string())
  }
}

impl From<String> for ReplacementPath {
  fn from(value: String) -> Self {
    Self(value)
  }
}

/// A Go module replacement: whenever the graph pulls in `old`, use `new`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replace {
  /// The import path of the module being replaced.
  #[serde(default)]
  pub old: ReplacementPath,

  /// The path to the replacement module.
  #[serde(default)]
  pub new: ReplacementPath,
}

impl Replace {
  pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
    Self {
      old: ReplacementPath::new(old),
      new: ReplacementPath::new(new),
    }
  }

  /// The `old=new` argument for `go mod edit -replace`.
  pub fn directive(&self) -> String {
    format!("{}={}", self.old.param(), self.new.param())
  }
}

impl fmt::Display for Replace {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} => {}", self.old, self.new)
  }
}

/// Collapse replacements by their `old` side. Keys keep the position of
/// their first occurrence; a later entry for the same key overwrites the
/// earlier target.
pub fn collapse_replacements(replacements: &[Replace]) -> Vec<Replace> {
  let mut collapsed: Vec<Replace> = Vec::with_capacity(replacements.len());
  for replace in replacements {
    match collapsed.iter_mut().find(|r| r.old == replace.old) {
      Some(existing) => existing.new = replace.new.clone(),
      None => collapsed.push(replace.clone()),
    }
  }
  collapsed
}
