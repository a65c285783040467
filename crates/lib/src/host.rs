//! Host applications that can be rebuilt with plugins.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::Os;

/// The application a custom binary is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostApp {
  /// The Caddy web server.
  #[default]
  Caddy,
  /// The k6 load-testing tool.
  K6,
}

#[derive(Debug, Error)]
#[error("unknown host application: {0} (expected caddy or k6)")]
pub struct ParseHostError(String);

impl HostApp {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Caddy => "caddy",
      Self::K6 => "k6",
    }
  }

  /// Import path of the core module when no override is given.
  pub fn default_module_path(&self) -> &'static str {
    match self {
      Self::Caddy => "github.com/caddyserver/caddy",
      Self::K6 => "go.k6.io/k6",
    }
  }

  /// The core module path to build against, before semantic import
  /// versioning is applied.
  ///
  /// Caddy's default path gets `/v2` unless the version is a `v`-prefixed
  /// dotted version, in which case the version decides the suffix.
  pub fn core_module_path(&self, override_path: Option<&str>, version: &str) -> String {
    if let Some(path) = override_path.filter(|p| !p.is_empty()) {
      return path.to_string();
    }
    let path = self.default_module_path();
    match self {
      Self::Caddy if !version.starts_with('v') || !version.contains('.') => format!("{path}/v2"),
      _ => path.to_string(),
    }
  }

  /// Name given to the generated Go module.
  pub fn module_name(&self) -> &'static str {
    self.as_str()
  }

  /// Environment variable that conventionally carries the core version.
  pub fn version_env(&self) -> &'static str {
    match self {
      Self::Caddy => "CADDY_VERSION",
      Self::K6 => "K6_VERSION",
    }
  }

  /// Default output file for a build targeting `goos`.
  pub fn default_output(&self, goos: &str) -> String {
    match Os::from_goos(goos) {
      Some(Os::Windows) => format!(".\\{}.exe", self.as_str()),
      _ => format!("./{}", self.as_str()),
    }
  }

  /// Whether `--embed` directories can be compiled into this host.
  pub fn supports_embed(&self) -> bool {
    matches!(self, Self::Caddy)
  }

  /// Build tags passed to `go build` when no custom build flags are set.
  pub fn build_tags(&self) -> Option<&'static str> {
    match self {
      Self::Caddy => Some("nobadger,nomysql,nopgx"),
      Self::K6 => None,
    }
  }
}

impl fmt::Display for HostApp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for HostApp {
  type Err = ParseHostError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "caddy" => Ok(Self::Caddy),
      "k6" => Ok(Self::K6),
      _ => Err(ParseHostError(s.to_string())),
    }
  }
}
