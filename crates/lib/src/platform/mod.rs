//! Build targets.
//!
//! Target values are kept as the strings the Go toolchain expects (`GOOS`,
//! `GOARCH`, `GOARM`), since any target `go tool dist list` knows is valid.
//! [`Os`] and [`Arch`] map the running host onto those names.

pub mod arch;
pub mod dist;
pub mod os;

pub use arch::Arch;
pub use dist::supported_platforms;
pub use os::Os;

use std::fmt;

use serde::{Deserialize, Serialize};

/// A build target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub os: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub arch: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub arm: String,
}

impl Platform {
  pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
    Self {
      os: os.into(),
      arch: arch.into(),
      arm: String::new(),
    }
  }

  /// The platform of the running host.
  pub fn host() -> Self {
    Self::new(os::goos(), arch::goarch())
  }

  /// Fill an unset OS or architecture from `host`. The ARM variant has no
  /// host default and stays as given.
  pub fn with_defaults(&self, host: &Platform) -> Self {
    let pick = |value: &str, fallback: &str| {
      if value.is_empty() {
        fallback.to_string()
      } else {
        value.to_string()
      }
    };
    Self {
      os: pick(&self.os, &host.os),
      arch: pick(&self.arch, &host.arch),
      arm: self.arm.clone(),
    }
  }

  /// Whether binaries for this target run on `host`.
  pub fn is_native_to(&self, host: &Platform) -> bool {
    self.os == host.os && self.arch == host.arch
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.os, self.arch)?;
    if !self.arm.is_empty() {
      write!(f, "/v{}", self.arm)?;
    }
    Ok(())
  }
}

/// Compilation parameters: the target plus whether cgo is enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Compile {
  #[serde(flatten)]
  pub platform: Platform,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub cgo: bool,
}

impl Compile {
  /// Value for `CGO_ENABLED`.
  pub fn cgo_enabled(&self) -> &'static str {
    if self.cgo { "1" } else { "0" }
  }
}
