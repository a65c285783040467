use std::fmt;

/// Operating systems, named the way the Go toolchain names them (`GOOS`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
  Linux,
  Darwin,
  Windows,
  FreeBsd,
  OpenBsd,
  NetBsd,
  Dragonfly,
  Illumos,
  Solaris,
  Android,
  Ios,
}

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::Darwin),
      "windows" => Some(Self::Windows),
      "freebsd" => Some(Self::FreeBsd),
      "openbsd" => Some(Self::OpenBsd),
      "netbsd" => Some(Self::NetBsd),
      "dragonfly" => Some(Self::Dragonfly),
      "illumos" => Some(Self::Illumos),
      "solaris" => Some(Self::Solaris),
      "android" => Some(Self::Android),
      "ios" => Some(Self::Ios),
      _ => None,
    }
  }

  /// Parse a `GOOS` value
  pub fn from_goos(goos: &str) -> Option<Self> {
    match goos {
      "linux" => Some(Self::Linux),
      "darwin" => Some(Self::Darwin),
      "windows" => Some(Self::Windows),
      "freebsd" => Some(Self::FreeBsd),
      "openbsd" => Some(Self::OpenBsd),
      "netbsd" => Some(Self::NetBsd),
      "dragonfly" => Some(Self::Dragonfly),
      "illumos" => Some(Self::Illumos),
      "solaris" => Some(Self::Solaris),
      "android" => Some(Self::Android),
      "ios" => Some(Self::Ios),
      _ => None,
    }
  }

  /// Returns the `GOOS` identifier for this OS
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::Darwin => "darwin",
      Self::Windows => "windows",
      Self::FreeBsd => "freebsd",
      Self::OpenBsd => "openbsd",
      Self::NetBsd => "netbsd",
      Self::Dragonfly => "dragonfly",
      Self::Illumos => "illumos",
      Self::Solaris => "solaris",
      Self::Android => "android",
      Self::Ios => "ios",
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// The `GOOS` of the running host, falling back to Rust's name for systems
/// without a mapping
pub fn goos() -> String {
  Os::current()
    .map(|os| os.as_str().to_string())
    .unwrap_or_else(|| std::env::consts::OS.to_string())
}
