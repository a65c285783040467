use std::fmt;

/// CPU architectures, named the way the Go toolchain names them (`GOARCH`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  Amd64,
  Arm64,
  I386,
  Arm,
  Riscv64,
  Ppc64le,
  S390x,
  Loong64,
}

impl Arch {
  /// Detect the current CPU architecture at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86_64" => Some(Self::Amd64),
      "aarch64" => Some(Self::Arm64),
      "x86" => Some(Self::I386),
      "arm" => Some(Self::Arm),
      "riscv64" => Some(Self::Riscv64),
      "powerpc64" if cfg!(target_endian = "little") => Some(Self::Ppc64le),
      "s390x" => Some(Self::S390x),
      "loongarch64" => Some(Self::Loong64),
      _ => None,
    }
  }

  /// Returns the `GOARCH` identifier for this architecture
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Amd64 => "amd64",
      Self::Arm64 => "arm64",
      Self::I386 => "386",
      Self::Arm => "arm",
      Self::Riscv64 => "riscv64",
      Self::Ppc64le => "ppc64le",
      Self::S390x => "s390x",
      Self::Loong64 => "loong64",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// The `GOARCH` of the running host
pub fn goarch() -> String {
  Arch::current()
    .map(|arch| arch.as_str().to_string())
    .unwrap_or_else(|| std::env::consts::ARCH.to_string())
}
