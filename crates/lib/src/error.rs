//! Error types for custom builds.
//!
//! Every stage of a build reports a [`BuildError`]. Errors raised inside the
//! build environment or the compile step are wrapped in [`BuildError::Phase`]
//! so the caller can tell which toolchain step failed.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::context::Cancellation;

/// The stage of a build an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  /// Writing the generated sources and embedded files.
  Prepare,
  /// `go mod init`.
  InitModule,
  /// `go mod edit -replace`.
  Replace,
  /// `go get` for the core and each plugin.
  PinVersions,
  /// `go mod tidy`.
  Tidy,
  /// `go build`.
  Compile,
}

impl Phase {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Prepare => "preparing build environment",
      Self::InitModule => "initializing Go module",
      Self::Replace => "applying module replacements",
      Self::PinVersions => "pinning versions",
      Self::Tidy => "tidying module",
      Self::Compile => "compiling",
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Errors that can occur while preparing or running a build.
#[derive(Debug, Error)]
pub enum BuildError {
  /// Malformed user input, such as an empty module name or output path.
  #[error("{0}")]
  Validation(String),

  /// A version that looks semantic but does not parse, or that disagrees
  /// with a major-version suffix already present in the module path.
  #[error("{version}: {reason}")]
  InvalidVersion { version: String, reason: String },

  /// The toolchain executable could not be launched.
  #[error("failed to start {program}: {error}")]
  ProcessStart { program: String, error: io::Error },

  /// The toolchain ran but exited unsuccessfully.
  #[error("{command}: {status}")]
  ProcessExecution { command: String, status: ExitStatus },

  /// The build context was cancelled or its deadline passed.
  #[error("{0}")]
  Cancelled(Cancellation),

  /// Removing the temporary folder failed.
  #[error("cleaning up folder {}: {error}", path.display())]
  Cleanup { path: PathBuf, error: io::Error },

  /// A failure followed by a cleanup failure; `primary` is the cause.
  #[error("{primary}; additionally, {cleanup}")]
  WithCleanup {
    primary: Box<BuildError>,
    cleanup: Box<BuildError>,
  },

  /// An error tagged with the build phase that produced it. The message
  /// already carries the cause, so no error source is reported.
  #[error("{phase}: {cause}")]
  Phase { phase: Phase, cause: Box<BuildError> },

  /// An `--embed` source directory is missing.
  #[error("embed directory does not exist: {}", .0.display())]
  EmbedMissing(PathBuf),

  /// Copying an embedded directory failed.
  #[error("failed to copy {} to {}: {error}", from.display(), to.display())]
  Copy { from: PathBuf, to: PathBuf, error: io::Error },

  /// Toolchain JSON output could not be decoded.
  #[error("json parse error: {0}")]
  Json(serde_json::Error),

  #[error("io error: {0}")]
  Io(io::Error),
}

// Variants render their cause inline; linking it as a source as well would
// print it twice in a reported error chain.
impl From<serde_json::Error> for BuildError {
  fn from(err: serde_json::Error) -> Self {
    Self::Json(err)
  }
}

impl From<io::Error> for BuildError {
  fn from(err: io::Error) -> Self {
    Self::Io(err)
  }
}

impl BuildError {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  /// Tag this error with the phase it happened in.
  ///
  /// Cancellations are tagged too; [`BuildError::cancellation`] looks
  /// through the wrapper.
  pub fn in_phase(self, phase: Phase) -> Self {
    match self {
      Self::Phase { .. } => self,
      other => Self::Phase {
        phase,
        cause: Box::new(other),
      },
    }
  }

  /// Attach a cleanup failure, keeping `self` as the primary error.
  pub fn with_cleanup(self, cleanup: Option<BuildError>) -> Self {
    match cleanup {
      Some(cleanup) => Self::WithCleanup {
        primary: Box::new(self),
        cleanup: Box::new(cleanup),
      },
      None => self,
    }
  }

  /// Returns the cancellation cause if this error (or its primary cause)
  /// is a cancellation.
  pub fn cancellation(&self) -> Option<Cancellation> {
    match self {
      Self::Cancelled(cause) => Some(*cause),
      Self::Phase { cause, .. } => cause.cancellation(),
      Self::WithCleanup { primary, .. } => primary.cancellation(),
      _ => None,
    }
  }

  pub fn is_cancellation(&self) -> bool {
    self.cancellation().is_some()
  }

  /// The phase this error was tagged with, if any.
  pub fn phase(&self) -> Option<Phase> {
    match self {
      Self::Phase { phase, .. } => Some(*phase),
      Self::WithCleanup { primary, .. } => primary.phase(),
      _ => None,
    }
  }
}
