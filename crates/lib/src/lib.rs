//! xbuild-lib: build custom binaries of plugin-based Go applications
//!
//! This crate provides the pieces behind the `xbuild` command:
//! - `Builder`: the immutable description of one build and its entry point
//! - `BuildEnvironment`: the temporary Go module a build runs in
//! - `ProcessRunner`: toolchain invocations with cancellation and grace periods
//! - `Dependency` / `Replace`: plugin references and module replacements

pub mod args;
pub mod builder;
pub mod context;
pub mod dependency;
pub mod environment;
pub mod error;
pub mod golist;
pub mod host;
pub mod platform;
pub mod process;
pub mod template;
pub mod util;
pub mod version;

pub use builder::{Builder, EmbedDir};
pub use context::{BuildContext, CancelHandle, Cancellation};
pub use dependency::{Dependency, Replace, ReplacementPath};
pub use environment::{BuildEnvironment, EnvState};
pub use error::{BuildError, Phase};
pub use host::HostApp;
pub use platform::{Compile, Platform};
pub use process::ProcessRunner;
