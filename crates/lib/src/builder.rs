//! The description of a custom build and its entry point.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::BuildContext;
use crate::dependency::{Dependency, Replace};
use crate::environment::BuildEnvironment;
use crate::error::{BuildError, Phase};
use crate::host::HostApp;
use crate::platform::{Compile, Platform};
use crate::process::ProcessRunner;

/// A directory compiled into the binary, under `files/<name>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedDir {
  #[serde(default)]
  pub dir: PathBuf,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub name: String,
}

impl EmbedDir {
  /// Parse `[alias:]dir`.
  pub fn parse(arg: &str) -> Self {
    match arg.split_once(':') {
      Some((name, dir)) => Self {
        dir: PathBuf::from(dir),
        name: name.to_string(),
      },
      None => Self {
        dir: PathBuf::from(arg),
        name: String::new(),
      },
    }
  }
}

/// Everything needed to produce one custom binary. Built once per
/// invocation and not modified by [`Builder::build`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Builder {
  #[serde(flatten)]
  pub compile: Compile,
  pub host: HostApp,
  /// Overrides the host's core module path, e.g. for a fork.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub core_module: Option<String>,
  #[serde(alias = "caddy_version", alias = "k6_version", skip_serializing_if = "String::is_empty")]
  pub core_version: String,
  #[serde(alias = "extensions", skip_serializing_if = "Vec::is_empty")]
  pub plugins: Vec<Dependency>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub replacements: Vec<Replace>,
  /// Budget for fetching dependencies.
  #[serde(with = "duration_opt", skip_serializing_if = "Option::is_none")]
  pub timeout_get: Option<Duration>,
  /// Budget for the whole build.
  #[serde(with = "duration_opt", skip_serializing_if = "Option::is_none")]
  pub timeout_build: Option<Duration>,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub race_detector: bool,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub skip_cleanup: bool,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub skip_build: bool,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub debug: bool,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub build_flags: String,
  #[serde(skip_serializing_if = "String::is_empty")]
  pub mod_flags: String,
  #[serde(rename = "embed_dir", skip_serializing_if = "Vec::is_empty")]
  pub embed_dirs: Vec<EmbedDir>,
  /// The `go` executable; `go` from `PATH` when unset.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub go: Option<String>,
  /// Where temporary folders are created; the platform default when unset.
  #[serde(skip)]
  pub temp_parent: Option<PathBuf>,
}

impl Builder {
  pub fn new(host: HostApp) -> Self {
    Self {
      host,
      ..Default::default()
    }
  }

  pub fn go_executable(&self) -> &str {
    self.go.as_deref().filter(|g| !g.is_empty()).unwrap_or("go")
  }

  /// The compile parameters with host defaults applied and cgo forced on
  /// when the race detector needs it.
  pub fn resolved_compile(&self) -> Compile {
    let mut compile = self.compile.clone();
    compile.platform = compile.platform.with_defaults(&Platform::host());
    if self.race_detector && !compile.cgo {
      warn!("enabling cgo because it is required by the race detector");
      compile.cgo = true;
    }
    compile
  }

  /// Build the configured binary at `output` and return its absolute path.
  pub async fn build(&self, ctx: &BuildContext, output: impl AsRef<Path>) -> Result<PathBuf, BuildError> {
    self.build_with_runner(ctx, output, ProcessRunner::new()).await
  }

  /// Like [`Builder::build`], with a custom process runner.
  pub async fn build_with_runner(
    &self,
    ctx: &BuildContext,
    output: impl AsRef<Path>,
    runner: ProcessRunner,
  ) -> Result<PathBuf, BuildError> {
    let ctx = match self.timeout_build {
      Some(timeout) => ctx.with_timeout(timeout),
      None => ctx.clone(),
    };

    let output = output.as_ref();
    if output.as_os_str().is_empty() {
      return Err(BuildError::validation("output file path is required"));
    }
    // The toolchain runs in the temporary folder, so relative paths would
    // land in the wrong place.
    let output = std::path::absolute(output)?;
    info!(path = %output.display(), "absolute output file path");

    let compile = self.resolved_compile();

    let mut env = BuildEnvironment::open(&ctx, self, runner).await?;
    let result = self.compile_in(&ctx, &env, &compile, &output).await;
    let cleanup = env.close().err();

    match (result, cleanup) {
      (Ok(()), None) => Ok(output),
      (Ok(()), Some(cleanup)) => Err(cleanup),
      (Err(err), cleanup) => Err(err.with_cleanup(cleanup)),
    }
  }

  async fn compile_in(
    &self,
    ctx: &BuildContext,
    env: &BuildEnvironment,
    compile: &Compile,
    output: &Path,
  ) -> Result<(), BuildError> {
    if self.skip_build {
      info!("skipping build as requested");
      return Ok(());
    }

    info!(host = %self.host, target = %compile.platform, "building");

    let tidy = env.go_mod_command(["tidy", "-e"]);
    env.run(ctx, tidy).await.map_err(|e| e.in_phase(Phase::Tidy))?;

    let mut cmd = env.go_build_command([OsStr::new("build"), OsStr::new("-o"), output.as_os_str()]);
    if self.debug {
      cmd.args(["-gcflags", "all=-N -l"]);
    } else if !env.has_build_flags() {
      cmd.args(["-ldflags", "-w -s", "-trimpath"]);
      if let Some(tags) = self.host.build_tags() {
        cmd.args(["-tags", tags]);
      }
    }
    if self.race_detector {
      cmd.arg("-race");
    }

    cmd.env("GOOS", &compile.platform.os);
    cmd.env("GOARCH", &compile.platform.arch);
    if compile.platform.arm.is_empty() {
      cmd.env_remove("GOARM");
    } else {
      cmd.env("GOARM", &compile.platform.arm);
    }
    cmd.env("CGO_ENABLED", compile.cgo_enabled());

    env.run(ctx, cmd).await.map_err(|e| e.in_phase(Phase::Compile))?;

    info!(output = %output.display(), "build complete");
    Ok(())
  }
}

/// Optional durations written the humantime way (`90s`, `5m`).
mod duration_opt {
  use std::time::Duration;

  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
      Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw
      .filter(|s| !s.is_empty())
      .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
      .transpose()
  }
}
