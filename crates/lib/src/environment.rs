//! The temporary Go module a build runs in.
//!
//! [`BuildEnvironment::open`] creates a fresh directory, writes the
//! generated sources, initializes a module, applies replacements and pins
//! versions. The environment owns that directory until
//! [`BuildEnvironment::close`] removes it; dropping an environment that was
//! never closed removes it too.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, error, info};

use crate::builder::Builder;
use crate::context::BuildContext;
use crate::dependency::{Dependency, Replace, collapse_replacements};
use crate::error::{BuildError, Phase};
use crate::host::HostApp;
use crate::process::ProcessRunner;
use crate::template;
use crate::util::fs::copy_dir;
use crate::version::versioned_module_path;

/// Date format used in temporary folder names.
const TEMP_DIR_TIMESTAMP: &str = "%Y-%m-%d-%H%M";

/// Lifecycle of a [`BuildEnvironment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvState {
  /// The directory exists but setup has not finished.
  Uninitialized,
  /// Setup finished; the module is ready to tidy and compile.
  Ready,
  /// Torn down; the directory is gone unless cleanup was skipped.
  Closed,
}

/// A temporary Go module prepared for one build.
#[derive(Debug)]
pub struct BuildEnvironment {
  host: HostApp,
  core_module: String,
  core_version: String,
  plugins: Vec<Dependency>,
  replacements: Vec<Replace>,
  temp_dir: PathBuf,
  go: String,
  build_flags: String,
  mod_flags: String,
  timeout_get: Option<Duration>,
  skip_cleanup: bool,
  runner: ProcessRunner,
  state: EnvState,
}

impl BuildEnvironment {
  /// Create and populate a build environment for `builder`.
  ///
  /// If any step fails the directory is removed (unless cleanup is
  /// skipped) before the error is returned.
  pub async fn open(ctx: &BuildContext, builder: &Builder, runner: ProcessRunner) -> Result<Self, BuildError> {
    let host = builder.host;
    let core_path = host.core_module_path(builder.core_module.as_deref(), &builder.core_version);
    let core_module =
      versioned_module_path(&core_path, &builder.core_version).map_err(|e| e.in_phase(Phase::Prepare))?;

    let plugins = builder
      .plugins
      .iter()
      .map(|p| -> Result<Dependency, BuildError> {
        let path = versioned_module_path(&p.package_path, &p.version)?;
        Ok(Dependency::new(path, p.version.clone()))
      })
      .collect::<Result<Vec<_>, _>>()
      .map_err(|e| e.in_phase(Phase::Prepare))?;

    if !builder.embed_dirs.is_empty() && !host.supports_embed() {
      return Err(BuildError::validation(format!("{host} does not support embedded directories")));
    }

    let temp_dir =
      new_temp_dir(builder.temp_parent.as_deref()).map_err(|e| BuildError::from(e).in_phase(Phase::Prepare))?;
    info!(path = %temp_dir.display(), "temporary folder");

    let mut env = Self {
      host,
      core_module,
      core_version: builder.core_version.clone(),
      plugins,
      replacements: collapse_replacements(&builder.replacements),
      temp_dir,
      go: builder.go_executable().to_string(),
      build_flags: builder.build_flags.clone(),
      mod_flags: builder.mod_flags.clone(),
      timeout_get: builder.timeout_get,
      skip_cleanup: builder.skip_cleanup,
      runner,
      state: EnvState::Uninitialized,
    };

    match env.setup(ctx, builder).await {
      Ok(()) => {
        env.state = EnvState::Ready;
        info!("build environment ready");
        Ok(env)
      }
      Err(err) => {
        let cleanup = env.close().err();
        Err(err.with_cleanup(cleanup))
      }
    }
  }

  async fn setup(&self, ctx: &BuildContext, builder: &Builder) -> Result<(), BuildError> {
    self.write_sources(builder).map_err(|e| e.in_phase(Phase::Prepare))?;

    info!("initializing Go module");
    let mut cmd = self.go_mod_command(["init"]);
    cmd.arg(self.host.module_name());
    self.run(ctx, cmd).await.map_err(|e| e.in_phase(Phase::InitModule))?;

    // Replacements go in before any version is pinned.
    if !self.replacements.is_empty() {
      let mut cmd = self.go_mod_command(["edit"]);
      for replace in &self.replacements {
        info!(old = %replace.old, new = %replace.new, "replace");
        cmd.arg("-replace").arg(replace.directive());
      }
      self.run(ctx, cmd).await.map_err(|e| e.in_phase(Phase::Replace))?;
    }

    self.pin_versions(ctx).await.map_err(|e| e.in_phase(Phase::PinVersions))
  }

  fn write_sources(&self, builder: &Builder) -> Result<(), BuildError> {
    let plugin_paths: Vec<String> = self.plugins.iter().map(|p| p.package_path.clone()).collect();
    let main = template::render_main(self.host, &self.core_module, &plugin_paths);
    let main_path = self.temp_dir.join("main.go");
    info!(path = %main_path.display(), "writing main module");
    debug!("{main}");
    fs::write(&main_path, main)?;

    if builder.embed_dirs.is_empty() {
      return Ok(());
    }
    for embed in &builder.embed_dirs {
      if !embed.dir.exists() {
        return Err(BuildError::EmbedMissing(embed.dir.clone()));
      }
      info!(dir = %embed.dir.display(), alias = %embed.name, "embedding directory");
      copy_dir(&embed.dir, &self.temp_dir.join("files").join(&embed.name))?;
    }
    let embed_path = self.temp_dir.join("embed.go");
    info!(path = %embed_path.display(), "writing embedded module");
    fs::write(embed_path, template::render_embed(&self.core_module))?;
    Ok(())
  }

  async fn pin_versions(&self, ctx: &BuildContext) -> Result<(), BuildError> {
    ctx.check()?;

    // Fetching may have its own budget, still bounded by the build's.
    let ctx = match self.timeout_get {
      Some(timeout) => ctx.with_timeout(timeout),
      None => ctx.clone(),
    };

    info!("pinning versions");
    let core = Dependency::new(self.core_module.clone(), self.core_version.clone());
    self.go_get(&ctx, Some(&core), None).await?;

    for plugin in &self.plugins {
      // Local replacements must not be fetched; a plugin package may live
      // anywhere inside a replaced module.
      if self.is_replaced(&plugin.package_path) {
        debug!(plugin = %plugin, "skipping replaced plugin");
        continue;
      }
      // Pinning the core alongside keeps a plugin from upgrading it.
      self.go_get(&ctx, Some(plugin), Some(&core)).await?;
      ctx.check()?;
    }

    // A bare `go get` settles ambiguities some plugins introduce.
    self.go_get(&ctx, None, None).await
  }

  fn is_replaced(&self, package_path: &str) -> bool {
    self
      .replacements
      .iter()
      .any(|r| within_module(package_path, r.old.module_path()))
  }

  async fn go_get(
    &self,
    ctx: &BuildContext,
    module: Option<&Dependency>,
    core: Option<&Dependency>,
  ) -> Result<(), BuildError> {
    let mut cmd = self.go_build_command(["get", "-v"]);
    cmd.args(module.iter().chain(core.iter()).map(|d| d.to_string()));
    self.run(ctx, cmd).await
  }

  /// Run a prepared command in this environment.
  pub async fn run(&self, ctx: &BuildContext, cmd: Command) -> Result<(), BuildError> {
    self.runner.run(ctx, cmd).await
  }

  /// Run a prepared command and capture its stdout.
  pub async fn output(&self, ctx: &BuildContext, cmd: Command) -> Result<Vec<u8>, BuildError> {
    self.runner.output(ctx, cmd).await
  }

  /// A `go` command running in the temporary directory.
  pub fn go_command<I, S>(&self, args: I) -> Command
  where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
  {
    let mut cmd = Command::new(&self.go);
    cmd.args(args).current_dir(&self.temp_dir);
    cmd
  }

  /// A `go` command whose first argument is a build-family subcommand
  /// (`build`, `get`, `list`, ...), with the configured build flags.
  pub fn go_build_command<I, S>(&self, args: I) -> Command
  where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
  {
    let mut cmd = self.go_command(args);
    cmd.args(split_flags(&self.build_flags));
    cmd
  }

  /// A `go mod` command with the configured mod flags.
  pub fn go_mod_command<I, S>(&self, args: I) -> Command
  where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
  {
    let mut cmd = self.go_command(["mod"]);
    cmd.args(args);
    cmd.args(split_flags(&self.mod_flags));
    cmd
  }

  pub fn temp_dir(&self) -> &Path {
    &self.temp_dir
  }

  pub fn core_module(&self) -> &str {
    &self.core_module
  }

  pub fn plugins(&self) -> &[Dependency] {
    &self.plugins
  }

  pub fn state(&self) -> EnvState {
    self.state
  }

  pub fn has_build_flags(&self) -> bool {
    !self.build_flags.trim().is_empty()
  }

  /// Tear the environment down. Idempotent.
  ///
  /// The directory is removed unless cleanup is skipped, in which case its
  /// path is logged and it stays on disk.
  pub fn close(&mut self) -> Result<(), BuildError> {
    if self.state == EnvState::Closed {
      return Ok(());
    }
    self.state = EnvState::Closed;

    if self.skip_cleanup {
      info!(path = %self.temp_dir.display(), "skipping cleanup as requested; leaving folder intact");
      return Ok(());
    }
    info!(path = %self.temp_dir.display(), "cleaning up temporary folder");
    match fs::remove_dir_all(&self.temp_dir) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(error) => Err(BuildError::Cleanup {
        path: self.temp_dir.clone(),
        error,
      }),
    }
  }
}

impl Drop for BuildEnvironment {
  fn drop(&mut self) {
    if let Err(e) = self.close() {
      error!("{e}");
    }
  }
}

/// Whether `package_path` starts with the replaced `module` path. This is a
/// plain string prefix, so `foo/barbaz` counts as inside `foo/bar`.
fn within_module(package_path: &str, module: &str) -> bool {
  !module.is_empty() && package_path.starts_with(module)
}

/// Split a flag string with shell quoting rules. A string that cannot be
/// split is logged and ignored.
pub fn split_flags(flags: &str) -> Vec<String> {
  if flags.trim().is_empty() {
    return Vec::new();
  }
  match shlex::split(flags) {
    Some(parts) => parts,
    None => {
      error!(flags, "splitting arguments failed");
      Vec::new()
    }
  }
}

fn new_temp_dir(parent: Option<&Path>) -> io::Result<PathBuf> {
  let prefix = format!("buildenv_{}.", chrono::Local::now().format(TEMP_DIR_TIMESTAMP));
  let mut builder = tempfile::Builder::new();
  builder.prefix(&prefix);

  let dir = match parent {
    Some(parent) => builder.tempdir_in(parent)?,
    // Builds inside macOS's $TMPDIR lose their -ldflags; stay out of it.
    None if cfg!(target_os = "macos") => builder.tempdir_in(std::path::absolute(".")?)?,
    None => builder.tempdir()?,
  };
  Ok(dir.keep())
}
