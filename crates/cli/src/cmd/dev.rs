//! Implementation of the default (dev) command.
//!
//! Builds the host application with the Go module in the current directory
//! plugged in, runs it with the remaining arguments, and removes the binary
//! afterwards.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio::process::Command;
use tracing::{error, info};

use xbuild_lib::args::normalize_import_path;
use xbuild_lib::golist::parse_go_list_json;
use xbuild_lib::{BuildContext, Dependency, ProcessRunner};

use crate::Settings;
use crate::cmd::build::setcap;
use crate::signal::trap_signals;

pub fn cmd_dev(settings: &Settings, args: Vec<String>) -> Result<()> {
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(run_dev(settings, args))
}

async fn run_dev(settings: &Settings, args: Vec<String>) -> Result<()> {
  let (ctx, handle) = BuildContext::new();
  trap_signals(handle);
  let runner = ProcessRunner::new();

  let mut builder = settings.to_builder();
  if let Some(version) = settings.env_core_version() {
    builder.core_version = version;
  }

  // The user's replace directives only apply to their own go.mod, so they
  // are carried over to the generated one.
  let mut cmd = Command::new(builder.go_executable());
  cmd.args(["list", "-m", "-json", "all"]);
  let out = runner
    .output(&ctx, cmd)
    .await
    .context("Failed to list the current module")?;
  let module = parse_go_list_json(&out).context("Failed to parse go list output")?;
  if module.current_module.is_empty() {
    bail!("No main module found; run this from inside a Go module");
  }

  let cwd = std::env::current_dir().context("Unable to determine current directory")?;
  let import_path = import_path_for(&module.current_module, &cwd, Path::new(&module.module_dir));
  info!(module = %import_path, "plugging in current module");

  builder.plugins = vec![Dependency::new(import_path, "")];
  builder.replacements = module.replacements;

  let target = builder.resolved_compile().platform;
  let output = PathBuf::from(builder.host.default_output(&target.os));
  let binary = builder.build(&ctx, &output).await.context("Build failed")?;
  if builder.skip_build {
    return Ok(());
  }

  if settings.setcap {
    setcap(&ctx, &binary).await?;
  }

  info!(binary = %binary.display(), ?args, "running");
  let mut cmd = Command::new(&binary);
  cmd.args(&args);
  let result = runner.run(&ctx, cmd).await;

  remove_binary(&binary, settings.skip_cleanup);

  match result {
    Ok(()) => Ok(()),
    // The binary saw the same interrupt and shut down.
    Err(err) if err.is_cancellation() => Ok(()),
    Err(err) => Err(err).with_context(|| format!("{} exited with an error", binary.display())),
  }
}

/// The import path of the package in `cwd`. `go list` reports the module
/// directory as reached through `$PWD`, which may run through symlinks, so
/// both sides are resolved before comparing.
fn import_path_for(current_module: &str, cwd: &Path, module_dir: &Path) -> String {
  let cwd = dunce::canonicalize(cwd).unwrap_or_else(|_| cwd.to_path_buf());
  let module_dir = dunce::canonicalize(module_dir).unwrap_or_else(|_| module_dir.to_path_buf());
  normalize_import_path(current_module, &cwd.to_string_lossy(), &module_dir.to_string_lossy())
}

fn remove_binary(binary: &Path, skip_cleanup: bool) {
  if skip_cleanup {
    info!(artifact = %binary.display(), "skipping cleanup as requested");
    return;
  }
  if let Err(err) = std::fs::remove_file(binary)
    && err.kind() != std::io::ErrorKind::NotFound
  {
    error!(binary = %binary.display(), error = %err, "deleting temporary binary");
  }
}
