//! Implementation of the `xbuild build` command.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::info;

use xbuild_lib::args::split_with;
use xbuild_lib::{BuildContext, Builder, Dependency, EmbedDir, Platform, ProcessRunner, Replace};

use crate::output::{format_duration, print_info, print_mapping, print_success, print_warning};
use crate::signal::trap_signals;
use crate::{BuildArgs, Settings};

/// Execute the build command.
///
/// Assembles a [`Builder`] from the settings (or `--config`), the plugins
/// and replacements given on the command line, then compiles it. A native
/// build is checked by running `<output> version`.
pub fn cmd_build(settings: &Settings, args: BuildArgs) -> Result<()> {
  let mut builder = match &args.config {
    Some(path) => load_config(path)?,
    None => settings.to_builder(),
  };

  if let Some(version) = args.version.clone().or_else(|| settings.env_core_version()) {
    builder.core_version = version;
  }

  for arg in &args.with {
    let parsed = split_with(arg).with_context(|| format!("Invalid --with argument '{}'", arg))?;
    // Trailing slashes are common when completing paths in a shell.
    let module = parsed.module.trim_end_matches('/').to_string();
    builder.plugins.push(Dependency::new(&module, &parsed.version));
    handle_replace(arg, &module, &parsed.version, &parsed.replace, &mut builder.replacements)?;
  }

  for arg in &args.replace {
    let parsed = split_with(arg).with_context(|| format!("Invalid --replace argument '{}'", arg))?;
    let module = parsed.module.trim_end_matches('/').to_string();
    handle_replace(arg, &module, &parsed.version, &parsed.replace, &mut builder.replacements)?;
  }

  builder.embed_dirs.extend(args.embed.iter().map(|e| EmbedDir::parse(e)));

  let target = builder.resolved_compile().platform;
  let output = args
    .output
    .unwrap_or_else(|| PathBuf::from(builder.host.default_output(&target.os)));

  let started = Instant::now();
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(async {
    let (ctx, handle) = BuildContext::new();
    trap_signals(handle);

    let output = builder.build(&ctx, &output).await.context("Build failed")?;
    if builder.skip_build {
      return Ok(());
    }

    print_success(&format!(
      "Built {} {} in {}",
      builder.host,
      target,
      format_duration(started.elapsed())
    ));
    print_info(&output.display().to_string());

    if settings.setcap {
      setcap(&ctx, &output).await?;
    }

    if target.is_native_to(&Platform::host()) {
      println!();
      println!("{} version", output.display());
      let mut cmd = Command::new(&output);
      cmd.arg("version");
      ProcessRunner::new()
        .run(&ctx, cmd)
        .await
        .context("Built binary failed to report its version")?;
    } else {
      print_warning(&format!("Cross-compiled for {}; not running version check", target));
    }
    Ok::<(), anyhow::Error>(())
  })
}

fn load_config(path: &Path) -> Result<Builder> {
  let content =
    std::fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;
  serde_json::from_str(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Record `module[@version] => replacement` if a replacement was given.
///
/// The build runs in a temporary folder, so replacements starting with `.`
/// are resolved against the current directory first.
pub(crate) fn handle_replace(
  orig: &str,
  module: &str,
  version: &str,
  replacement: &str,
  replacements: &mut Vec<Replace>,
) -> Result<()> {
  if replacement.is_empty() {
    return Ok(());
  }

  let mut replacement = replacement.to_string();
  if replacement.starts_with('.') {
    let resolved = std::path::absolute(&replacement)
      .with_context(|| format!("Failed to resolve replacement path: {}", replacement))?;
    replacement = resolved.to_string_lossy().into_owned();
    info!(orig, resolved = %replacement, "resolved relative replacement");
    print_mapping(orig, &replacement);
  }

  replacements.push(Replace::new(Dependency::new(module, version).to_string(), replacement));
  Ok(())
}

/// Allow `binary` to bind privileged ports. Needs admin rights.
pub(crate) async fn setcap(ctx: &BuildContext, binary: &Path) -> Result<()> {
  let mut cmd = Command::new("sudo");
  cmd.args(["setcap", "cap_net_bind_service=+ep"]).arg(binary);
  info!(binary = %binary.display(), "setting capabilities (requires admin privileges)");
  ProcessRunner::new()
    .run(ctx, cmd)
    .await
    .context("Failed to set capabilities")
}
