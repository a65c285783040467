//! Implementation of the `xbuild platforms` command.

use anyhow::{Context, Result};

use xbuild_lib::platform::supported_platforms;
use xbuild_lib::{BuildContext, ProcessRunner};

use crate::Settings;
use crate::output::{OutputFormat, print_json};

/// Print every target the Go toolchain can build for, one `os/arch[/vN]`
/// per line, or as JSON.
pub fn cmd_platforms(settings: &Settings, format: OutputFormat) -> Result<()> {
  let go = settings.go.clone().unwrap_or_else(|| "go".to_string());

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let platforms = rt
    .block_on(supported_platforms(&BuildContext::background(), &ProcessRunner::new(), &go))
    .context("Failed to list supported platforms")?;

  if format.is_json() {
    return print_json(&platforms);
  }

  for compile in &platforms {
    if compile.cgo {
      println!("{} (cgo)", compile.platform);
    } else {
      println!("{}", compile.platform);
    }
  }
  Ok(())
}
