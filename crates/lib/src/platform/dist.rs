//! Targets reported by `go tool dist list`.

use serde::Deserialize;
use tokio::process::Command;

use super::{Compile, Platform};
use crate::context::BuildContext;
use crate::error::BuildError;
use crate::process::ProcessRunner;

/// One entry of `go tool dist list -json`.
#[derive(Debug, Deserialize)]
struct Dist {
  #[serde(rename = "GOOS")]
  goos: String,
  #[serde(rename = "GOARCH")]
  goarch: String,
  #[serde(rename = "CgoSupported", default)]
  cgo_supported: bool,
}

/// List the targets the given Go toolchain can build for.
pub async fn supported_platforms(
  ctx: &BuildContext,
  runner: &ProcessRunner,
  go: &str,
) -> Result<Vec<Compile>, BuildError> {
  let mut cmd = Command::new(go);
  cmd.args(["tool", "dist", "list", "-json"]);
  let out = runner.output(ctx, cmd).await?;
  parse_dist_list(&out)
}

/// Translate dist output into build targets. `arm` expands into one
/// target per ARM variant; only Linux supports ARMv5.
pub fn parse_dist_list(json: &[u8]) -> Result<Vec<Compile>, BuildError> {
  let dists: Vec<Dist> = serde_json::from_slice(json)?;

  let mut compiles = Vec::with_capacity(dists.len());
  for dist in dists {
    let compile = Compile {
      platform: Platform::new(dist.goos, dist.goarch),
      cgo: dist.cgo_supported,
    };
    if compile.platform.arch != "arm" {
      compiles.push(compile);
      continue;
    }
    let variants: &[&str] = if compile.platform.os == "linux" {
      &["5", "6", "7"]
    } else {
      &["6", "7"]
    };
    for arm in variants {
      let mut variant = compile.clone();
      variant.platform.arm = arm.to_string();
      compiles.push(variant);
    }
  }
  Ok(compiles)
}
