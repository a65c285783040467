//! Reading the developer's module from `go list -m -json all`.

use serde::Deserialize;
use tracing::info;

use crate::dependency::{Replace, ReplacementPath};
use crate::error::BuildError;
use crate::util::path;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Module {
  #[serde(default)]
  path: String,
  #[serde(default)]
  version: String,
  #[serde(default)]
  replace: Option<Box<Module>>,
  #[serde(default)]
  main: bool,
  #[serde(default)]
  dir: String,
}

/// The main module of a `go list -m -json all` stream and the replacements
/// it declares.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
  pub current_module: String,
  pub module_dir: String,
  /// The main module replaced by its own directory, followed by every
  /// replace directive of the main module, in stream order.
  pub replacements: Vec<Replace>,
}

/// Parse the concatenated JSON objects printed by `go list -m -json all`.
///
/// Replacement targets that are relative paths are resolved against the
/// main module's directory, including those listed before the main module.
pub fn parse_go_list_json(out: &[u8]) -> Result<ModuleInfo, BuildError> {
  let mut info = ModuleInfo::default();
  let mut unjoined = Vec::new();

  for module in serde_json::Deserializer::from_slice(out).into_iter::<Module>() {
    let module = module?;

    if module.main {
      info.current_module = module.path;
      info.module_dir = module.dir;
      info
        .replacements
        .push(Replace::new(info.current_module.clone(), info.module_dir.clone()));
      continue;
    }

    let Some(target) = module.replace else {
      continue;
    };

    let src = format!("{}@{}", module.path, module.version);
    let dst = if !target.version.is_empty() {
      format!("{}@{}", target.path, target.version)
    } else if is_absolute(&target.path) {
      target.path
    } else if !info.module_dir.is_empty() {
      let resolved = join_dir(&info.module_dir, &target.path);
      info!(from = %target.path, to = %resolved, "resolved relative replacement");
      resolved
    } else {
      unjoined.push(info.replacements.len());
      target.path
    };
    info.replacements.push(Replace::new(src, dst));
  }

  for idx in unjoined {
    let replace = &mut info.replacements[idx];
    let resolved = join_dir(&info.module_dir, replace.new.as_str());
    info!(from = %replace.new, to = %resolved, "resolved relative replacement");
    replace.new = ReplacementPath::new(resolved);
  }

  Ok(info)
}

fn is_absolute(p: &str) -> bool {
  std::path::Path::new(p).is_absolute() || p.starts_with('/')
}

fn join_dir(dir: &str, rel: &str) -> String {
  if cfg!(windows) {
    std::path::Path::new(dir).join(rel).to_string_lossy().into_owned()
  } else {
    path::join([dir, rel])
  }
}
