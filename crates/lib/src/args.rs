//! Parsing of `module[@version][=replacement]` arguments.

use crate::error::BuildError;
use crate::util::path;

/// The parts of a `--with` style argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleArg {
  pub module: String,
  pub version: String,
  pub replace: String,
}

/// Split `module[@version][=replacement]` into its parts.
///
/// The replacement is everything after the first `=` and is kept verbatim,
/// so it may itself contain `@` or `=`. The version is split off the rest
/// at the last `@`, which lets module paths contain `@` as long as a
/// version follows.
pub fn split_with(arg: &str) -> Result<ModuleArg, BuildError> {
  let (head, replace) = match arg.split_once('=') {
    Some((head, replace)) => (head, replace),
    None => (arg, ""),
  };
  let (module, version) = match head.rsplit_once('@') {
    Some((module, version)) => (module, version),
    None => (head, ""),
  };

  if module.is_empty() {
    return Err(BuildError::validation("module name is required"));
  }

  Ok(ModuleArg {
    module: module.to_string(),
    version: version.to_string(),
    replace: replace.to_string(),
  })
}

/// Compute the import path of the package in `cwd`, given that the module
/// `current_module` is rooted at `module_dir`.
///
/// Backslash-separated input is handled on every host.
pub fn normalize_import_path(current_module: &str, cwd: &str, module_dir: &str) -> String {
  let rel = cwd.strip_prefix(module_dir).unwrap_or(cwd);
  path::join([current_module, &path::to_slash(rel)])
}
