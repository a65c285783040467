//! Semantic import versioning for module paths.

use semver::Version;

use crate::error::BuildError;
use crate::util::path;

/// Return `module_path` with the major version of `module_version` appended
/// when it is above 1, e.g. `foo` at `v2.0.0` becomes `foo/v2`.
///
/// Versions that are not semantic versions (branches, commits) leave the
/// path untouched. A `v`-prefixed version that fails strict parsing is an
/// error, as is a path whose `/vN` suffix disagrees with the version.
pub fn versioned_module_path(module_path: &str, module_version: &str) -> Result<String, BuildError> {
  if module_version.is_empty() {
    return Ok(module_path.to_string());
  }

  let bare = module_version.strip_prefix('v').unwrap_or(module_version);
  let version = match Version::parse(bare) {
    Ok(version) => version,
    // Only an error when it was clearly meant to be a semantic version.
    Err(err) if module_version.starts_with('v') => {
      return Err(BuildError::InvalidVersion {
        version: module_version.to_string(),
        reason: err.to_string(),
      });
    }
    Err(_) => return Ok(module_path.to_string()),
  };
  let major = version.major;

  let mut versioned = module_path.to_string();
  match major_suffix(module_path) {
    Some(suffix) => {
      let path_major = suffix.parse::<u64>().map_err(|err| BuildError::InvalidVersion {
        version: module_version.to_string(),
        reason: format!("module path {module_path} has bad version: {err}"),
      })?;
      if path_major != major {
        return Err(BuildError::InvalidVersion {
          version: module_version.to_string(),
          reason: format!(
            "versioned module path ({module_path}) and requested module major version ({major}) diverge"
          ),
        });
      }
    }
    None if major > 1 => versioned.push_str(&format!("/v{major}")),
    None => {}
  }

  Ok(path::clean(&versioned))
}

/// The digits of a trailing `/vN` element, if the path ends with one and
/// has something before it.
fn major_suffix(module_path: &str) -> Option<&str> {
  let (head, last) = module_path.rsplit_once('/')?;
  let digits = last.strip_prefix('v')?;
  if head.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  Some(digits)
}
