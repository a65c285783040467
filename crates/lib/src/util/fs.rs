//! Recursive directory copy used for embedded files.

use std::fs;
use std::io;
use std::path::Path;

use tracing::info;
use walkdir::WalkDir;

use crate::error::BuildError;

/// Copy the tree at `src` into `dst`, keeping file modes and recreating
/// symlinks rather than following them.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<(), BuildError> {
  info!(src = %src.display(), dst = %dst.display(), "copying files");

  let copy_err = |error: io::Error| BuildError::Copy {
    from: src.to_path_buf(),
    to: dst.to_path_buf(),
    error,
  };

  for entry in WalkDir::new(src).sort_by_file_name() {
    let entry = entry.map_err(|e| copy_err(e.into()))?;
    let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
    let target = dst.join(rel);
    let file_type = entry.file_type();

    if file_type.is_dir() {
      fs::create_dir_all(&target).map_err(copy_err)?;
      let permissions = entry.metadata().map_err(|e| copy_err(e.into()))?.permissions();
      fs::set_permissions(&target, permissions).map_err(copy_err)?;
    } else if file_type.is_symlink() {
      let link = fs::read_link(entry.path()).map_err(copy_err)?;
      create_symlink(&link, &target).map_err(copy_err)?;
    } else {
      // fs::copy carries the permission bits over.
      fs::copy(entry.path(), &target).map_err(copy_err)?;
    }
  }
  Ok(())
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
  std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
  if target.is_dir() {
    std::os::windows::fs::symlink_dir(target, link)
  } else {
    std::os::windows::fs::symlink_file(target, link)
  }
}
