//! Shared helpers for library integration tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use xbuild_lib::{Builder, HostApp};

/// A scripted stand-in for the `go` executable.
///
/// Every invocation appends its arguments to `calls.log`. `go build -o X`
/// writes a small executable to `X` and records the target environment in
/// `build-env.log`. Builds create their temporary folders under `work/`.
pub struct FakeGo {
  pub temp: TempDir,
  fail_on: Option<String>,
  hang_on: Option<String>,
}

impl FakeGo {
  pub fn new() -> Self {
    let fake = Self {
      temp: TempDir::new().unwrap(),
      fail_on: None,
      hang_on: None,
    };
    std::fs::create_dir_all(fake.work_dir()).unwrap();
    fake.write_script();
    fake
  }

  /// Exit non-zero when the argument list matches the shell `pattern`.
  pub fn failing_on(mut self, pattern: &str) -> Self {
    self.fail_on = Some(pattern.to_string());
    self.write_script();
    self
  }

  /// Never exit when the argument list matches the shell `pattern`.
  pub fn hanging_on(mut self, pattern: &str) -> Self {
    self.hang_on = Some(pattern.to_string());
    self.write_script();
    self
  }

  pub fn path(&self) -> PathBuf {
    self.temp.path().join("go")
  }

  pub fn work_dir(&self) -> PathBuf {
    self.temp.path().join("work")
  }

  /// A builder wired to this toolchain.
  pub fn builder(&self, host: HostApp) -> Builder {
    let mut builder = Builder::new(host);
    builder.go = Some(self.path().to_string_lossy().into_owned());
    builder.temp_parent = Some(self.work_dir());
    builder
  }

  pub fn calls_log(&self) -> PathBuf {
    self.temp.path().join("calls.log")
  }

  /// Argument lists of every invocation, in order.
  pub fn calls(&self) -> Vec<String> {
    read_lines(&self.calls_log())
  }

  /// `KEY=VALUE` lines seen by the last `go build`, sorted.
  pub fn build_env(&self) -> Vec<String> {
    read_lines(&self.temp.path().join("build-env.log"))
  }

  /// Temporary folders still present under `work/`.
  pub fn leftover_dirs(&self) -> Vec<PathBuf> {
    std::fs::read_dir(self.work_dir())
      .unwrap()
      .map(|entry| entry.unwrap().path())
      .collect()
  }

  fn write_script(&self) {
    let root = self.temp.path().display();
    let mut script = format!("#!/bin/sh\necho \"$*\" >> '{root}/calls.log'\ncase \"$*\" in\n");
    if let Some(pattern) = &self.hang_on {
      script.push_str(&format!("  {pattern}) exec sleep 30 ;;\n"));
    }
    if let Some(pattern) = &self.fail_on {
      script.push_str(&format!("  {pattern}) echo 'fake go: failing' >&2; exit 1 ;;\n"));
    }
    script.push_str("esac\n");
    script.push_str(&format!(
      r#"if [ "$1" = build ]; then
  out=""
  prev=""
  for arg in "$@"; do
    if [ "$prev" = "-o" ]; then out="$arg"; fi
    prev="$arg"
  done
  env | grep -E '^(GOOS|GOARCH|GOARM|CGO_ENABLED)=' | sort > '{root}/build-env.log'
  printf '#!/bin/sh\necho custom\n' > "$out"
  chmod +x "$out"
fi
exit 0
"#
    ));

    let path = self.path();
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  }
}

fn read_lines(path: &Path) -> Vec<String> {
  std::fs::read_to_string(path)
    .unwrap_or_default()
    .lines()
    .map(str::to_string)
    .collect()
}
