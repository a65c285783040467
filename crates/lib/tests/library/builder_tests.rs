use std::time::Duration;

use serial_test::serial;
use xbuild_lib::{BuildContext, Cancellation, Dependency, HostApp, Phase, Platform, ProcessRunner};

use super::common::FakeGo;

#[tokio::test]
async fn builds_with_release_flags_by_default() {
  let go = FakeGo::new();
  let out_dir = tempfile::tempdir().unwrap();
  let output = out_dir.path().join("caddy");

  let mut builder = go.builder(HostApp::Caddy);
  builder.core_version = "v2.0.1".to_string();
  builder.plugins = vec![Dependency::new("example.org/plugin", "v1.0.0")];
  builder.compile.platform = Platform::new("linux", "amd64");

  let built = builder.build(&BuildContext::background(), &output).await.unwrap();

  assert_eq!(built, output);
  assert!(output.exists());
  assert_eq!(
    go.calls(),
    vec![
      "mod init caddy".to_string(),
      "get -v github.com/caddyserver/caddy/v2@v2.0.1".to_string(),
      "get -v example.org/plugin@v1.0.0 github.com/caddyserver/caddy/v2@v2.0.1".to_string(),
      "get -v".to_string(),
      "mod tidy -e".to_string(),
      format!(
        "build -o {} -ldflags -w -s -trimpath -tags nobadger,nomysql,nopgx",
        output.display()
      ),
    ]
  );
  assert_eq!(go.build_env(), vec!["CGO_ENABLED=0", "GOARCH=amd64", "GOOS=linux"]);
  assert!(go.leftover_dirs().is_empty());
}

#[tokio::test]
async fn debug_keeps_symbols() {
  let go = FakeGo::new();
  let out_dir = tempfile::tempdir().unwrap();
  let output = out_dir.path().join("caddy");

  let mut builder = go.builder(HostApp::Caddy);
  builder.debug = true;
  builder.build(&BuildContext::background(), &output).await.unwrap();

  let build = go.calls().pop().unwrap();
  assert_eq!(build, format!("build -o {} -gcflags all=-N -l", output.display()));
}

#[tokio::test]
async fn custom_build_flags_replace_defaults() {
  let go = FakeGo::new();
  let out_dir = tempfile::tempdir().unwrap();
  let output = out_dir.path().join("k6");

  let mut builder = go.builder(HostApp::K6);
  builder.build_flags = "-ldflags='-X main.v=1'".to_string();
  builder.build(&BuildContext::background(), &output).await.unwrap();

  let build = go.calls().pop().unwrap();
  assert_eq!(build, format!("build -o {} -ldflags=-X main.v=1", output.display()));
}

#[tokio::test]
async fn k6_release_build_has_no_tags() {
  let go = FakeGo::new();
  let out_dir = tempfile::tempdir().unwrap();
  let output = out_dir.path().join("k6");

  go.builder(HostApp::K6)
    .build(&BuildContext::background(), &output)
    .await
    .unwrap();

  let build = go.calls().pop().unwrap();
  assert_eq!(build, format!("build -o {} -ldflags -w -s -trimpath", output.display()));
}

#[tokio::test]
async fn race_detector_enables_cgo() {
  let go = FakeGo::new();
  let out_dir = tempfile::tempdir().unwrap();
  let output = out_dir.path().join("caddy");

  let mut builder = go.builder(HostApp::Caddy);
  builder.race_detector = true;
  builder.compile.platform = Platform {
    os: "linux".to_string(),
    arch: "arm".to_string(),
    arm: "7".to_string(),
  };
  builder.build(&BuildContext::background(), &output).await.unwrap();

  assert!(go.calls().pop().unwrap().ends_with(" -race"));
  assert_eq!(
    go.build_env(),
    vec!["CGO_ENABLED=1", "GOARCH=arm", "GOARM=7", "GOOS=linux"]
  );
}

#[tokio::test]
async fn skip_build_stops_after_setup() {
  let go = FakeGo::new();
  let out_dir = tempfile::tempdir().unwrap();
  let output = out_dir.path().join("caddy");

  let mut builder = go.builder(HostApp::Caddy);
  builder.skip_build = true;
  builder.build(&BuildContext::background(), &output).await.unwrap();

  assert!(!output.exists());
  assert!(!go.calls().iter().any(|c| c.starts_with("mod tidy") || c.starts_with("build")));
  assert!(go.leftover_dirs().is_empty());
}

#[tokio::test]
async fn compile_failure_reports_phase_and_cleans_up() {
  let go = FakeGo::new().failing_on("build*");
  let out_dir = tempfile::tempdir().unwrap();
  let output = out_dir.path().join("caddy");

  let err = go
    .builder(HostApp::Caddy)
    .build(&BuildContext::background(), &output)
    .await
    .unwrap_err();

  assert_eq!(err.phase(), Some(Phase::Compile));
  assert!(err.to_string().starts_with("compiling: "), "{err}");
  assert!(!output.exists());
  assert!(go.leftover_dirs().is_empty());
}

#[tokio::test]
async fn tidy_failure_reports_phase() {
  let go = FakeGo::new().failing_on("\"mod tidy\"*");
  let out_dir = tempfile::tempdir().unwrap();

  let err = go
    .builder(HostApp::Caddy)
    .build(&BuildContext::background(), out_dir.path().join("caddy"))
    .await
    .unwrap_err();

  assert_eq!(err.phase(), Some(Phase::Tidy));
}

#[tokio::test]
async fn build_timeout_cancels_compile() {
  let go = FakeGo::new().hanging_on("build*");
  let out_dir = tempfile::tempdir().unwrap();

  let mut builder = go.builder(HostApp::Caddy);
  builder.timeout_build = Some(Duration::from_millis(500));
  let runner = ProcessRunner::with_grace_period(Duration::from_millis(100));

  let err = builder
    .build_with_runner(&BuildContext::background(), out_dir.path().join("caddy"), runner)
    .await
    .unwrap_err();

  assert_eq!(err.cancellation(), Some(Cancellation::DeadlineExceeded));
  assert_eq!(err.phase(), Some(Phase::Compile));
  assert!(go.leftover_dirs().is_empty());
}

#[tokio::test]
async fn skip_cleanup_keeps_temp_dir() {
  let go = FakeGo::new();
  let out_dir = tempfile::tempdir().unwrap();

  let mut builder = go.builder(HostApp::Caddy);
  builder.skip_cleanup = true;
  builder
    .build(&BuildContext::background(), out_dir.path().join("caddy"))
    .await
    .unwrap();

  let leftovers = go.leftover_dirs();
  assert_eq!(leftovers.len(), 1);
  assert!(leftovers[0].join("main.go").exists());
}

#[tokio::test]
#[serial]
async fn relative_output_is_made_absolute() {
  let go = FakeGo::new();
  let cwd = tempfile::tempdir().unwrap();
  let original = std::env::current_dir().unwrap();
  std::env::set_current_dir(cwd.path()).unwrap();

  let result = go
    .builder(HostApp::Caddy)
    .build(&BuildContext::background(), "caddy-custom")
    .await;
  std::env::set_current_dir(original).unwrap();

  let built = result.unwrap();
  assert!(built.is_absolute());
  assert_eq!(built.file_name().unwrap(), "caddy-custom");
  assert!(cwd.path().join("caddy-custom").exists());
}
