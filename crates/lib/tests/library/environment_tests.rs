use std::time::Duration;

use xbuild_lib::{
  BuildContext, BuildEnvironment, BuildError, Cancellation, Dependency, EmbedDir, EnvState, HostApp, Phase,
  ProcessRunner, Replace,
};

use super::common::FakeGo;

#[tokio::test]
async fn pins_core_before_plugins() {
  let go = FakeGo::new();
  let mut builder = go.builder(HostApp::Caddy);
  builder.core_version = "v2.0.1".to_string();
  builder.plugins = vec![Dependency::new("example.org/plugin", "v1.0.0")];

  let mut env = BuildEnvironment::open(&BuildContext::background(), &builder, ProcessRunner::new())
    .await
    .unwrap();

  assert_eq!(env.state(), EnvState::Ready);
  assert_eq!(env.core_module(), "github.com/caddyserver/caddy/v2");
  let main = std::fs::read_to_string(env.temp_dir().join("main.go")).unwrap();
  assert!(main.contains("caddycmd \"github.com/caddyserver/caddy/v2/cmd\""));
  assert!(main.contains("_ \"example.org/plugin\""));

  assert_eq!(
    go.calls(),
    vec![
      "mod init caddy",
      "get -v github.com/caddyserver/caddy/v2@v2.0.1",
      "get -v example.org/plugin@v1.0.0 github.com/caddyserver/caddy/v2@v2.0.1",
      "get -v",
    ]
  );

  let dir = env.temp_dir().to_path_buf();
  env.close().unwrap();
  assert_eq!(env.state(), EnvState::Closed);
  assert!(!dir.exists());
  env.close().unwrap();
}

#[tokio::test]
async fn replacements_precede_pinning_and_skip_replaced_plugins() {
  let go = FakeGo::new();
  let mut builder = go.builder(HostApp::Caddy);
  builder.plugins = vec![
    Dependency::new("github.com/a/mod/plugin", ""),
    Dependency::new("github.com/a/modx", "v0.3.0"),
    Dependency::new("example.org/other", "v1.2.0"),
  ];
  builder.replacements = vec![Replace::new("github.com/a/mod", "/src/mod")];

  let _env = BuildEnvironment::open(&BuildContext::background(), &builder, ProcessRunner::new())
    .await
    .unwrap();

  assert_eq!(
    go.calls(),
    vec![
      "mod init caddy",
      "mod edit -replace github.com/a/mod=/src/mod",
      "get -v github.com/caddyserver/caddy/v2",
      "get -v example.org/other@v1.2.0 github.com/caddyserver/caddy/v2",
      "get -v",
    ]
  );
}

#[tokio::test]
async fn later_replacement_of_same_module_wins() {
  let go = FakeGo::new();
  let mut builder = go.builder(HostApp::Caddy);
  builder.replacements = vec![
    Replace::new("A", "X"),
    Replace::new("B v1.0.0", "Z"),
    Replace::new("A", "Y"),
  ];

  let _env = BuildEnvironment::open(&BuildContext::background(), &builder, ProcessRunner::new())
    .await
    .unwrap();

  assert_eq!(go.calls()[1], "mod edit -replace A=Y -replace B@v1.0.0=Z");
}

#[tokio::test]
async fn failed_pin_removes_temp_dir() {
  let go = FakeGo::new().failing_on("\"get -v example.org/plugin\"*");
  let mut builder = go.builder(HostApp::Caddy);
  builder.plugins = vec![Dependency::new("example.org/plugin", "v1.0.0")];

  let err = BuildEnvironment::open(&BuildContext::background(), &builder, ProcessRunner::new())
    .await
    .unwrap_err();

  assert_eq!(err.phase(), Some(Phase::PinVersions));
  assert!(err.to_string().starts_with("pinning versions: "), "{err}");
  assert!(go.leftover_dirs().is_empty(), "{:?}", go.leftover_dirs());
}

#[tokio::test]
async fn failed_init_reports_phase() {
  let go = FakeGo::new().failing_on("\"mod init\"*");
  let builder = go.builder(HostApp::Caddy);

  let err = BuildEnvironment::open(&BuildContext::background(), &builder, ProcessRunner::new())
    .await
    .unwrap_err();

  assert_eq!(err.phase(), Some(Phase::InitModule));
  assert!(go.leftover_dirs().is_empty());
  assert_eq!(go.calls(), vec!["mod init caddy"]);
}

#[tokio::test]
async fn skip_cleanup_leaves_temp_dir_on_failure() {
  let go = FakeGo::new().failing_on("\"get -v\"");
  let mut builder = go.builder(HostApp::Caddy);
  builder.skip_cleanup = true;

  let err = BuildEnvironment::open(&BuildContext::background(), &builder, ProcessRunner::new())
    .await
    .unwrap_err();

  assert_eq!(err.phase(), Some(Phase::PinVersions));
  let leftovers = go.leftover_dirs();
  assert_eq!(leftovers.len(), 1);
  assert!(leftovers[0].join("main.go").exists());
}

#[tokio::test]
async fn cancellation_during_pinning_is_reported_and_cleaned_up() {
  let go = FakeGo::new().hanging_on("\"get -v example.org/slow\"*");
  let mut builder = go.builder(HostApp::Caddy);
  builder.plugins = vec![Dependency::new("example.org/slow", "")];

  let (ctx, handle) = BuildContext::new();
  let runner = ProcessRunner::with_grace_period(Duration::from_millis(200));
  let calls_log = go.calls_log();
  let canceller = tokio::spawn(async move {
    // Cancel once the slow fetch is underway.
    loop {
      let calls = std::fs::read_to_string(&calls_log).unwrap_or_default();
      if calls.contains("example.org/slow") {
        break;
      }
      tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.cancel();
  });

  let err = BuildEnvironment::open(&ctx, &builder, runner).await.unwrap_err();
  canceller.await.unwrap();

  assert_eq!(err.cancellation(), Some(Cancellation::Cancelled));
  assert!(err.is_cancellation());
  assert!(go.leftover_dirs().is_empty());
  // The final bare `go get` never ran.
  assert_eq!(
    go.calls().last().map(String::as_str),
    Some("get -v example.org/slow github.com/caddyserver/caddy/v2")
  );
}

#[tokio::test]
async fn get_timeout_bounds_pinning() {
  let go = FakeGo::new().hanging_on("\"get -v github.com/caddyserver\"*");
  let mut builder = go.builder(HostApp::Caddy);
  builder.timeout_get = Some(Duration::from_millis(100));

  let runner = ProcessRunner::with_grace_period(Duration::from_millis(100));
  let err = BuildEnvironment::open(&BuildContext::background(), &builder, runner)
    .await
    .unwrap_err();

  assert_eq!(err.cancellation(), Some(Cancellation::DeadlineExceeded));
  assert_eq!(err.phase(), Some(Phase::PinVersions));
}

#[tokio::test]
async fn already_cancelled_context_stops_before_pinning() {
  let go = FakeGo::new();
  let builder = go.builder(HostApp::Caddy);
  let (ctx, handle) = BuildContext::new();
  handle.cancel();

  let err = BuildEnvironment::open(&ctx, &builder, ProcessRunner::new())
    .await
    .unwrap_err();

  assert!(err.is_cancellation());
  assert_eq!(err.phase(), Some(Phase::InitModule));
  assert!(go.calls().is_empty());
  assert!(go.leftover_dirs().is_empty());
}

#[tokio::test]
async fn flags_are_appended() {
  let go = FakeGo::new();
  let mut builder = go.builder(HostApp::Caddy);
  builder.core_version = "v2.8.4".to_string();
  builder.build_flags = "-trimpath -tags 'nobadger nomysql'".to_string();
  builder.mod_flags = "-modcacherw".to_string();

  let _env = BuildEnvironment::open(&BuildContext::background(), &builder, ProcessRunner::new())
    .await
    .unwrap();

  let calls = go.calls();
  assert_eq!(calls[0], "mod init caddy -modcacherw");
  assert_eq!(
    calls[1],
    "get -v -trimpath -tags nobadger nomysql github.com/caddyserver/caddy/v2@v2.8.4"
  );
}

#[tokio::test]
async fn k6_host_uses_its_own_module() {
  let go = FakeGo::new();
  let mut builder = go.builder(HostApp::K6);
  builder.core_version = "v0.50.0".to_string();
  builder.plugins = vec![Dependency::new("github.com/grafana/xk6-sql", "")];

  let env = BuildEnvironment::open(&BuildContext::background(), &builder, ProcessRunner::new())
    .await
    .unwrap();

  let main = std::fs::read_to_string(env.temp_dir().join("main.go")).unwrap();
  assert!(main.contains("k6cmd \"go.k6.io/k6/cmd\""));
  assert!(main.contains("k6cmd.Execute()"));
  assert_eq!(go.calls()[0], "mod init k6");
  assert_eq!(go.calls()[1], "get -v go.k6.io/k6@v0.50.0");
}

#[tokio::test]
async fn embedded_directories_are_copied() {
  let go = FakeGo::new();
  let site = tempfile::tempdir().unwrap();
  std::fs::write(site.path().join("index.html"), "hello").unwrap();

  let mut builder = go.builder(HostApp::Caddy);
  builder.embed_dirs = vec![EmbedDir {
    dir: site.path().to_path_buf(),
    name: "site".to_string(),
  }];

  let env = BuildEnvironment::open(&BuildContext::background(), &builder, ProcessRunner::new())
    .await
    .unwrap();

  let copied = env.temp_dir().join("files/site/index.html");
  assert_eq!(std::fs::read_to_string(copied).unwrap(), "hello");
  let embed = std::fs::read_to_string(env.temp_dir().join("embed.go")).unwrap();
  assert!(embed.contains("\"github.com/caddyserver/caddy/v2\""));
}

#[tokio::test]
async fn missing_embed_dir_fails_and_cleans_up() {
  let go = FakeGo::new();
  let mut builder = go.builder(HostApp::Caddy);
  builder.embed_dirs = vec![EmbedDir::parse("site:/definitely/not/here")];

  let err = BuildEnvironment::open(&BuildContext::background(), &builder, ProcessRunner::new())
    .await
    .unwrap_err();

  assert_eq!(err.phase(), Some(Phase::Prepare));
  assert!(err.to_string().contains("embed directory does not exist"), "{err}");
  assert!(go.leftover_dirs().is_empty());
  assert!(go.calls().is_empty());
}

#[tokio::test]
async fn invalid_version_fails_before_creating_anything() {
  let go = FakeGo::new();
  let mut builder = go.builder(HostApp::Caddy);
  builder.plugins = vec![Dependency::new("example.org/plugin/v2", "v3.0.0")];

  let err = BuildEnvironment::open(&BuildContext::background(), &builder, ProcessRunner::new())
    .await
    .unwrap_err();

  assert!(err.to_string().contains("diverge"), "{err}");
  assert!(go.leftover_dirs().is_empty());
  assert!(go.calls().is_empty());
}

#[tokio::test]
async fn dropping_an_open_environment_removes_it() {
  let go = FakeGo::new();
  let builder = go.builder(HostApp::Caddy);

  let env = BuildEnvironment::open(&BuildContext::background(), &builder, ProcessRunner::new())
    .await
    .unwrap();
  let dir = env.temp_dir().to_path_buf();
  assert!(dir.exists());

  drop(env);
  assert!(!dir.exists());
}

#[tokio::test]
async fn missing_toolchain_is_a_start_error() {
  let go = FakeGo::new();
  let mut builder = go.builder(HostApp::Caddy);
  builder.go = Some("/nonexistent/go".to_string());

  let err = BuildEnvironment::open(&BuildContext::background(), &builder, ProcessRunner::new())
    .await
    .unwrap_err();

  match err {
    BuildError::Phase { phase, cause } => {
      assert_eq!(phase, Phase::InitModule);
      assert!(matches!(*cause, BuildError::ProcessStart { .. }));
    }
    other => panic!("unexpected error: {other}"),
  }
  assert!(go.leftover_dirs().is_empty());
}
