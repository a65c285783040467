//! Toolchain invocations with cancellation.
//!
//! A command runs to completion unless its [`BuildContext`] ends first. When
//! it does, the child gets a grace period to exit on its own (it usually
//! received the same interrupt) before it is killed. Either way the
//! reported error is the cancellation, never the child's exit status.

use std::ffi::OsStr;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::context::BuildContext;
use crate::error::BuildError;

/// How long a child may keep running after its context ended.
pub const GRACE_PERIOD: Duration = Duration::from_secs(15);

/// Runs external commands bound to a [`BuildContext`].
#[derive(Debug, Clone, Copy)]
pub struct ProcessRunner {
  grace: Duration,
}

impl Default for ProcessRunner {
  fn default() -> Self {
    Self { grace: GRACE_PERIOD }
  }
}

impl ProcessRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Use a different grace period. Mostly useful in tests.
  pub fn with_grace_period(grace: Duration) -> Self {
    Self { grace }
  }

  pub fn grace_period(&self) -> Duration {
    self.grace
  }

  /// Run `cmd` with inherited stdio and wait for it to succeed.
  pub async fn run(&self, ctx: &BuildContext, cmd: Command) -> Result<(), BuildError> {
    self.supervise(ctx, cmd, false).await.map(|_| ())
  }

  /// Run `cmd` and return what it wrote to stdout. Stderr is inherited.
  pub async fn output(&self, ctx: &BuildContext, cmd: Command) -> Result<Vec<u8>, BuildError> {
    self.supervise(ctx, cmd, true).await
  }

  async fn supervise(&self, ctx: &BuildContext, mut cmd: Command, capture: bool) -> Result<Vec<u8>, BuildError> {
    let line = command_line(&cmd);
    let timeout = ctx
      .remaining()
      .map(|d| humantime::format_duration(d).to_string())
      .unwrap_or_else(|| "none".to_string());
    info!(%timeout, command = %line, "exec");

    // A context that already ended never starts the process.
    ctx.check()?;

    if capture {
      cmd.stdout(Stdio::piped());
    }
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|error| BuildError::ProcessStart {
      program: cmd.as_std().get_program().to_string_lossy().into_owned(),
      error,
    })?;
    let stdout = child.stdout.take();

    // The wait lives in its own task so it can be raced against the context.
    let (kill_tx, kill_rx) = oneshot::channel::<()>();
    let mut waiter = tokio::spawn(async move {
      tokio::select! {
        res = wait_collect(&mut child, stdout) => res,
        Ok(()) = kill_rx => {
          child.start_kill()?;
          let status = child.wait().await?;
          Ok((status, Vec::new()))
        }
      }
    });

    tokio::select! {
      joined = &mut waiter => {
        let (status, out) = joined.map_err(io::Error::other)??;
        if !status.success() {
          return Err(BuildError::ProcessExecution { command: line, status });
        }
        debug!(command = %line, "exec finished");
        Ok(out)
      }
      cause = ctx.done() => {
        warn!(command = %line, grace = %humantime::format_duration(self.grace), "{cause}; waiting for process to exit");
        if tokio::time::timeout(self.grace, &mut waiter).await.is_err() {
          warn!(command = %line, "grace period elapsed; killing process");
          let _ = kill_tx.send(());
          let _ = waiter.await;
        }
        Err(BuildError::Cancelled(cause))
      }
    }
  }
}

async fn wait_collect(child: &mut Child, stdout: Option<ChildStdout>) -> io::Result<(ExitStatus, Vec<u8>)> {
  let collect = async {
    let mut buf = Vec::new();
    if let Some(mut out) = stdout {
      out.read_to_end(&mut buf).await?;
    }
    Ok::<_, io::Error>(buf)
  };
  let (status, out) = tokio::join!(child.wait(), collect);
  Ok((status?, out?))
}

/// Render a command as a single line for logs and error messages.
pub fn command_line(cmd: &Command) -> String {
  let std = cmd.as_std();
  std::iter::once(std.get_program())
    .chain(std.get_args())
    .map(OsStr::to_string_lossy)
    .collect::<Vec<_>>()
    .join(" ")
}
