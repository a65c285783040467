//! Interrupt handling.

use tracing::info;
use xbuild_lib::CancelHandle;

/// Cancel `handle` on the first interrupt. Must be called from inside a
/// Tokio runtime.
pub fn trap_signals(handle: CancelHandle) {
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() && handle.cancel() {
      info!("SIGINT: shutting down");
    }
  });
}
