//! Graceful shutdown for the downloader child with SIGTERM → SIGKILL escalation.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;

#[cfg(unix)]
use tokio::time::timeout;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Gracefully shut down a child process, escalating to a forced kill.
///
/// # Strategy
/// 1. Send SIGTERM and wait up to `grace` for a voluntary exit
/// 2. If still running, send SIGKILL
/// 3. Wait for process reaping (required to avoid zombies)
///
/// # Platform behavior
/// - Unix: SIGTERM via the nix crate, then SIGKILL via `.kill()`
/// - Windows: immediately calls `.kill()` (no graceful shutdown available)
pub(crate) async fn shutdown_child(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        shutdown_unix(child, grace).await
    }

    #[cfg(not(unix))]
    {
        let _ = grace;
        shutdown_forced(child).await
    }
}

#[cfg(unix)]
async fn shutdown_unix(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    let Some(pid) = child.id() else {
        // Already reaped
        return child.wait().await;
    };

    // Phase 1: SIGTERM with bounded grace period
    #[allow(clippy::cast_possible_wrap)]
    if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        // Process may have already exited
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = timeout(grace, child.wait()).await {
        return result;
    }

    // Phase 2 + 3: SIGKILL, then reap
    shutdown_forced(child).await
}

async fn shutdown_forced(child: &mut Child) -> io::Result<ExitStatus> {
    child.kill().await?;
    child.wait().await
}
