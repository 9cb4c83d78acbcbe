use crate::error::ServerError;
use std::io;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{info, warn};

/// Lifecycle events delivered to the accept loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    Reload,
}

/// Owns the process signal streams. SIGHUP is caught so that it no longer
/// terminates the process; it is surfaced as [`Notification::Reload`].
pub struct Supervisor {
    hangup: Option<Signal>,
}

impl Supervisor {
    pub fn install() -> Result<Self, ServerError> {
        let hangup = signal(SignalKind::hangup()).map_err(|source| ServerError::Signal {
            signal: "SIGHUP",
            source,
        })?;

        Ok(Self {
            hangup: Some(hangup),
        })
    }

    /// Resolves on the next notification; pending forever once the signal
    /// stream is gone.
    pub async fn next(&mut self) -> Notification {
        loop {
            match self.hangup.as_mut() {
                Some(hangup) => match hangup.recv().await {
                    Some(()) => return Notification::Reload,
                    None => {
                        warn!("SIGHUP stream closed; reload signals are no longer handled");
                        self.hangup = None;
                    }
                },
                None => std::future::pending::<()>().await,
            }
        }
    }
}

/// Sets SIGHUP to ignored until [`Supervisor::install`] takes it over, so a
/// hangup during startup or detaching doesn't terminate the process.
/// The disposition survives the fork in [`daemonize`].
pub fn ignore_hangup() -> Result<(), ServerError> {
    // SAFETY: SIG_IGN installs no handler code; only the disposition changes.
    let previous = unsafe { libc::signal(libc::SIGHUP, libc::SIG_IGN) };
    if previous == libc::SIG_ERR {
        return Err(ServerError::Signal {
            signal: "SIGHUP",
            source: io::Error::last_os_error(),
        });
    }

    Ok(())
}

/// Re-reading the configuration is not supported yet; the request is only
/// acknowledged.
pub fn reload() {
    info!("reload requested; configuration is not re-read");
}

/// Detaches from the controlling terminal and points stdin, stdout and stderr
/// at `/dev/null`. The working directory is kept.
///
/// Must run before the async runtime starts any threads.
pub fn daemonize() -> Result<(), ServerError> {
    // SAFETY: called from the single-threaded startup path; daemon(3) forks and
    // the parent exits without returning here.
    let result = unsafe { libc::daemon(1, 0) };
    if result < 0 {
        return Err(ServerError::Daemon(io::Error::last_os_error()));
    }

    Ok(())
}
