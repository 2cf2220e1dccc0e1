//! Signal delivery for the lifecycle controller.
//!
//! Nothing runs inside a raw signal handler. tokio turns each delivery into
//! a stream item, and a watcher task forwards it as a `ServiceSignal` over an
//! mpsc channel. The heartbeat loop acts on it between waits.
//!
//! Caught signals:
//! - SIGHUP: reload (no-op)
//! - SIGTERM: graceful shutdown
//! - SIGUSR1, SIGUSR2: logged as unhandled
//!
//! Every other signal keeps its default disposition.

use std::io;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Channel buffer size
const SIGNAL_BUFFER: usize = 16;

/// A signal as seen by the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceSignal {
    /// SIGHUP
    Reload,

    /// SIGTERM
    Terminate,

    /// Any other caught signal, by number
    Unhandled(i32),
}

impl ServiceSignal {
    /// Classifies a raw signal number.
    pub fn from_raw(signo: i32) -> Self {
        match signo {
            libc::SIGHUP => ServiceSignal::Reload,
            libc::SIGTERM => ServiceSignal::Terminate,
            other => ServiceSignal::Unhandled(other),
        }
    }
}

/// Signals the watcher registers for.
pub const CAUGHT_SIGNALS: [i32; 4] = [libc::SIGHUP, libc::SIGTERM, libc::SIGUSR1, libc::SIGUSR2];

/// Registers the signal streams and spawns the watcher task.
///
/// Registration happens before this returns, so a signal sent right after
/// is never lost to the default disposition. The watcher stops when
/// `cancel_token` fires or the receiver is dropped.
///
/// Must be called from inside a tokio runtime.
pub fn spawn_signal_listener(
    cancel_token: CancellationToken,
) -> io::Result<mpsc::Receiver<ServiceSignal>> {
    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut user1 = signal(SignalKind::user_defined1())?;
    let mut user2 = signal(SignalKind::user_defined2())?;

    let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);

    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                biased;

                _ = cancel_token.cancelled() => break,
                Some(()) = terminate.recv() => libc::SIGTERM,
                Some(()) = hangup.recv() => libc::SIGHUP,
                Some(()) = user1.recv() => libc::SIGUSR1,
                Some(()) = user2.recv() => libc::SIGUSR2,
                else => break,
            };

            debug!(signal = received, "signal delivered");
            if tx.send(ServiceSignal::from_raw(received)).await.is_err() {
                debug!("Signal listener stopping: receiver dropped");
                break;
            }
        }
    });

    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(ServiceSignal::from_raw(libc::SIGHUP), ServiceSignal::Reload);
        assert_eq!(ServiceSignal::from_raw(libc::SIGTERM), ServiceSignal::Terminate);
        assert_eq!(
            ServiceSignal::from_raw(libc::SIGUSR1),
            ServiceSignal::Unhandled(libc::SIGUSR1)
        );
    }

    #[test]
    fn test_caught_signals_exclude_uncatchable() {
        assert!(!CAUGHT_SIGNALS.contains(&libc::SIGKILL));
        assert!(!CAUGHT_SIGNALS.contains(&libc::SIGSTOP));
        assert!(CAUGHT_SIGNALS.contains(&libc::SIGTERM));
    }

    #[tokio::test]
    async fn test_listener_stops_on_cancel() {
        let cancel_token = CancellationToken::new();
        let mut rx = spawn_signal_listener(cancel_token.clone()).unwrap();

        cancel_token.cancel();

        assert_eq!(rx.recv().await, None);
    }
}
