//! The heartbeat loop and its signal handling.
//!
//! One INFO record with the local time is written per interval. Between
//! records the loop waits on two things at once: the interval timer and the
//! signal channel.
//!
//! - `Reload` is acknowledged silently and the same wait resumes, so the
//!   cadence does not shift.
//! - `Unhandled` logs "received unhandled signal." and the wait resumes.
//! - `Terminate` logs "received SIGTERM, exiting." and returns `Shutdown`.
//!
//! The loop has no other way out. If the signal channel closes, no terminate
//! can ever arrive and `LifecycleError::SignalStreamClosed` is returned.

use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info};

use timelog_core::{heartbeat_text, LifecycleError, HEARTBEAT_INTERVAL};

use crate::signals::ServiceSignal;

/// Source of wall-clock time for the heartbeat.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// The system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Proof that the loop ended through the terminate path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shutdown;

/// What the loop does in response to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Continue,
    Exit,
}

/// Runs the heartbeat until a terminate signal arrives.
pub struct LifecycleController<K = SystemClock> {
    clock: K,
    interval: Duration,
}

impl LifecycleController<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for LifecycleController<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clock> LifecycleController<K> {
    pub fn with_clock(clock: K) -> Self {
        Self {
            clock,
            interval: HEARTBEAT_INTERVAL,
        }
    }

    /// Runs the loop.
    pub async fn run(
        &self,
        signals: &mut mpsc::Receiver<ServiceSignal>,
    ) -> Result<Shutdown, LifecycleError> {
        loop {
            info!("{}", heartbeat_text(&self.clock.now()));

            let pause = sleep(self.interval);
            tokio::pin!(pause);

            loop {
                tokio::select! {
                    biased;

                    received = signals.recv() => {
                        let Some(signal) = received else {
                            return Err(LifecycleError::SignalStreamClosed);
                        };
                        if handle_signal(signal) == Disposition::Exit {
                            return Ok(Shutdown);
                        }
                    }

                    () = &mut pause => break,
                }
            }
        }
    }
}

fn handle_signal(signal: ServiceSignal) -> Disposition {
    match signal {
        ServiceSignal::Reload => {
            debug!("received SIGHUP");
            Disposition::Continue
        }
        ServiceSignal::Terminate => {
            info!("received SIGTERM, exiting.");
            Disposition::Exit
        }
        ServiceSignal::Unhandled(signo) => {
            debug!(signal = signo, "ignoring signal");
            info!("received unhandled signal.");
            Disposition::Continue
        }
    }
}
