//! Process-scoped service context and the binary entry point.
//!
//! `Service` owns what the whole process shares: the configuration and the
//! log channel. It hands the configuration to the daemonizer, then runs the
//! lifecycle controller and releases the channel on the graceful path.
//!
//! ```text
//! run()
//!  ├─ SyslogChannel::open + logging::install
//!  ├─ Service::detach ──▶ parent: exit 0 │ failure: exit 39/40/41
//!  └─ daemon: current-thread runtime
//!       ├─ spawn_signal_listener
//!       └─ Service::supervise ──▶ SIGTERM: close channel, exit 0
//!                                 loop ended otherwise: exit 42
//! ```
//!
//! The runtime is only built after the fork: forking a process that already
//! has runtime threads would leave the child with a broken copy.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use timelog_core::{DaemonizeError, ExitStatus, LifecycleError, ServiceConfig};

use crate::daemonize::{Daemonizer, Detachment, ProcessControl, SystemProcess};
use crate::lifecycle::{Clock, LifecycleController};
use crate::logging::{self, LogChannel, SyslogChannel};
use crate::signals::{spawn_signal_listener, ServiceSignal};

/// Process-wide context shared by the daemonizer and the lifecycle controller.
pub struct Service<C> {
    config: ServiceConfig,
    channel: Arc<C>,
}

impl<C: LogChannel> Service<C> {
    pub fn new(config: ServiceConfig, channel: Arc<C>) -> Self {
        Self { config, channel }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn channel(&self) -> &Arc<C> {
        &self.channel
    }

    /// Runs the detach sequence against `process`.
    pub fn detach<P: ProcessControl>(
        &self,
        process: &mut P,
    ) -> Result<Detachment, DaemonizeError> {
        Daemonizer::new(&self.config).detach(process)
    }

    /// Runs the heartbeat until it ends and returns the exit status.
    ///
    /// On shutdown the channel is closed after the final record.
    pub async fn supervise<K: Clock>(
        &self,
        controller: &LifecycleController<K>,
        signals: &mut mpsc::Receiver<ServiceSignal>,
    ) -> ExitStatus {
        match controller.run(signals).await {
            Ok(_) => {
                self.channel.close();
                ExitStatus::Success
            }
            Err(e) => {
                error!("{e}");
                e.exit_status()
            }
        }
    }

    /// Detaches through `process` and maps the outcome onto an exit status.
    ///
    /// The parent side exits 0 and a failed step exits with that step's
    /// status. On the daemon side `daemon` runs, and an error from it is
    /// logged and exits 42.
    pub fn start<P, F>(&self, process: &mut P, daemon: F) -> ExitStatus
    where
        P: ProcessControl,
        F: FnOnce(&Self) -> anyhow::Result<ExitStatus>,
    {
        match self.detach(process) {
            Ok(Detachment::Parent { .. }) => ExitStatus::Success,
            Ok(Detachment::Daemon(_)) => daemon(self).unwrap_or_else(|e| {
                error!("{e:#}");
                ExitStatus::Unreachable
            }),
            Err(e) => e.exit_status(),
        }
    }

    /// Builds the runtime, installs signal handling and supervises.
    fn run_daemon(&self) -> anyhow::Result<ExitStatus> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(LifecycleError::Runtime)
            .context("Failed to start heartbeat runtime")?;

        runtime.block_on(async {
            let cancel_token = CancellationToken::new();
            let mut signals = spawn_signal_listener(cancel_token.clone())
                .map_err(LifecycleError::SignalInstall)
                .context("Failed to install signal handlers")?;

            let status = self
                .supervise(&LifecycleController::new(), &mut signals)
                .await;

            cancel_token.cancel();
            Ok::<_, anyhow::Error>(status)
        })
    }
}

/// Entry point of the `timeloggerd` binary.
pub fn run() -> ExitCode {
    let config = ServiceConfig::default();
    let channel = Arc::new(SyslogChannel::open(&config.ident));
    // Only fails if a subscriber is already set, in which case events go there.
    let _ = logging::install(channel.clone());

    Service::new(config, channel)
        .start(&mut SystemProcess, Service::run_daemon)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryChannel;

    #[test]
    fn test_service_exposes_context() {
        let channel = Arc::new(MemoryChannel::new());
        let service = Service::new(ServiceConfig::default(), channel.clone());

        assert_eq!(service.config().ident, "timeloggerd");
        assert!(Arc::ptr_eq(service.channel(), &channel));
    }

    #[tokio::test]
    async fn test_supervise_maps_closed_stream_to_42() {
        let channel = Arc::new(MemoryChannel::new());
        let service = Service::new(ServiceConfig::default(), channel.clone());
        let (tx, mut rx) = mpsc::channel(1);
        drop(tx);

        let status = service.supervise(&LifecycleController::new(), &mut rx).await;

        assert_eq!(status, ExitStatus::Unreachable);
        assert!(!channel.is_closed());
    }
}
