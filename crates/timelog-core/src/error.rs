//! Error types and the process exit-status table.
//!
//! Every fatal condition maps onto exactly one `ExitStatus`. The numeric
//! values are part of the external interface and must not change.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

// ============================================================================
// Exit Status
// ============================================================================

/// Process exit statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExitStatus {
    /// Parent exit after a successful fork, or graceful shutdown on SIGTERM
    Success = 0,

    /// The background process could not be created
    ForkFailed = 39,

    /// The child could not become a session leader
    SessionFailed = 40,

    /// The working directory could not be changed to root
    ChdirFailed = 41,

    /// The heartbeat loop ended without a terminate signal
    Unreachable = 42,
}

impl ExitStatus {
    /// Returns the numeric status handed to the OS.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

// ============================================================================
// Daemonize Errors
// ============================================================================

/// Failures of the detach sequence. Each one is fatal.
#[derive(Error, Debug)]
pub enum DaemonizeError {
    /// `fork` failed (usually resource exhaustion)
    #[error("failed to create background process: {0}")]
    Fork(#[source] io::Error),

    /// `setsid` reported failure
    #[error("failed to detach session: {0}")]
    Session(#[source] io::Error),

    /// `chdir` failed
    #[error("failed to change directory to {}: {source}", .path.display())]
    WorkingDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DaemonizeError {
    /// Returns the exit status this failure terminates the process with.
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            DaemonizeError::Fork(_) => ExitStatus::ForkFailed,
            DaemonizeError::Session(_) => ExitStatus::SessionFailed,
            DaemonizeError::WorkingDirectory { .. } => ExitStatus::ChdirFailed,
        }
    }
}

// ============================================================================
// Lifecycle Errors
// ============================================================================

/// Ways the steady-state loop can end without a terminate signal.
///
/// None of these happen in a healthy process; all of them exit with
/// `ExitStatus::Unreachable`.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The signal source went away, so no terminate can ever arrive
    #[error("signal stream closed while the heartbeat loop was running")]
    SignalStreamClosed,

    /// Registering a signal stream failed
    #[error("failed to install signal handlers: {0}")]
    SignalInstall(#[source] io::Error),

    /// The async runtime could not be built
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] io::Error),
}

impl LifecycleError {
    /// Returns the exit status this failure terminates the process with.
    pub fn exit_status(&self) -> ExitStatus {
        ExitStatus::Unreachable
    }
}

// ============================================================================
// Tests
// ============================================================================
