//! timelog core - shared types for the timeloggerd service
//!
//! This crate holds the pieces of the service that do not touch the
//! operating system: the compile-time configuration, the exit-status table,
//! the error types, and log record rendering.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, or `todo!()`.

pub mod config;
pub mod error;
pub mod record;

// Re-exports for convenience
pub use config::{ServiceConfig, DAEMON_NAME, FILE_MODE_MASK, HEARTBEAT_INTERVAL, WORKING_DIRECTORY};
pub use error::{DaemonizeError, ExitStatus, LifecycleError};
pub use record::{heartbeat_text, LogRecord, Severity, TIMESTAMP_FORMAT};
