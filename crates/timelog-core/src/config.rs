//! Compile-time configuration.
//!
//! The service reads no flags, files, or environment variables. Everything it
//! needs is fixed here; `ServiceConfig` only exists so tests can swap values.

use std::path::PathBuf;
use std::time::Duration;

/// Identity used for the syslog channel and the startup record.
pub const DAEMON_NAME: &str = "timeloggerd";

/// Time between two heartbeat records.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Directory the daemon moves into after detaching.
pub const WORKING_DIRECTORY: &str = "/";

/// File-creation mask applied after detaching.
///
/// Leaves `rw-r--r--` as the default mode for new files.
pub const FILE_MODE_MASK: u32 = 0o133;

/// Process-wide settings shared by the daemonizer and the lifecycle controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Syslog identity
    pub ident: String,

    /// Target of the post-detach `chdir`
    pub working_directory: PathBuf,

    /// Value passed to `umask`
    pub file_mode_mask: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ident: DAEMON_NAME.to_string(),
            working_directory: PathBuf::from(WORKING_DIRECTORY),
            file_mode_mask: FILE_MODE_MASK,
        }
    }
}
