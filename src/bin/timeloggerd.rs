//! timeloggerd - writes the local time to syslog once per second
//!
//! # Usage
//!
//! ```bash
//! # Start; the shell gets its prompt back once the daemon has forked
//! timeloggerd
//!
//! # Watch the heartbeat
//! journalctl -t timeloggerd -f
//!
//! # Stop
//! pkill -TERM timeloggerd
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM: log "received SIGTERM, exiting." and exit 0
//! - SIGHUP: ignored (reserved for configuration reload)
//! - SIGUSR1/SIGUSR2: log "received unhandled signal." and keep running
//!
//! # Exit Statuses
//!
//! 39 fork failed, 40 setsid failed, 41 chdir failed, 42 heartbeat loop ended
//! without SIGTERM.

use std::process::ExitCode;

fn main() -> ExitCode {
    timeloggerd::run()
}
