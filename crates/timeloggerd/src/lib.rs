//! timeloggerd - daemonizer and heartbeat supervisor
//!
//! This crate provides the pieces of the timeloggerd service:
//! - `daemonize` - the fork / setsid / close / umask / chdir sequence
//! - `lifecycle` - the once-per-second heartbeat loop and its signal handling
//! - `signals` - turning OS signal deliveries into channel messages
//! - `logging` - the tracing bridge onto syslog (or memory, in tests)
//! - `service` - the process-wide context and the binary entry point
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    timeloggerd                       │
//! ├──────────────────────────────────────────────────────┤
//! │                                                      │
//! │  ┌────────────┐   detached   ┌────────────────────┐  │
//! │  │ Daemonizer │─────────────▶│LifecycleController │  │
//! │  └─────┬──────┘              └──────┬────────▲────┘  │
//! │        │ info!/error!               │ info!  │       │
//! │        ▼                            ▼        │       │
//! │  ┌──────────────────────────────────────┐  mpsc      │
//! │  │ ChannelLayer ──▶ SyslogChannel       │    │       │
//! │  └──────────────────────────────────────┘ signal     │
//! │                                          listener    │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()` in
//! production code. Every fatal condition becomes an `ExitStatus`.

pub mod daemonize;
pub mod lifecycle;
pub mod logging;
pub mod service;
pub mod signals;

pub use daemonize::{Daemonizer, Detachment, ProcessControl, ProcessIdentity, SystemProcess};
pub use lifecycle::{Clock, LifecycleController, Shutdown, SystemClock};
pub use logging::{ChannelEvent, ChannelLayer, LogChannel, MemoryChannel, SyslogChannel};
pub use service::{run, Service};
pub use signals::{spawn_signal_listener, ServiceSignal, CAUGHT_SIGNALS};
