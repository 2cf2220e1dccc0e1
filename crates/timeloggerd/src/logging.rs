//! The logging collaborator.
//!
//! Code in this crate logs through the `tracing` macros. `ChannelLayer`
//! bridges those events onto a `LogChannel`, which is the actual transport:
//!
//! ```text
//! info!/error! ──▶ tracing Registry ──▶ ChannelLayer ──▶ LogChannel
//!                                                        ├─ SyslogChannel (production)
//!                                                        └─ MemoryChannel (tests)
//! ```
//!
//! Only INFO, WARN and ERROR events reach the channel. WARN is written at
//! error severity since the transport only knows two severities.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - A poisoned `MemoryChannel` lock is recovered, not propagated

use std::ffi::CString;
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::field::{Field, Visit};
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use timelog_core::{LogRecord, Severity};

// ============================================================================
// Channel Trait
// ============================================================================

/// A log transport: emit records, then release it once.
pub trait LogChannel: Send + Sync + 'static {
    /// Writes one record.
    fn emit(&self, record: &LogRecord);

    /// Releases the channel. Calling it more than once has no further effect.
    fn close(&self);
}

// ============================================================================
// Syslog
// ============================================================================

/// System log channel opened with the daemon facility.
pub struct SyslogChannel {
    // openlog keeps the pointer, so the string must outlive every syslog call
    #[allow(dead_code)]
    ident: CString,
    closed: AtomicBool,
}

impl SyslogChannel {
    /// Opens the channel right away (`LOG_NDELAY`), tagging records with the
    /// pid (`LOG_PID`).
    pub fn open(ident: &str) -> Self {
        let ident = CString::new(ident.replace('\0', "")).unwrap_or_default();
        // SAFETY: `ident` is NUL-terminated and owned by the returned value,
        // which keeps it alive while the channel is in use.
        unsafe {
            libc::openlog(
                ident.as_ptr(),
                libc::LOG_PID | libc::LOG_NDELAY | libc::LOG_NOWAIT,
                libc::LOG_DAEMON,
            );
        }
        Self {
            ident,
            closed: AtomicBool::new(false),
        }
    }
}

impl LogChannel for SyslogChannel {
    fn emit(&self, record: &LogRecord) {
        let priority = match record.severity {
            Severity::Info => libc::LOG_INFO,
            Severity::Error => libc::LOG_ERR,
        };
        let Ok(text) = CString::new(record.render().replace('\0', "")) else {
            return;
        };
        // SAFETY: both pointers are valid NUL-terminated strings and the
        // "%s" format consumes exactly one string argument.
        unsafe {
            libc::syslog(priority, c"%s".as_ptr(), text.as_ptr());
        }
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            // SAFETY: closelog has no preconditions.
            unsafe { libc::closelog() };
        }
    }
}

// ============================================================================
// In-Memory Channel
// ============================================================================

/// Everything observed by a `MemoryChannel`, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Record(LogRecord),
    Closed,
}

/// Channel that keeps records in memory. Used to observe the service in tests.
#[derive(Debug, Default)]
pub struct MemoryChannel {
    events: Mutex<Vec<ChannelEvent>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record and close event, in emission order.
    pub fn events(&self) -> Vec<ChannelEvent> {
        self.lock().clone()
    }

    /// Only the records.
    pub fn records(&self) -> Vec<LogRecord> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                ChannelEvent::Record(record) => Some(record.clone()),
                ChannelEvent::Closed => None,
            })
            .collect()
    }

    /// Messages of the records, without the severity.
    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.message).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().contains(&ChannelEvent::Closed)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ChannelEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogChannel for MemoryChannel {
    fn emit(&self, record: &LogRecord) {
        self.lock().push(ChannelEvent::Record(record.clone()));
    }

    fn close(&self) {
        let mut events = self.lock();
        if !events.contains(&ChannelEvent::Closed) {
            events.push(ChannelEvent::Closed);
        }
    }
}

// ============================================================================
// Tracing Bridge
// ============================================================================

/// `tracing_subscriber` layer that forwards events to a `LogChannel`.
pub struct ChannelLayer<C> {
    channel: Arc<C>,
}

impl<C: LogChannel> ChannelLayer<C> {
    pub fn new(channel: Arc<C>) -> Self {
        Self { channel }
    }
}

impl<S, C> Layer<S> for ChannelLayer<C>
where
    S: Subscriber,
    C: LogChannel,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        severity_for(metadata.level()).is_some()
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let Some(severity) = severity_for(event.metadata().level()) else {
            return;
        };
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.channel.emit(&LogRecord::new(severity, visitor.finish()));
    }
}

/// Maps a tracing level onto a channel severity. Below INFO is dropped.
fn severity_for(level: &Level) -> Option<Severity> {
    if *level == Level::ERROR || *level == Level::WARN {
        Some(Severity::Error)
    } else if *level == Level::INFO {
        Some(Severity::Info)
    } else {
        None
    }
}

/// Collects the `message` field, appending any other field as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(mut self) -> String {
        self.message.push_str(&self.fields);
        self.message
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

// ============================================================================
// Installation
// ============================================================================

/// Builds a subscriber that writes to `channel`.
pub fn subscriber<C: LogChannel>(channel: Arc<C>) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry().with(ChannelLayer::new(channel))
}

/// Installs the channel as the process-wide subscriber.
///
/// Must run before the fork so both the parent and the daemon share it.
pub fn install<C: LogChannel>(channel: Arc<C>) -> Result<(), SetGlobalDefaultError> {
    tracing::subscriber::set_global_default(subscriber(channel))
}

// ============================================================================
// Tests
// ============================================================================
