//! Detaching the process from its terminal.
//!
//! The sequence is the classic one for long-running services:
//!
//! 1. `fork` - the parent exits so the invoking shell gets its prompt back
//! 2. `setsid` - the child becomes a session leader with no controlling tty
//! 3. close stdin, stdout and stderr
//! 4. `umask` - new files default to `rw-r--r--`
//! 5. `chdir("/")` - do not keep any mount point busy
//!
//! Steps 1, 2 and 5 can fail. Each failure is logged once with the system
//! error description and returned as a `DaemonizeError`, whose exit status
//! the caller terminates with. Nothing after a failed step runs.
//!
//! The OS calls sit behind `ProcessControl` so the sequencing can be driven
//! by a scripted fake.
//!
//! Descriptors 0, 1 and 2 are closed, not reopened on `/dev/null`, and the
//! runtime built afterwards reuses those numbers. After detaching nothing may
//! write to stdout or stderr: no `println!`, no `eprintln!`, no fmt layer.
//! All output goes through the log channel.

use std::io;
use std::os::fd::RawFd;
use std::path::Path;

use nix::errno::Errno;
use nix::sys::stat::{umask, Mode};
use nix::unistd::{self, ForkResult, Pid};
use tracing::{debug, error, info};

use timelog_core::{DaemonizeError, ServiceConfig};

/// File descriptors severed after the session is detached.
const STANDARD_STREAMS: [RawFd; 3] = [
    libc::STDIN_FILENO,
    libc::STDOUT_FILENO,
    libc::STDERR_FILENO,
];

// ============================================================================
// OS Seam
// ============================================================================

/// The process-level operations the detach sequence needs.
pub trait ProcessControl {
    /// Splits the process in two.
    fn fork(&mut self) -> nix::Result<ForkResult>;

    /// Starts a new session with the caller as leader. Returns the session id.
    fn create_session(&mut self) -> nix::Result<Pid>;

    /// Pid of the calling process.
    fn current_pid(&self) -> Pid;

    /// Closes stdin, stdout and stderr.
    fn close_standard_streams(&mut self);

    /// Sets the file-creation mask, returning the previous one.
    fn set_file_mode_mask(&mut self, mask: Mode) -> Mode;

    /// Changes the working directory.
    fn change_directory(&mut self, path: &Path) -> nix::Result<()>;
}

/// `ProcessControl` backed by the real system calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcess;

impl ProcessControl for SystemProcess {
    fn fork(&mut self) -> nix::Result<ForkResult> {
        // SAFETY: called before the async runtime or any other thread is
        // started, so the child is a copy of a single-threaded process and
        // may keep running arbitrary code.
        unsafe { unistd::fork() }
    }

    fn create_session(&mut self) -> nix::Result<Pid> {
        unistd::setsid()
    }

    fn current_pid(&self) -> Pid {
        unistd::getpid()
    }

    fn close_standard_streams(&mut self) {
        for fd in STANDARD_STREAMS {
            // EBADF just means the stream was never open
            let _ = unistd::close(fd);
        }
    }

    fn set_file_mode_mask(&mut self, mask: Mode) -> Mode {
        umask(mask)
    }

    fn change_directory(&mut self, path: &Path) -> nix::Result<()> {
        unistd::chdir(path)
    }
}

// ============================================================================
// Daemonizer
// ============================================================================

/// Pid and session of the detached daemon. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub pid: Pid,
    pub session: Pid,
}

/// Which side of the fork the caller ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detachment {
    /// The original process. It should exit with status 0.
    Parent { child: Pid },

    /// The detached child, ready to run the heartbeat loop.
    Daemon(ProcessIdentity),
}

/// Runs the detach sequence.
pub struct Daemonizer<'a> {
    config: &'a ServiceConfig,
}

impl<'a> Daemonizer<'a> {
    pub fn new(config: &'a ServiceConfig) -> Self {
        Self { config }
    }

    /// Detaches the calling process.
    ///
    /// Logs one "starting" record, then walks the sequence. On the parent
    /// side it returns right after the fork.
    pub fn detach<P: ProcessControl>(
        &self,
        process: &mut P,
    ) -> Result<Detachment, DaemonizeError> {
        info!("starting {}", self.config.ident);

        match process.fork() {
            Ok(ForkResult::Parent { child }) => {
                debug!(child = child.as_raw(), "forked daemon, parent exiting");
                return Ok(Detachment::Parent { child });
            }
            Ok(ForkResult::Child) => {}
            Err(errno) => return Err(DaemonizeError::Fork(report(errno))),
        }

        // nix turns the -1 sentinel into Err, so this is the real failure check
        let session = process
            .create_session()
            .map_err(|errno| DaemonizeError::Session(report(errno)))?;

        process.close_standard_streams();

        let mask = Mode::from_bits_truncate(self.config.file_mode_mask as libc::mode_t);
        process.set_file_mode_mask(mask);

        let path = &self.config.working_directory;
        process
            .change_directory(path)
            .map_err(|errno| DaemonizeError::WorkingDirectory {
                path: path.clone(),
                source: report(errno),
            })?;

        let identity = ProcessIdentity {
            pid: process.current_pid(),
            session,
        };
        debug!(
            pid = identity.pid.as_raw(),
            session = identity.session.as_raw(),
            "detached"
        );
        Ok(Detachment::Daemon(identity))
    }
}

/// Logs the system error description and converts it for the error chain.
fn report(errno: Errno) -> io::Error {
    error!("{}", errno.desc());
    io::Error::from(errno)
}

// ============================================================================
// Tests
// ============================================================================
