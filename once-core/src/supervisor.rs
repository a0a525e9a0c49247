//! Process supervisor: run one command as the leader of its own process
//! group and forward interrupt/terminate requests to the whole group.
//!
//! The child gets a fresh process group so that a `SIGTERM` sent to
//! `-pid` reaches it and every process it forks, while the supervisor's
//! own group is left alone. Ctrl-C from the terminal therefore only hits
//! the supervisor, which decides what the group receives.
//!
//! The listener runs on its own thread while the main thread waits. Waiting
//! happens in two steps: first for the exit without reaping it, then, after
//! the forwarder has been told the group is finished, the actual reap. Until
//! the reap the pid cannot be recycled, so a late signal never reaches an
//! unrelated process.

use std::io;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{debug, info, warn};

use crate::signal::{signal_group, TERMINATION_SIGNAL};
use crate::{Error, Result};

/// Signals directed at the supervisor that trigger forwarding.
pub const FORWARDED_SIGNALS: [libc::c_int; 2] = [SIGINT, SIGTERM];

/// Terminal outcome of the supervised command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    /// Exited normally with this code.
    Code(i32),
    /// Killed by this signal.
    Signaled(i32),
}

impl ChildExit {
    pub fn from_status(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => ChildExit::Code(code),
            (None, Some(signal)) => ChildExit::Signaled(signal),
            (None, None) => ChildExit::Code(1),
        }
    }

    /// Exit code for the supervisor itself: the child's code, or the shell
    /// convention `128 + signo` for a signal death.
    pub fn exit_code(self) -> i32 {
        match self {
            ChildExit::Code(code) => code,
            ChildExit::Signaled(signal) => 128 + signal,
        }
    }

    pub fn success(self) -> bool {
        self == ChildExit::Code(0)
    }
}

/// Where the child's stdout and stderr go.
#[derive(Debug)]
pub struct OutputSinks {
    pub stdout: Stdio,
    pub stderr: Stdio,
}

impl OutputSinks {
    pub fn new(stdout: impl Into<Stdio>, stderr: impl Into<Stdio>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Share the supervisor's own stdout/stderr with the child.
    pub fn inherit() -> Self {
        Self::new(Stdio::inherit(), Stdio::inherit())
    }
}

/// The spawned command. Its pid doubles as its process-group id.
#[derive(Debug)]
pub struct SupervisedChild {
    child: Child,
    command: String,
}

impl SupervisedChild {
    pub fn pid(&self) -> i32 {
        self.child.id() as i32
    }

    pub fn pgid(&self) -> i32 {
        self.pid()
    }

    /// Block until the child has exited, leaving it unreaped.
    fn wait_exited(&self) -> Result<()> {
        loop {
            let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
            let rc = unsafe {
                libc::waitid(
                    libc::P_PID,
                    self.pid() as libc::id_t,
                    &mut info,
                    libc::WEXITED | libc::WNOWAIT,
                )
            };
            if rc == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(self.wait_error(err));
        }
    }

    /// Reap the child and report how it ended.
    pub fn wait(mut self) -> Result<ChildExit> {
        let status = self.child.wait().map_err(|e| self.wait_error(e))?;
        Ok(ChildExit::from_status(status))
    }

    fn wait_error(&self, source: io::Error) -> Error {
        Error::Wait {
            command: self.command.clone(),
            source,
        }
    }
}

/// Result of handling one interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarded {
    /// SIGTERM was sent to the group.
    Sent,
    /// The group was already gone when we tried.
    GroupGone,
    /// `kill(2)` failed for another reason, such as EPERM.
    Failed,
    /// A signal was already forwarded during this run.
    Duplicate,
    /// The child has exited; nothing is sent any more.
    Finished,
}

#[derive(Debug)]
enum GroupState {
    Running { pgid: i32, forwarded: bool },
    Finished,
}

/// Forwards at most one termination signal to a process group.
#[derive(Debug)]
pub struct GroupForwarder {
    state: Mutex<GroupState>,
}

impl GroupForwarder {
    pub fn new(pgid: i32) -> Self {
        Self {
            state: Mutex::new(GroupState::Running {
                pgid,
                forwarded: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, GroupState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// React to `signal` received by the supervisor.
    pub fn on_signal(&self, signal: libc::c_int) -> Forwarded {
        let mut state = self.state();
        let GroupState::Running { pgid, forwarded } = &mut *state else {
            return Forwarded::Finished;
        };
        if *forwarded {
            debug!(signal, "termination already forwarded, ignoring");
            return Forwarded::Duplicate;
        }
        *forwarded = true;

        info!(signal, pgid = *pgid, "forwarding SIGTERM to process group");
        forward_outcome(*pgid, signal_group(*pgid, TERMINATION_SIGNAL))
    }

    /// Mark the child as exited. Later signals are not forwarded.
    pub fn finish(&self) {
        *self.state() = GroupState::Finished;
    }
}

fn forward_outcome(pgid: i32, sent: io::Result<bool>) -> Forwarded {
    match sent {
        Ok(true) => Forwarded::Sent,
        Ok(false) => {
            warn!(pgid, "process group already gone");
            Forwarded::GroupGone
        }
        Err(e) => {
            warn!(pgid, error = %e, "failed to signal process group");
            Forwarded::Failed
        }
    }
}

/// Owns the interrupt listener and the one child of this invocation.
pub struct ProcessSupervisor {
    signals: Signals,
}

impl ProcessSupervisor {
    /// Start listening for SIGINT/SIGTERM. From here on those signals no
    /// longer terminate the supervisor; they are queued for forwarding.
    pub fn install() -> Result<Self> {
        let signals = Signals::new(FORWARDED_SIGNALS).map_err(Error::Signals)?;
        Ok(Self { signals })
    }

    /// Launch `command` with `args` verbatim as leader of a new process group.
    pub fn spawn(
        &self,
        command: &str,
        args: &[String],
        sinks: OutputSinks,
    ) -> Result<SupervisedChild> {
        let child = Command::new(command)
            .args(args)
            .stdout(sinks.stdout)
            .stderr(sinks.stderr)
            .process_group(0)
            .spawn()
            .map_err(|source| Error::Spawn {
                command: command.to_string(),
                source,
            })?;
        debug!(command, pid = child.id(), "spawned supervised child");
        Ok(SupervisedChild {
            child,
            command: command.to_string(),
        })
    }

    /// Spawn the command and supervise it to completion.
    ///
    /// Blocks until the child exits. There is no deadline after forwarding:
    /// a child that ignores SIGTERM keeps the supervisor waiting.
    pub fn run(self, command: &str, args: &[String], sinks: OutputSinks) -> Result<ChildExit> {
        let child = self.spawn(command, args, sinks)?;
        let forwarder = Arc::new(GroupForwarder::new(child.pgid()));

        let handle = self.signals.handle();
        let mut signals = self.signals;
        let listener = {
            let forwarder = Arc::clone(&forwarder);
            thread::spawn(move || {
                for signal in signals.forever() {
                    forwarder.on_signal(signal);
                }
            })
        };

        let exited = child.wait_exited();
        forwarder.finish();
        handle.close();
        let _ = listener.join();
        exited?;

        let exit = child.wait()?;
        debug!(command, ?exit, "supervised child exited");
        Ok(exit)
    }
}
