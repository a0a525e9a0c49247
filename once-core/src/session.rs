//! One invocation of `once`, from taking the lock to the child's exit.
//!
//! ```text
//! Idle → Locking → Reconciling → Registering → Unlocked → Running → [Signaled → Terminating] → Exited
//! ```
//!
//! A failure before `Running` aborts the invocation without spawning
//! anything. `Signaled`/`Terminating` are driven by the supervisor's
//! listener thread.

use std::fmt;

use tracing::debug;

use crate::config::OnceConfig;
use crate::lock::InstanceLock;
use crate::ports::{RecordStore, Terminator};
use crate::record::FileRecordStore;
use crate::registry::{self, Registration};
use crate::signal::SignalTerminator;
use crate::supervisor::{ChildExit, OutputSinks, ProcessSupervisor};
use crate::Result;

/// The command to supervise and its untouched argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

/// Lifecycle phase of the calling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Locking,
    Reconciling,
    Registering,
    Unlocked,
    Running,
    Exited,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Locking => "locking",
            Phase::Reconciling => "reconciling",
            Phase::Registering => "registering",
            Phase::Unlocked => "unlocked",
            Phase::Running => "running",
            Phase::Exited => "exited",
        };
        f.write_str(s)
    }
}

fn enter(phase: Phase) {
    debug!(%phase, "phase");
}

/// A registration that still holds the instance lock.
#[derive(Debug)]
pub struct Claim {
    lock: InstanceLock,
    registration: Registration,
}

impl Claim {
    /// Drop the instance lock; the registration stays in place.
    pub fn release(self) -> Result<Registration> {
        self.lock.release()?;
        enter(Phase::Unlocked);
        Ok(self.registration)
    }
}

/// Take the lock and replace the previous instance with `current_pid`.
///
/// The lock stays held until [`Claim::release`]; dropping the claim on an
/// error path unlocks as well.
pub fn claim(
    config: &OnceConfig,
    store: &dyn RecordStore,
    terminator: &dyn Terminator,
    current_pid: i32,
) -> Result<Claim> {
    enter(Phase::Locking);
    let lock = InstanceLock::acquire(&config.lock_path())?;

    let registration = registry::register(store, terminator, current_pid, enter)?;

    Ok(Claim { lock, registration })
}

/// Run one full invocation and return how the child ended.
pub fn run(config: &OnceConfig, invocation: &Invocation) -> Result<ChildExit> {
    let store = FileRecordStore::new(&config.pid_path());
    let claimed = claim(config, &store, &SignalTerminator, std::process::id() as i32)?;

    // A successor can only read our pid once the lock is gone, so listening
    // first means its SIGTERM is always forwarded rather than fatal.
    let supervisor = ProcessSupervisor::install()?;
    let registration = claimed.release()?;
    debug!(
        previous = ?registration.previous,
        termination = ?registration.termination,
        "instance registered"
    );

    enter(Phase::Running);
    let exit = supervisor.run(
        &invocation.command,
        &invocation.args,
        OutputSinks::inherit(),
    )?;
    enter(Phase::Exited);
    Ok(exit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Termination;
    use crate::record::MemoryRecordStore;
    use crate::Error;
    use fs2::FileExt;
    use std::fs::{self, OpenOptions};
    use tempfile::TempDir;

    /// Checks, at the moment it is asked to terminate, that the lock is held.
    struct LockAsserting {
        lock_path: std::path::PathBuf,
    }

    impl Terminator for LockAsserting {
        fn terminate(&self, _pid: i32) -> Result<Termination> {
            let other = OpenOptions::new().write(true).open(&self.lock_path).unwrap();
            assert!(
                other.try_lock_exclusive().is_err(),
                "registration must run under the instance lock"
            );
            Ok(Termination::AlreadyGone)
        }
    }

    #[test]
    fn claim_registers_under_lock_and_releases() {
        let dir = TempDir::new().unwrap();
        let config = OnceConfig::with_state_dir(dir.path());
        let store = MemoryRecordStore::with_content("123456");
        let terminator = LockAsserting {
            lock_path: config.lock_path(),
        };

        let reg = claim(&config, &store, &terminator, 777)
            .unwrap()
            .release()
            .unwrap();

        assert_eq!(reg.previous, Some(123456));
        assert_eq!(reg.termination, Some(Termination::AlreadyGone));
        assert_eq!(store.content().as_deref(), Some("777"));

        // Released: anyone can take it now.
        let after = OpenOptions::new().write(true).open(config.lock_path()).unwrap();
        after.try_lock_exclusive().unwrap();
    }

    #[test]
    fn claim_holds_lock_until_released() {
        let dir = TempDir::new().unwrap();
        let config = OnceConfig::with_state_dir(dir.path());
        let store = MemoryRecordStore::new();

        let held = claim(&config, &store, &SignalTerminator, 777).unwrap();
        assert_eq!(store.content().as_deref(), Some("777"));
        let other = OpenOptions::new().write(true).open(config.lock_path()).unwrap();
        assert!(other.try_lock_exclusive().is_err());

        drop(held);
        other.try_lock_exclusive().unwrap();
    }

    #[test]
    fn claim_without_state_dir_is_lock_error() {
        let dir = TempDir::new().unwrap();
        let config = OnceConfig::with_state_dir(&dir.path().join("missing"));
        let store = MemoryRecordStore::new();

        let err = claim(&config, &store, &SignalTerminator, 1).unwrap_err();
        assert!(matches!(err, Error::Lock { .. }), "got {err:?}");
        assert_eq!(store.content(), None);
    }

    #[test]
    fn run_first_time_writes_own_pid_and_mirrors_exit() {
        let dir = TempDir::new().unwrap();
        let config = OnceConfig::with_state_dir(dir.path());
        let invocation = Invocation::new("sh", vec!["-c".into(), "exit 5".into()]);

        let exit = run(&config, &invocation).unwrap();

        assert_eq!(exit, ChildExit::Code(5));
        assert_eq!(
            fs::read_to_string(config.pid_path()).unwrap(),
            std::process::id().to_string()
        );
    }
}
