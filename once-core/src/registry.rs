//! Instance registry: find the previously registered instance, ask it to
//! stop and record ourselves as the current one.
//!
//! Pure orchestration. All side effects go through the ports, and the
//! caller is expected to hold the instance lock for the whole of
//! [`register`].

use tracing::{debug, warn};

use crate::ports::{RecordStore, Termination, Terminator};
use crate::session::Phase;
use crate::Result;

/// Outcome of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Pid found in the record before we overwrote it.
    pub previous: Option<i32>,
    /// What happened to `previous`; `None` when there was nothing to stop.
    pub termination: Option<Termination>,
}

/// Read the previously registered pid.
///
/// An absent, blank or unusable record means "no previous instance".
/// Non-positive pids are rejected because `kill(2)` gives them group-wide meaning.
pub fn read_previous(store: &dyn RecordStore) -> Result<Option<i32>> {
    let Some(raw) = store.read()? else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<i32>() {
        Ok(pid) if pid > 0 => Ok(Some(pid)),
        Ok(pid) => {
            warn!(pid, "ignoring non-positive pid in instance record");
            Ok(None)
        }
        Err(_) => {
            warn!(record = trimmed, "ignoring unparsable instance record");
            Ok(None)
        }
    }
}

/// Ask `pid` to stop. Does not wait for it to exit.
///
/// A process that is already gone is success; any other failure is fatal.
pub fn terminate_previous(terminator: &dyn Terminator, pid: i32) -> Result<Termination> {
    let outcome = terminator.terminate(pid)?;
    if outcome == Termination::AlreadyGone {
        debug!(pid, "previous instance already exited");
    }
    Ok(outcome)
}

/// Overwrite the record with `pid`.
pub fn write_current(store: &dyn RecordStore, pid: i32) -> Result<()> {
    store.write(pid)?;
    debug!(pid, "registered as current instance");
    Ok(())
}

/// Find the previous instance and ask it to stop, unless it is us.
fn reconcile(
    store: &dyn RecordStore,
    terminator: &dyn Terminator,
    current_pid: i32,
) -> Result<Registration> {
    let previous = read_previous(store)?;
    debug!(?previous, "read instance record");

    let termination = match previous {
        None => None,
        Some(pid) if pid == current_pid => {
            debug!(pid, "instance record already names this process");
            Some(Termination::Skipped)
        }
        Some(pid) => Some(terminate_previous(terminator, pid)?),
    };

    Ok(Registration {
        previous,
        termination,
    })
}

/// Read previous → terminate previous → write current.
///
/// `on_phase` is told when the reconciling and registering steps begin.
pub fn register(
    store: &dyn RecordStore,
    terminator: &dyn Terminator,
    current_pid: i32,
    on_phase: impl Fn(Phase),
) -> Result<Registration> {
    on_phase(Phase::Reconciling);
    let registration = reconcile(store, terminator, current_pid)?;
    on_phase(Phase::Registering);
    write_current(store, current_pid)?;
    Ok(registration)
}
