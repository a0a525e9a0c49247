//! Thin wrappers over `kill(2)`.

use std::io;

use tracing::info;

use crate::ports::{Termination, Terminator};
use crate::{Error, Result};

/// Signal sent both to a previous instance and to the supervised group.
pub const TERMINATION_SIGNAL: libc::c_int = libc::SIGTERM;

/// Send `signal` to `target` as `kill(2)` interprets it (negative = process group).
///
/// Returns `Ok(false)` when no such process or group exists.
fn kill(target: libc::pid_t, signal: libc::c_int) -> io::Result<bool> {
    let rc = unsafe { libc::kill(target, signal) };
    if rc == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(false);
    }
    Err(err)
}

/// Send `signal` to a single process. `Ok(false)` if it no longer exists.
pub fn signal_process(pid: i32, signal: libc::c_int) -> io::Result<bool> {
    kill(pid, signal)
}

/// Send `signal` to every member of process group `pgid` by signaling `-pgid`.
/// `Ok(false)` if the group no longer exists.
pub fn signal_group(pgid: i32, signal: libc::c_int) -> io::Result<bool> {
    kill(-pgid, signal)
}

/// Stops previous instances with `SIGTERM`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalTerminator;

impl Terminator for SignalTerminator {
    fn terminate(&self, pid: i32) -> Result<Termination> {
        match signal_process(pid, TERMINATION_SIGNAL) {
            Ok(true) => {
                info!(pid, "sent SIGTERM to previous instance");
                Ok(Termination::Signaled)
            }
            Ok(false) => Ok(Termination::AlreadyGone),
            Err(source) => Err(Error::Terminate { pid, source }),
        }
    }
}
