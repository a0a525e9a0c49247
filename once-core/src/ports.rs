use crate::Result;

/// What happened when the previous instance was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The termination signal was delivered.
    Signaled,
    /// No process with that pid exists any more.
    AlreadyGone,
    /// The record named this very process (pid reuse); nothing was sent.
    Skipped,
}

/// Port for the single persisted pid record.
pub trait RecordStore {
    /// Read the raw record. `None` when no record exists.
    fn read(&self) -> Result<Option<String>>;

    /// Overwrite the record with `pid`.
    fn write(&self, pid: i32) -> Result<()>;
}

/// Port for asking a process to stop.
pub trait Terminator {
    /// Send a termination request to `pid` without waiting for it to exit.
    ///
    /// Must report a missing process as [`Termination::AlreadyGone`], not as an error.
    fn terminate(&self, pid: i32) -> Result<Termination>;
}
