use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Broad class of a failure, used when reporting the fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// State directory, lock or pid record.
    Setup,
    /// The previous instance could not be signaled.
    Terminate,
    /// Starting or waiting on the supervised command.
    Run,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Setup => "setup",
            ErrorCategory::Terminate => "terminate",
            ErrorCategory::Run => "run",
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("find user cache dir: no cache directory on this platform (set ONCE_DIR)")]
    CacheDir,
    #[error("lock {}", .path.display())]
    Lock { path: PathBuf, source: io::Error },
    #[error("unlock {}", .path.display())]
    Unlock { path: PathBuf, source: io::Error },
    #[error("read other pid from {}", .path.display())]
    ReadPid { path: PathBuf, source: io::Error },
    #[error("write pid to {}", .path.display())]
    WritePid { path: PathBuf, source: io::Error },
    #[error("terminate previous instance (pid {pid})")]
    Terminate { pid: i32, source: io::Error },
    #[error("listen for interrupt signals")]
    Signals(#[source] io::Error),
    #[error("run command {command}")]
    Spawn { command: String, source: io::Error },
    #[error("wait for command {command}")]
    Wait { command: String, source: io::Error },
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::CacheDir
            | Error::Lock { .. }
            | Error::Unlock { .. }
            | Error::ReadPid { .. }
            | Error::WritePid { .. } => ErrorCategory::Setup,
            Error::Terminate { .. } => ErrorCategory::Terminate,
            Error::Signals(_) | Error::Spawn { .. } | Error::Wait { .. } => ErrorCategory::Run,
        }
    }
}
