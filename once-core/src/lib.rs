//! Core library for `once`.
//!
//! Domain model:
//!   - `lock`       — cross-process advisory lock around registration
//!   - `record`     — the persisted pid of the registered instance
//!   - `ports`      — trait boundaries (RecordStore, Terminator)
//!   - `registry`   — read previous, terminate it, register ourselves
//!   - `signal`     — kill(2)/group signaling helpers
//!   - `supervisor` — spawn the child in its own process group and forward signals
//!   - `session`    — one full invocation, lock through exit status
//!
//! Ambient:
//!   - `config`  — env var > default resolution of the state directory and logging
//!   - `error`   — error taxonomy shared by every stage
//!   - `logging` — tracing subscriber setup

pub mod config;
pub mod error;
pub mod lock;
pub mod logging;
pub mod ports;
pub mod record;
pub mod registry;
pub mod session;
pub mod signal;
pub mod supervisor;

pub use error::{Error, ErrorCategory, Result};
pub use session::Invocation;
pub use supervisor::ChildExit;
