//! Runtime configuration for `once`.
//!
//! Resolution order: **env var > hardcoded default**.
//!
//! ```text
//! Field          Env Var            Default
//! ────────────── ────────────────── ──────────────────────────────
//! state_dir      ONCE_DIR           platform user cache dir
//! log_filter     ONCE_LOG           "warn"
//! log_format     ONCE_LOG_FORMAT    human ("human" | "json")
//! ```

use std::env;
use std::path::{Path, PathBuf};

use crate::logging::LogFormat;
use crate::{Error, Result};

/// Lock file serializing registration across invocations.
pub const LOCK_FILE: &str = "once-lock";
/// Plain-text decimal pid of the registered instance.
pub const PID_FILE: &str = "once-pid";

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnceConfig {
    /// Directory holding `once-lock` and `once-pid` (`ONCE_DIR`; default user cache dir).
    pub state_dir: PathBuf,
    /// `tracing` env-filter directive (`ONCE_LOG`; default "warn").
    pub log_filter: String,
    /// Diagnostic output format (`ONCE_LOG_FORMAT`; default human).
    pub log_format: LogFormat,
}

impl OnceConfig {
    /// Load config from env vars, falling back to the platform cache dir.
    pub fn load() -> Result<Self> {
        Self::load_with_env(|k| env::var(k).ok(), dirs::cache_dir)
    }

    fn load_with_env(
        get_env: impl Fn(&str) -> Option<String>,
        cache_dir: impl FnOnce() -> Option<PathBuf>,
    ) -> Result<Self> {
        let get = |key: &str| get_env(key).filter(|v| !v.trim().is_empty());

        let state_dir = match get("ONCE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => cache_dir().ok_or(Error::CacheDir)?,
        };
        let log_filter = get("ONCE_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let log_format = get("ONCE_LOG_FORMAT")
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();

        Ok(Self {
            state_dir,
            log_filter,
            log_format,
        })
    }

    /// Build a config rooted at an explicit directory with default logging.
    pub fn with_state_dir(state_dir: &Path) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_format: LogFormat::default(),
        }
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join(LOCK_FILE)
    }

    pub fn pid_path(&self) -> PathBuf {
        self.state_dir.join(PID_FILE)
    }
}
