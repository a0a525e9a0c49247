use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::ports::RecordStore;
use crate::{Error, Result};

/// Write `content` to `path` atomically using a temp file + rename.
///
/// Readers see either the old complete record or the new one, never a
/// truncated file.
fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    // Same directory so the rename stays on one filesystem.
    let tmp = path.with_extension("tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(content.as_bytes())?;
    f.sync_all()?;
    fs::rename(&tmp, path)
}

/// Filesystem-backed pid record at `<state_dir>/once-pid`.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    path: PathBuf,
}

impl FileRecordStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl RecordStore for FileRecordStore {
    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::ReadPid {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write(&self, pid: i32) -> Result<()> {
        atomic_write(&self.path, &pid.to_string()).map_err(|source| Error::WritePid {
            path: self.path.clone(),
            source,
        })
    }
}

/// In-memory record for exercising the registry without touching disk.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    value: RefCell<Option<String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: &str) -> Self {
        Self {
            value: RefCell::new(Some(content.to_string())),
        }
    }

    pub fn content(&self) -> Option<String> {
        self.value.borrow().clone()
    }
}

impl RecordStore for MemoryRecordStore {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.value.borrow().clone())
    }

    fn write(&self, pid: i32) -> Result<()> {
        *self.value.borrow_mut() = Some(pid.to_string());
        Ok(())
    }
}
