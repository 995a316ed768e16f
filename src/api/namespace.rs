//! Purpose: Host side of the virtual files: a name table plus per-open handles.
//! Exports: `FileHost`, `Namespace`, `OpenFile`.
//! Role: In-process stand-in for the host's file table; any host can implement `FileHost`.
//! Invariants: The table lock is never held while a handler runs.
//! Invariants: Each `OpenFile` owns its own cursor; reopening is the only way back to FRESH.
#![allow(clippy::result_large_err)]

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::core::cursor::{Cursor, CursorState};
use crate::core::error::{Error, ErrorKind};
use crate::core::file::{Access, FileMode, VirtualFile};

pub type ApiResult<T> = Result<T, Error>;

/// Registration surface a lifecycle manager needs from its host.
pub trait FileHost: Send + Sync {
    fn register(&self, file: Arc<dyn VirtualFile>) -> ApiResult<()>;

    /// Removes `name`, returning whether it was registered.
    fn unregister(&self, name: &str) -> bool;
}

#[derive(Default)]
pub struct Namespace {
    files: RwLock<BTreeMap<String, Arc<dyn VirtualFile>>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, name: &str, access: Access) -> ApiResult<OpenFile> {
        let file = {
            let files = self.files.read().map_err(|_| poisoned())?;
            files.get(name).cloned().ok_or_else(|| {
                Error::new(ErrorKind::NotFound)
                    .with_message("no such virtual file")
                    .with_file(name)
            })?
        };
        if !file.mode().allows(access) {
            return Err(Error::new(ErrorKind::Permission)
                .with_message(format!(
                    "mode {:o} does not allow {access:?}",
                    file.mode().bits()
                ))
                .with_file(name));
        }
        Ok(OpenFile {
            file,
            access,
            cursor: Cursor::new(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files
            .read()
            .map(|files| files.contains_key(name))
            .unwrap_or(false)
    }

    pub fn entries(&self) -> ApiResult<Vec<(String, FileMode)>> {
        let files = self.files.read().map_err(|_| poisoned())?;
        Ok(files
            .iter()
            .map(|(name, file)| (name.clone(), file.mode()))
            .collect())
    }
}

impl FileHost for Namespace {
    fn register(&self, file: Arc<dyn VirtualFile>) -> ApiResult<()> {
        let mut files = self.files.write().map_err(|_| poisoned())?;
        let name = file.name().to_string();
        if files.contains_key(&name) {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message("virtual file already registered")
                .with_file(name));
        }
        debug!(file = %name, mode = %format!("{:o}", file.mode().bits()), "registered");
        files.insert(name, file);
        Ok(())
    }

    fn unregister(&self, name: &str) -> bool {
        match self.files.write() {
            Ok(mut files) => files.remove(name).is_some(),
            Err(poisoned) => poisoned.into_inner().remove(name).is_some(),
        }
    }
}

fn poisoned() -> Error {
    Error::new(ErrorKind::Internal).with_message("namespace lock poisoned")
}

/// One open of a virtual file.
pub struct OpenFile {
    file: Arc<dyn VirtualFile>,
    access: Access,
    cursor: Cursor,
}

impl OpenFile {
    pub fn name(&self) -> &str {
        self.file.name()
    }

    pub fn cursor_state(&self) -> CursorState {
        self.cursor.state()
    }

    pub fn offset(&self) -> u64 {
        self.cursor.offset()
    }

    pub fn read(&mut self, buf: &mut [u8]) -> ApiResult<usize> {
        if !self.access.allows_read() {
            return Err(Error::new(ErrorKind::Permission)
                .with_message("handle not opened for reading")
                .with_file(self.file.name()));
        }
        self.file.read(buf, &mut self.cursor)
    }

    pub fn write(&mut self, data: &[u8]) -> ApiResult<usize> {
        if !self.access.allows_write() {
            return Err(Error::new(ErrorKind::Permission)
                .with_message("handle not opened for writing")
                .with_file(self.file.name()));
        }
        self.file.write(data, &mut self.cursor)
    }
}
