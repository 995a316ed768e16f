//! Purpose: Read/write entry points for each virtual file.
//! Exports: `VirtualFile`, `FileMode`, `Access`, and the three file handlers.
//! Role: Glue between caller buffers, the text codec, and the shared store.
//! Invariants: A drained cursor yields 0 without touching state.
//! Invariants: Reads never copy more than the caller's buffer holds; writes are all-or-nothing.
//! Invariants: The store lock is released before any copy to or from caller memory.
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::codec;
use crate::core::cursor::{Cursor, CursorState};
use crate::core::error::{Error, ErrorKind};
use crate::core::identity::{GroupId, IdentityOverride};
use crate::core::store::Store;

pub const DEFAULT_MAX_WRITE_BYTES: usize = 4096;

/// Permission bits in the usual owner/group/other layout.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FileMode(u32);

impl FileMode {
    pub const READ_WRITE: FileMode = FileMode(0o666);
    pub const WRITE_ONLY: FileMode = FileMode(0o222);

    pub fn new(bits: u32) -> Self {
        Self(bits & 0o777)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn allows(self, access: Access) -> bool {
        let readable = self.0 & 0o444 != 0;
        let writable = self.0 & 0o222 != 0;
        match access {
            Access::Read => readable,
            Access::Write => writable,
            Access::ReadWrite => readable && writable,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub fn allows_read(self) -> bool {
        matches!(self, Access::Read | Access::ReadWrite)
    }

    pub fn allows_write(self) -> bool {
        matches!(self, Access::Write | Access::ReadWrite)
    }
}

pub trait VirtualFile: Send + Sync {
    fn name(&self) -> &str;

    fn mode(&self) -> FileMode;

    /// Copies the file's rendering into `buf` and returns the bytes written.
    fn read(&self, buf: &mut [u8], cursor: &mut Cursor) -> Result<usize, Error> {
        let _ = (buf, cursor);
        Err(Error::new(ErrorKind::Permission)
            .with_message("file is not readable")
            .with_file(self.name()))
    }

    /// Consumes one integer from `data` and returns the bytes consumed.
    fn write(&self, data: &[u8], cursor: &mut Cursor) -> Result<usize, Error> {
        let _ = (data, cursor);
        Err(Error::new(ErrorKind::Permission)
            .with_message("file is not writable")
            .with_file(self.name()))
    }
}

pub struct RunningTotalFile {
    name: String,
    mode: FileMode,
    max_write_bytes: usize,
    store: Arc<Store>,
}

impl RunningTotalFile {
    pub fn new(name: impl Into<String>, mode: FileMode, store: Arc<Store>) -> Self {
        Self {
            name: name.into(),
            mode,
            max_write_bytes: DEFAULT_MAX_WRITE_BYTES,
            store,
        }
    }

    pub fn with_max_write_bytes(mut self, max_write_bytes: usize) -> Self {
        self.max_write_bytes = max_write_bytes;
        self
    }
}

impl VirtualFile for RunningTotalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> FileMode {
        self.mode
    }

    fn read(&self, buf: &mut [u8], cursor: &mut Cursor) -> Result<usize, Error> {
        if is_drained(&self.name, cursor) {
            return Ok(0);
        }
        let total = self.store.read_total()?;
        let rendered = codec::encode(total);
        Ok(deliver(&self.name, rendered.as_bytes(), buf, cursor))
    }

    fn write(&self, data: &[u8], cursor: &mut Cursor) -> Result<usize, Error> {
        let Some(delta) = accept_write(&self.name, data, cursor, self.max_write_bytes)? else {
            return Ok(0);
        };
        let total = self
            .store
            .add_to_total(delta)
            .map_err(|err| err.with_file(self.name.as_str()))?;
        debug!(file = %self.name, delta, total, "running total updated");
        cursor.advance(data.len());
        Ok(data.len())
    }
}

pub struct SortedListFile {
    name: String,
    mode: FileMode,
    max_write_bytes: usize,
    store: Arc<Store>,
}

impl SortedListFile {
    pub fn new(name: impl Into<String>, mode: FileMode, store: Arc<Store>) -> Self {
        Self {
            name: name.into(),
            mode,
            max_write_bytes: DEFAULT_MAX_WRITE_BYTES,
            store,
        }
    }

    pub fn with_max_write_bytes(mut self, max_write_bytes: usize) -> Self {
        self.max_write_bytes = max_write_bytes;
        self
    }
}

impl VirtualFile for SortedListFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> FileMode {
        self.mode
    }

    fn read(&self, buf: &mut [u8], cursor: &mut Cursor) -> Result<usize, Error> {
        if is_drained(&self.name, cursor) {
            return Ok(0);
        }
        let values = self.store.render_sorted()?;
        let rendered = codec::render_lines(&values);
        Ok(deliver(&self.name, rendered.as_bytes(), buf, cursor))
    }

    fn write(&self, data: &[u8], cursor: &mut Cursor) -> Result<usize, Error> {
        let Some(value) = accept_write(&self.name, data, cursor, self.max_write_bytes)? else {
            return Ok(0);
        };
        self.store
            .insert_sorted(value)
            .map_err(|err| err.with_file(self.name.as_str()))?;
        cursor.advance(data.len());
        Ok(data.len())
    }
}

pub struct IdentityOverrideFile {
    name: String,
    mode: FileMode,
    max_write_bytes: usize,
    identity: Arc<dyn IdentityOverride>,
}

impl IdentityOverrideFile {
    pub fn new(
        name: impl Into<String>,
        mode: FileMode,
        identity: Arc<dyn IdentityOverride>,
    ) -> Self {
        Self {
            name: name.into(),
            mode,
            max_write_bytes: DEFAULT_MAX_WRITE_BYTES,
            identity,
        }
    }

    pub fn with_max_write_bytes(mut self, max_write_bytes: usize) -> Self {
        self.max_write_bytes = max_write_bytes;
        self
    }
}

impl VirtualFile for IdentityOverrideFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> FileMode {
        self.mode
    }

    fn write(&self, data: &[u8], cursor: &mut Cursor) -> Result<usize, Error> {
        let Some(value) = accept_write(&self.name, data, cursor, self.max_write_bytes)? else {
            return Ok(0);
        };
        let id = GroupId::try_from(value).map_err(|err| err.with_file(self.name.as_str()))?;
        self.identity
            .override_group_id(id)
            .map_err(|err| err.with_file(self.name.as_str()))?;
        debug!(file = %self.name, %id, "group id override forwarded");
        cursor.advance(data.len());
        Ok(data.len())
    }
}

fn is_drained(name: &str, cursor: &Cursor) -> bool {
    if cursor.state() == CursorState::Drained {
        debug!(file = %name, offset = cursor.offset(), "cursor drained");
        return true;
    }
    false
}

fn deliver(name: &str, rendered: &[u8], buf: &mut [u8], cursor: &mut Cursor) -> usize {
    let len = rendered.len().min(buf.len());
    if len < rendered.len() {
        debug!(
            file = %name,
            rendered = rendered.len(),
            capacity = buf.len(),
            "read truncated to caller capacity"
        );
    }
    buf[..len].copy_from_slice(&rendered[..len]);
    cursor.advance(len);
    len
}

/// Validates and decodes a write, returning `None` on a drained cursor.
fn accept_write(
    name: &str,
    data: &[u8],
    cursor: &Cursor,
    max_bytes: usize,
) -> Result<Option<i64>, Error> {
    if is_drained(name, cursor) {
        return Ok(None);
    }
    if data.len() > max_bytes {
        warn!(file = %name, count = data.len(), max_bytes, "write rejected: too large");
        return Err(Error::new(ErrorKind::CapacityExceeded)
            .with_message(format!("write of {} bytes exceeds {max_bytes}", data.len()))
            .with_file(name));
    }

    let mut local = Vec::new();
    local.try_reserve_exact(data.len()).map_err(|err| {
        Error::new(ErrorKind::AllocationFailure)
            .with_file(name)
            .with_source(err)
    })?;
    local.extend_from_slice(data);

    match codec::decode(&local) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            warn!(file = %name, error = %err, "write rejected: malformed input");
            Err(Error::from(err).with_file(name).with_offset(cursor.offset()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Access, FileMode, IdentityOverrideFile, RunningTotalFile, SortedListFile, VirtualFile,
    };
    use crate::core::cursor::{Cursor, CursorState};
    use crate::core::error::{Error, ErrorKind};
    use crate::core::identity::{GroupId, IdentityOverride};
    use crate::core::store::Store;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<GroupId>>,
    }

    impl IdentityOverride for Recorder {
        fn override_group_id(&self, new_id: GroupId) -> Result<(), Error> {
            self.seen.lock().expect("lock").push(new_id);
            Ok(())
        }
    }

    fn write_once(file: &dyn VirtualFile, data: &[u8]) -> Result<usize, Error> {
        file.write(data, &mut Cursor::new())
    }

    fn read_once(file: &dyn VirtualFile, capacity: usize) -> (Vec<u8>, Cursor) {
        let mut buf = vec![0u8; capacity];
        let mut cursor = Cursor::new();
        let n = file.read(&mut buf, &mut cursor).expect("read");
        buf.truncate(n);
        (buf, cursor)
    }

    #[test]
    fn mode_bits_gate_access() {
        assert!(FileMode::READ_WRITE.allows(Access::ReadWrite));
        assert!(FileMode::WRITE_ONLY.allows(Access::Write));
        assert!(!FileMode::WRITE_ONLY.allows(Access::Read));
        assert!(!FileMode::new(0o444).allows(Access::Write));
        assert_eq!(FileMode::new(0o10666).bits(), 0o666);
        assert!(Access::ReadWrite.allows_read() && Access::ReadWrite.allows_write());
        assert!(!Access::Write.allows_read());
    }

    #[test]
    fn running_total_reads_sum() {
        let store = Arc::new(Store::new());
        let file = RunningTotalFile::new("running_total", FileMode::READ_WRITE, store);
        for input in [&b"10"[..], b"-3\n", b"5"] {
            assert_eq!(write_once(&file, input).expect("write"), input.len());
        }
        let (out, cursor) = read_once(&file, 64);
        assert_eq!(out, b"12\n");
        assert_eq!(cursor.state(), CursorState::Drained);
        assert_eq!(cursor.offset(), 3);
    }

    #[test]
    fn drained_cursor_short_circuits() {
        let store = Arc::new(Store::new());
        let file = SortedListFile::new("sorted_list", FileMode::READ_WRITE, Arc::clone(&store));
        let mut drained = Cursor::from_offset(1);

        assert_eq!(file.write(b"7", &mut drained).expect("write"), 0);
        assert!(store.render_sorted().expect("render").is_empty());

        store.insert_sorted(4).expect("insert");
        let mut buf = [0u8; 16];
        assert_eq!(file.read(&mut buf, &mut drained).expect("read"), 0);
        assert_eq!(drained.offset(), 1);
    }

    #[test]
    fn second_write_on_same_handle_is_ignored() {
        let store = Arc::new(Store::new());
        let file = RunningTotalFile::new("running_total", FileMode::READ_WRITE, Arc::clone(&store));
        let mut cursor = Cursor::new();
        assert_eq!(file.write(b"4", &mut cursor).expect("write"), 1);
        assert_eq!(file.write(b"4", &mut cursor).expect("write"), 0);
        assert_eq!(store.read_total().expect("total"), 4);
    }

    #[test]
    fn sorted_list_renders_lines() {
        let store = Arc::new(Store::new());
        let file = SortedListFile::new("sorted_list", FileMode::READ_WRITE, store);
        for input in ["5", "3", "3", "8"] {
            write_once(&file, input.as_bytes()).expect("write");
        }
        let (out, _) = read_once(&file, 64);
        assert_eq!(out, b"3\n3\n5\n8\n");
    }

    #[test]
    fn truncated_read_respects_capacity() {
        let store = Arc::new(Store::new());
        let file = SortedListFile::new("sorted_list", FileMode::READ_WRITE, Arc::clone(&store));
        for value in [100, 20, 3] {
            store.insert_sorted(value).expect("insert");
        }
        let full = b"3\n20\n100\n";
        for capacity in 0..=full.len() {
            let (out, cursor) = read_once(&file, capacity);
            assert_eq!(out, &full[..capacity]);
            assert_eq!(cursor.offset(), capacity as u64);
        }
    }

    #[test]
    fn zero_capacity_read_stays_fresh() {
        let store = Arc::new(Store::new());
        let file = RunningTotalFile::new("running_total", FileMode::READ_WRITE, store);
        let (out, cursor) = read_once(&file, 0);
        assert!(out.is_empty());
        assert_eq!(cursor.state(), CursorState::Fresh);
    }

    #[test]
    fn malformed_write_is_rejected() {
        let store = Arc::new(Store::new());
        let total = RunningTotalFile::new("running_total", FileMode::READ_WRITE, Arc::clone(&store));
        let sorted = SortedListFile::new("sorted_list", FileMode::READ_WRITE, Arc::clone(&store));

        for file in [&total as &dyn VirtualFile, &sorted] {
            let mut cursor = Cursor::new();
            let err = file.write(b"abc", &mut cursor).expect_err("malformed");
            assert_eq!(err.kind(), ErrorKind::MalformedInput);
            assert_eq!(err.file(), Some(file.name()));
            assert_eq!(cursor.state(), CursorState::Fresh);
        }
        assert_eq!(store.read_total().expect("total"), 0);
        assert!(store.render_sorted().expect("render").is_empty());
    }

    #[test]
    fn oversized_write_is_rejected() {
        let store = Arc::new(Store::new());
        let file = SortedListFile::new("sorted_list", FileMode::READ_WRITE, Arc::clone(&store))
            .with_max_write_bytes(8);
        let err = write_once(&file, b"1        9").expect_err("too large");
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert!(store.render_sorted().expect("render").is_empty());

        assert_eq!(write_once(&file, b"12345678").expect("write"), 8);
    }

    #[test]
    fn identity_override_forwards_written_value() {
        let recorder = Arc::new(Recorder::default());
        let file = IdentityOverrideFile::new(
            "my_piddo",
            FileMode::WRITE_ONLY,
            Arc::clone(&recorder) as Arc<dyn IdentityOverride>,
        );
        assert_eq!(write_once(&file, b"1234\n").expect("write"), 5);

        let err = write_once(&file, b"-5").expect_err("negative");
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        let seen = recorder.seen.lock().expect("lock");
        assert_eq!(seen.as_slice(), &[GroupId::try_from(1234_i64).expect("id")]);
    }

    #[test]
    fn identity_override_is_not_readable() {
        let file = IdentityOverrideFile::new(
            "my_piddo",
            FileMode::WRITE_ONLY,
            Arc::new(Recorder::default()),
        );
        let mut buf = [0u8; 8];
        let err = file.read(&mut buf, &mut Cursor::new()).expect_err("write only");
        assert_eq!(err.kind(), ErrorKind::Permission);
    }
}
