// Per-handle position cursor for the single-shot read/write protocol.

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CursorState {
    /// Nothing delivered or consumed yet on this handle.
    Fresh,
    /// The handle already produced or accepted its one value; terminal.
    Drained,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Cursor {
    offset: u64,
}

impl Cursor {
    pub fn new() -> Self {
        Self { offset: 0 }
    }

    /// Rebuilds a cursor from an offset a host kept between calls.
    pub fn from_offset(offset: u64) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn state(&self) -> CursorState {
        if self.offset == 0 {
            CursorState::Fresh
        } else {
            CursorState::Drained
        }
    }

    pub fn advance(&mut self, bytes: usize) {
        self.offset = self.offset.saturating_add(bytes as u64);
    }
}
