//! Purpose: Define the public Rust API boundary for hosts of the virtual files.
//! Exports: Lifecycle, namespace, handler, and error types needed to embed the files.
//! Role: Public, additive-only surface over the core modules.
//! Invariants: Hosts load through `Module` and reach files through a `FileHost`.

mod module;
mod namespace;

pub use crate::config::{FileSpec, MAX_WRITE_BYTES_ENV, ModuleConfig};
pub use crate::core::cursor::{Cursor, CursorState};
pub use crate::core::error::{Error, ErrorKind, to_errno};
pub use crate::core::file::{
    Access, FileMode, IdentityOverrideFile, RunningTotalFile, SortedListFile, VirtualFile,
};
pub use crate::core::identity::{GroupId, IdentityOverride, UnavailableIdentity};
pub use crate::core::store::{Store, StoreStats};
pub use module::{Module, TeardownReport};
pub use namespace::{ApiResult, FileHost, Namespace, OpenFile};
