//! Purpose: Virtual files backed by lock-protected in-memory state.
//! Exports: `api` (hosts, lifecycle, handlers), `core` (store, codec, protocol), `config`, `logging`.
//! Role: Library for embedding `running_total`, `sorted_list`, and the identity override file in a host.
//! Invariants: All shared state lives in one `Store` behind one lock; there are no globals.
//! Invariants: Every read and write is single-shot per open handle.
pub mod api;
pub mod config;
pub mod core;
pub mod logging;
