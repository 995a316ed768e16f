// Core modules implementing the shared state, the text codec, and the file protocol.
pub mod codec;
pub mod cursor;
pub mod error;
pub mod file;
pub mod identity;
pub mod sorted;
pub mod store;
