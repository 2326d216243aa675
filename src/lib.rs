//! Win32 backing for the `identity` crate, plus the pieces the `runas` tool is built from.

pub mod config;
pub mod file_writer;
pub mod logger;
#[cfg(windows)]
pub mod thread_context;
#[cfg(windows)]
pub mod token;

pub use identity;
