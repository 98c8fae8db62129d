//! Error types for sandloop-core
//!
//! Re-exports sandloop-error.

pub use sandloop_error::{Error, ErrorKind, ErrorStatus, Result};
