//! Re-exports the workspace's shared error types for this crate's public API.

pub use arbor_core::{Error, Result};
