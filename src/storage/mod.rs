//! Source document storage
//!
//! Uploaded documents live as flat files in a single directory, keyed by
//! their sanitized name.

mod documents;
mod types;

pub use documents::DocumentStore;
pub use types::*;
