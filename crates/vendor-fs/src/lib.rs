//! Filesystem layer for vendorfiles
//!
//! Provides atomic writes, best-effort cleanup of vendored files, and the
//! format-preserving document store used for manifests.

pub mod document;
pub mod error;
pub mod io;

pub use document::{Document, DocumentStyle, Format};
pub use error::{Error, Result};
