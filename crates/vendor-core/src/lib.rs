//! Reconciliation engine for vendorfiles
//!
//! This crate decides, per declared dependency, what must be fetched, what
//! must be deleted and when nothing has changed:
//!
//! - **Declarations**: repository identifiers, file specs and the manifest
//! - **Normalizer**: turns file specs plus a version into a lock shape
//! - **Lockfile store**: the per-folder `vendor-lock.json` ledger
//! - **Update oracle**: staleness rules evaluated against disk and lockfile
//! - **Materializer**: concurrent fetch-and-place, including archive extraction
//! - **Engine**: install, sync and uninstall
//!
//! # Architecture
//!
//! ```text
//!          vendor-cli
//!              |
//!       vendor-github
//!              |
//!         vendor-core  --- SourceProvider (trait)
//!              |
//!          vendor-fs
//! ```
//!
//! The engine reaches the network only through [`SourceProvider`].

pub mod archive;
pub mod engine;
pub mod error;
pub mod files;
pub mod lockfile;
pub mod manifest;
pub mod materialize;
pub mod oracle;
pub mod paths;
pub mod provider;
pub mod repository;
pub mod resolve;

pub use engine::{
    Engine, InstallOptions, Outcome, SyncFailure, SyncOptions, SyncReport, UninstallReport,
    VersionChange,
};
pub use error::{Error, Result};
pub use files::{ExtractItem, FileShape, FileSpec, LockShape, LockTarget, ReleaseOutput, normalize};
pub use lockfile::{LockEntry, Lockfile};
pub use manifest::{Dependency, HashVersionFile, Manifest, VendorConfig};
pub use oracle::{Candidate, Staleness};
pub use provider::{Asset, Release, SearchHit, Sink, SourceProvider};
pub use repository::RepoId;
pub use resolve::{Resolver, VersionRequest};
