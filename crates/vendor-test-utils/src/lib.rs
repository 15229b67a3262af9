//! Shared test utilities for the vendorfiles workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`provider`]: [`FakeProvider`], an in-memory `SourceProvider` that counts calls
//! - [`archive`]: builders for release archives
//! - [`project`]: [`TestProject`], a temporary project directory

pub mod archive;
pub mod project;
pub mod provider;

pub use archive::zip_archive;
pub use project::TestProject;
pub use provider::FakeProvider;
