//! GitHub source provider for vendorfiles
//!
//! Implements `vendor_core::SourceProvider` on top of the GitHub REST API.
//! Configuration comes from the environment:
//!
//! - `GITHUB_TOKEN`: bearer token; requests are anonymous (and heavily rate
//!   limited) without it
//! - `GITHUB_API_URL`: API base, defaults to `https://api.github.com`

pub mod client;
pub mod error;

pub use client::{API_URL_ENV, DEFAULT_API_URL, GitHubClient, GitHubConfig, TOKEN_ENV};
pub use error::{Error, Result};
