//! Install command implementation

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use serde_json::Value;
use vendor_core::{Dependency, Engine, FileSpec, InstallOptions, Manifest, RepoId, SourceProvider};

use super::print_outcome;
use crate::context::load_or_create_manifest;
use crate::error::{CliError, Result};

/// Arguments of `vendor install`
#[derive(Debug, Clone, Default)]
pub struct InstallArgs {
    /// GitHub URL, `owner/repo`, or a repository name to search for
    pub source: String,
    pub version: Option<String>,
    pub name: Option<String>,
    pub files: Vec<String>,
}

/// Run the install command
///
/// Adds the dependency to the manifest (creating `vendor.toml` when there is
/// none) and installs it. Without an explicit version the latest release is
/// used.
pub async fn run_install(
    start: &Path,
    provider: Arc<dyn SourceProvider>,
    args: InstallArgs,
) -> Result<()> {
    let (url, repo) = resolve_source(provider.as_ref(), &args.source).await?;
    let name = args
        .name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| repo.name.clone());

    let manifest = load_or_create_manifest(start)?;
    let dependency = build_dependency(&manifest, &name, &url, &repo, &args.files)?;
    tracing::debug!(dependency = %name, repository = %dependency.repository, "Installing");

    let mut engine = Engine::new(manifest, provider);
    let options = InstallOptions {
        update: args.version.is_none(),
        version: args.version,
        ..Default::default()
    };
    let outcome = engine.install(&dependency, &options).await?;
    print_outcome(&outcome);
    Ok(())
}

/// Turn the user's source into a repository URL.
async fn resolve_source(provider: &dyn SourceProvider, source: &str) -> Result<(String, RepoId)> {
    if RepoId::is_url(source) {
        let repo = RepoId::parse(source)
            .ok_or_else(|| CliError::user(format!("Invalid GitHub URL \"{source}\"")))?;
        return Ok((source.trim().to_string(), repo));
    }
    if let Some(repo) = RepoId::parse(source) {
        return Ok((repo.url(), repo));
    }

    println!("{} Searching GitHub for {}", "=>".blue().bold(), source.cyan());
    let hit = provider.search_repository(source).await?;
    let repo = RepoId::parse(&hit.url)
        .ok_or_else(|| CliError::user(format!("Invalid GitHub URL \"{}\"", hit.url)))?;
    Ok((hit.url, repo))
}

/// Start from the existing declaration (by name, else by repository) and
/// apply the files given on the command line.
fn build_dependency(
    manifest: &Manifest,
    name: &str,
    url: &str,
    repo: &RepoId,
    files: &[String],
) -> Result<Dependency> {
    let existing = match manifest.dependency(name)? {
        Some(dependency) => Some(dependency),
        None => manifest
            .dependencies()?
            .into_iter()
            .find(|dependency| dependency.repo().ok().as_ref() == Some(repo)),
    };

    let specs = parse_files(files)?;
    match existing {
        Some(mut dependency) => {
            if !specs.is_empty() {
                dependency.files = specs;
            }
            Ok(dependency)
        }
        None if specs.is_empty() => Err(CliError::user(
            "you must provide files to install with -f or --files <files...>",
        )),
        None => Ok(Dependency {
            name: Some(name.to_string()),
            ..Dependency::new(url, specs)
        }),
    }
}

fn parse_files(files: &[String]) -> Result<Vec<FileSpec>> {
    let mut specs = Vec::new();
    for file in files {
        let parsed = FileSpec::parse_item(&Value::String(file.clone()))
            .map_err(|e| CliError::user(format!("Invalid file \"{file}\": {e}")))?;
        specs.extend(parsed);
    }
    Ok(specs)
}
