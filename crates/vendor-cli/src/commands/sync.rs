//! Sync, update, and outdated command implementations
//!
//! All three walk the declared dependencies through the engine; they differ
//! only in the options passed and in how the report is shown.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use vendor_core::{Engine, SourceProvider, SyncOptions, SyncReport};

use super::{finish_report, print_outcome};
use crate::context::load_manifest;
use crate::error::Result;

/// Run the sync command
///
/// Installs whatever is missing or stale, keeping pinned versions.
pub async fn run_sync(start: &Path, provider: Arc<dyn SourceProvider>, force: bool) -> Result<()> {
    let mut engine = Engine::new(load_manifest(start)?, provider);
    println!("{} Syncing {}", "=>".blue().bold(), engine.manifest().path().display());

    let report = engine
        .sync(SyncOptions {
            force,
            ..Default::default()
        })
        .await?;

    for outcome in &report.outcomes {
        print_outcome(outcome);
    }
    finish_report(&report)
}

/// Run the update command
///
/// Moves every selected dependency to its latest release. With `json`, the
/// version changes are the only thing printed to stdout.
pub async fn run_update(
    start: &Path,
    provider: Arc<dyn SourceProvider>,
    names: &[String],
    json: bool,
) -> Result<()> {
    let mut engine = Engine::new(load_manifest(start)?, provider);
    let options = SyncOptions {
        update: true,
        ..Default::default()
    };
    let report = if names.is_empty() {
        engine.sync(options).await?
    } else {
        engine.sync_named(names, options).await?
    };

    if json {
        println!("{}", changes_json(&report)?);
    } else {
        for outcome in &report.outcomes {
            print_outcome(outcome);
        }
        if report.changes.is_empty() && report.success() {
            println!("{} Everything is up to date.", "OK".green().bold());
        }
    }
    finish_report(&report)
}

/// Run the outdated command
///
/// Lists dependencies with a newer release without touching any file.
pub async fn run_outdated(start: &Path, provider: Arc<dyn SourceProvider>) -> Result<()> {
    let mut engine = Engine::new(load_manifest(start)?, provider);
    let report = engine
        .sync(SyncOptions {
            report_only: true,
            ..Default::default()
        })
        .await?;

    let mut any = false;
    for outcome in report.outdated() {
        print_outcome(outcome);
        any = true;
    }
    if !any {
        println!("{} All dependencies are up to date.", "OK".green().bold());
    }
    finish_report(&report)
}

fn changes_json(report: &SyncReport) -> Result<String> {
    let output = serde_json::json!({
        "changes": report.changes,
        "failures": report.failures,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vendor_core::{Manifest, VersionChange};
    use vendor_test_utils::{FakeProvider, TestProject};

    const MANIFEST: &str = r#"{
  "vendorDependencies": {
    "widget": {
      "repository": "https://github.com/acme/widget",
      "files": ["README.md"]
    }
  }
}
"#;

    fn widget_provider() -> Arc<FakeProvider> {
        let provider = Arc::new(FakeProvider::new());
        provider.add_release("acme/widget", "v1.2.0", &[]);
        provider.add_file("acme/widget", "v1.2.0", "README.md", "# widget");
        provider
    }

    #[tokio::test]
    async fn test_sync_installs_into_vendor_folder() {
        let project = TestProject::new();
        project.write_manifest("vendor.json", MANIFEST);

        run_sync(project.root(), widget_provider(), false).await.unwrap();

        assert_eq!(project.read("vendor/widget/README.md"), "# widget");
    }

    #[tokio::test]
    async fn test_sync_reports_failures() {
        let project = TestProject::new();
        project.write_manifest("vendor.json", MANIFEST);
        let provider = Arc::new(FakeProvider::new());
        provider.fail_with("connection reset");

        let err = run_sync(project.root(), provider, false).await.unwrap_err();

        assert_eq!(err.to_string(), "1 of 1 dependencies failed");
    }

    #[tokio::test]
    async fn test_update_records_new_version() {
        let project = TestProject::new();
        project.write_manifest("vendor.json", MANIFEST);
        let provider = widget_provider();
        run_sync(project.root(), provider.clone(), false).await.unwrap();
        provider.add_release("acme/widget", "v1.3.0", &[]);
        provider.add_file("acme/widget", "v1.3.0", "README.md", "# widget 1.3");

        run_update(project.root(), provider, &["widget".to_string()], false)
            .await
            .unwrap();

        let manifest = Manifest::load(&project.path("vendor.json")).unwrap();
        assert_eq!(manifest.recorded_version("widget").as_deref(), Some("v1.3.0"));
        assert_eq!(project.read("vendor/widget/README.md"), "# widget 1.3");
    }

    #[test]
    fn test_changes_json_shape() {
        let report = SyncReport {
            changes: vec![VersionChange {
                name: "widget".into(),
                from: Some("v1.0.0".into()),
                to: "v1.1.0".into(),
            }],
            ..Default::default()
        };

        let value: serde_json::Value = serde_json::from_str(&changes_json(&report).unwrap()).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "changes": [{"name": "widget", "from": "v1.0.0", "to": "v1.1.0"}],
                "failures": []
            })
        );
    }

    #[tokio::test]
    async fn test_outdated_writes_nothing() {
        let project = TestProject::new();
        project.write_manifest("vendor.json", MANIFEST);

        run_outdated(project.root(), widget_provider()).await.unwrap();

        assert!(!project.exists("vendor"));
        assert_eq!(project.read("vendor.json"), MANIFEST);
    }
}
