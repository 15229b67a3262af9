//! Uninstall command implementation

use std::path::Path;

use colored::Colorize;
use vendor_core::engine::uninstall;

use crate::context::load_manifest;
use crate::error::Result;

/// Run the uninstall command
///
/// Works offline. Stops at the first name that is neither declared nor
/// locked; earlier names stay uninstalled.
pub fn run_uninstall(start: &Path, names: &[String]) -> Result<()> {
    let mut manifest = load_manifest(start)?;

    for name in names {
        let report = uninstall(&mut manifest, name)?;
        println!(
            "{} Uninstalled {} ({} files removed from {})",
            "OK".green().bold(),
            report.name.cyan(),
            report.removed.len(),
            report.folder.display()
        );
        if !report.removed_from_manifest {
            println!(
                "   {} {} was only present in the lockfile",
                "-".yellow(),
                report.name
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vendor_test_utils::TestProject;

    const MANIFEST: &str = r#"{"vendorDependencies": {"widget": {"repository": "acme/widget", "version": "v1.2.0", "files": ["README.md"]}}}"#;

    #[test]
    fn test_uninstall_removes_files_and_declaration() {
        let project = TestProject::new();
        project.write_manifest("vendor.json", MANIFEST);
        project.write("vendor/widget/README.md", "# widget");
        project.write(
            "vendor/widget/vendor-lock.json",
            r#"{"widget":{"version":"v1.2.0","repository":"acme/widget","files":{"README.md":"README.md"}}}"#,
        );

        run_uninstall(project.root(), &["widget".to_string()]).unwrap();

        assert!(!project.exists("vendor/widget"));
        assert!(!project.read("vendor.json").contains("widget"));
    }

    #[test]
    fn test_uninstall_unknown_name_fails() {
        let project = TestProject::new();
        project.write_manifest("vendor.json", MANIFEST);

        let err = run_uninstall(project.root(), &["gadget".to_string()]).unwrap_err();

        assert!(err.to_string().contains("gadget"), "got: {err}");
    }
}
