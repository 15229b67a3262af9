//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Vendorfiles - Keep files from GitHub repositories vendored in your project
#[derive(Parser, Debug)]
#[command(name = "vendor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Folder where the search for the config file starts
    #[arg(short = 'd', long = "folder", global = true, value_name = "DIR")]
    pub folder: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Sync all dependencies in the config file
    ///
    /// Examples:
    ///   vendor sync
    ///   vendor sync -f
    #[command(alias = "s")]
    Sync {
        /// Re-download every file even when nothing changed
        #[arg(short, long)]
        force: bool,
    },

    /// Update all or selected dependencies to their latest release
    ///
    /// Examples:
    ///   vendor update
    ///   vendor bump widget
    ///   vendor update widget gadget --json
    #[command(visible_aliases = ["upgrade", "up", "u"], alias = "bump")]
    Update {
        /// Dependencies to update (all when empty)
        names: Vec<String>,

        /// Print the version changes as JSON
        #[arg(long)]
        json: bool,
    },

    /// List outdated dependencies
    #[command(alias = "o")]
    Outdated,

    /// Install a dependency
    ///
    /// The source can be a GitHub URL, owner/repo, or a repository name to
    /// search for. Files have to be provided with -f unless the dependency is
    /// already declared.
    ///
    /// Examples:
    ///   vendor install widget -n my-widget -f README.md
    ///   vendor add acme/widget v1.0.0 -f README.md LICENSE
    ///   vendor i https://github.com/acme/tool -f "{release}/tool-{version}.zip"
    #[command(visible_aliases = ["add", "i"], alias = "a")]
    Install {
        /// GitHub URL, owner/repo, or repository name
        source: String,

        /// Version to install (latest release when omitted)
        version: Option<String>,

        /// Name to write in the dependencies
        #[arg(short, long)]
        name: Option<String>,

        /// Files to install
        #[arg(short, long, num_args = 1..)]
        files: Vec<String>,
    },

    /// Uninstall dependencies
    ///
    /// Examples:
    ///   vendor uninstall widget
    ///   vendor remove widget tool
    #[command(visible_aliases = ["remove", "rm"], aliases = ["delete", "un"])]
    Uninstall {
        /// Dependencies to uninstall
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_sync_command() {
        let cli = Cli::parse_from(["vendor", "sync"]);
        assert_eq!(cli.command, Some(Commands::Sync { force: false }));
    }

    #[test]
    fn parse_sync_force() {
        let cli = Cli::parse_from(["vendor", "sync", "-f"]);
        assert_eq!(cli.command, Some(Commands::Sync { force: true }));
    }

    #[test]
    fn parse_update_aliases() {
        for alias in ["update", "upgrade", "up", "u", "bump"] {
            let cli = Cli::parse_from(["vendor", alias, "widget"]);
            assert_eq!(
                cli.command,
                Some(Commands::Update {
                    names: vec!["widget".into()],
                    json: false
                }),
                "alias {alias}"
            );
        }
    }

    #[test]
    fn parse_update_json() {
        let cli = Cli::parse_from(["vendor", "update", "--json"]);
        assert_eq!(
            cli.command,
            Some(Commands::Update {
                names: vec![],
                json: true
            })
        );
    }

    #[test]
    fn parse_install_command() {
        let cli = Cli::parse_from([
            "vendor",
            "add",
            "acme/widget",
            "v1.0.0",
            "-n",
            "my-widget",
            "-f",
            "README.md",
            "LICENSE",
        ]);
        match cli.command {
            Some(Commands::Install {
                source,
                version,
                name,
                files,
            }) => {
                assert_eq!(source, "acme/widget");
                assert_eq!(version.as_deref(), Some("v1.0.0"));
                assert_eq!(name.as_deref(), Some("my-widget"));
                assert_eq!(files, vec!["README.md", "LICENSE"]);
            }
            other => panic!("Expected Install command, got {other:?}"),
        }
    }

    #[test]
    fn parse_install_without_version() {
        let cli = Cli::parse_from(["vendor", "i", "widget"]);
        match cli.command {
            Some(Commands::Install {
                version, files, ..
            }) => {
                assert!(version.is_none());
                assert!(files.is_empty());
            }
            other => panic!("Expected Install command, got {other:?}"),
        }
    }

    #[test]
    fn parse_uninstall_many() {
        let cli = Cli::parse_from(["vendor", "rm", "widget", "tool"]);
        assert_eq!(
            cli.command,
            Some(Commands::Uninstall {
                names: vec!["widget".into(), "tool".into()]
            })
        );
    }

    #[test]
    fn uninstall_requires_a_name() {
        assert!(Cli::try_parse_from(["vendor", "uninstall"]).is_err());
    }

    #[test]
    fn global_flags_work_after_command() {
        let cli = Cli::parse_from(["vendor", "outdated", "-d", "sub/dir", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.folder, Some(PathBuf::from("sub/dir")));
        assert_eq!(cli.command, Some(Commands::Outdated));
    }
}
