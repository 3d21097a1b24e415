use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    if let Some(tag) = option_env!("SPREADSHEET_INSTALLER_GIT_TAG") {
        return tag;
    }

    let commit = option_env!("SPREADSHEET_INSTALLER_GIT_COMMIT").unwrap_or("unknown");
    let branch = option_env!("SPREADSHEET_INSTALLER_GIT_BRANCH").unwrap_or("unknown");

    // Leaked once at startup so clap can hold a &'static str.
    let version = format!("v{}-{} ({})", BASE_VERSION, commit, branch);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "spreadsheet-installer")]
#[command(about = "Installs the spreadsheet binary from its latest GitHub release")]
#[command(version = get_version(), propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Repository to install from (e.g., 'cndrsdrmn/go-spreadsheet')
    #[arg(long, global = true)]
    pub repository: Option<String>,

    /// Directory the binary is installed into
    #[arg(long, global = true, value_name = "DIR")]
    pub bin_dir: Option<PathBuf>,

    /// Directory the binary is mirrored into
    #[arg(long, global = true, value_name = "DIR")]
    pub vendor_bin_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install or update the binary unless it is already current
    #[command(
        after_help = "Examples:\n  spreadsheet-installer install\n  spreadsheet-installer install --force\n  spreadsheet-installer install --archive ./spreadsheet_Linux_x86_64.tar.gz --archive-version 1.2.0"
    )]
    Install {
        /// Reinstall even if the installed version is current
        #[arg(long)]
        force: bool,
        /// Exit with a non-zero status when the install fails
        #[arg(long)]
        strict: bool,
        /// Install from a local .zip or .tar.gz instead of GitHub
        #[arg(long, value_name = "PATH")]
        archive: Option<PathBuf>,
        /// Version contained in the local archive
        #[arg(long, requires = "archive")]
        archive_version: Option<String>,
    },

    /// Exit 0 if the installed binary is current, 1 otherwise
    Check,

    /// Remove the binary from both directories
    Remove,

    /// Show the installer version and the installed binary version
    Version,

    /// Manage the installer's configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a configuration setting
    Get {
        /// Key to get (if omitted, shows all settings)
        key: Option<String>,
    },
    /// Set a configuration setting
    Set {
        /// Key and value (e.g., 'bin-dir=/opt/bin' or 'bin-dir /opt/bin')
        #[arg(trailing_var_arg = true, required = true)]
        args: Vec<String>,
    },
    /// Reset a configuration setting to its default
    Unset {
        /// Key to unset (e.g., 'vendor-bin-dir')
        key: String,
    },
    /// Show full configuration
    Show {
        /// Output format (json, yaml, plain)
        #[arg(long, default_value = "json")]
        format: String,
    },
}
