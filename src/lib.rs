//! Installs the `spreadsheet` binary from the latest GitHub release.
//!
//! A host tool calls [`LifecycleHooks::on_post_install`] after its own install
//! or update step and [`LifecycleHooks::on_uninstall`] when it is removed. The
//! release for this host is picked by OS and architecture, unpacked into the
//! binary directory and mirrored into the vendor directory.

pub mod config;
pub mod download;
pub mod error;
pub mod install;
pub mod notify;
pub mod orchestrator;
pub mod platform;
pub mod repo_id;
pub mod source;
pub mod types;
pub mod version;


pub use error::{ErrorKind, InstallError};
pub use install::{ArchiveInstaller, TargetPath, VersionProbe};
pub use notify::{ConsoleNotifier, Notice, Notifier, RecordingNotifier};
pub use orchestrator::{InstallOrchestrator, InstallOutcome, LifecycleHooks};
pub use platform::Platform;
pub use repo_id::RepoId;
pub use source::{DownloadOutcome, GitHubSource, LocalSource, ReleaseSource};
pub use types::InstallerSettings;
