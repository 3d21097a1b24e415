use crate::error::InstallError;
use crate::install::ArchiveInstaller;
use crate::source::{DownloadOutcome, ReleaseSource};
use std::path::PathBuf;

/// Result of a post-install hook.
#[derive(Debug)]
pub enum InstallOutcome {
    UpToDate,
    Installed { asset: String, path: PathBuf },
    Failed(InstallError),
}

impl InstallOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, InstallOutcome::Failed(_))
    }
}

impl From<DownloadOutcome> for InstallOutcome {
    fn from(outcome: DownloadOutcome) -> Self {
        match outcome {
            DownloadOutcome::Installed { asset, path } => InstallOutcome::Installed { asset, path },
            DownloadOutcome::Failed(e) => InstallOutcome::Failed(e),
        }
    }
}

/// Entry points a host tool calls after its own install/update step and on uninstall.
#[allow(async_fn_in_trait)]
pub trait LifecycleHooks {
    async fn on_post_install(&mut self, force: bool) -> InstallOutcome;
    fn on_uninstall(&self) -> Result<(), InstallError>;
}

/// Pairs a release source with the on-disk installer.
pub struct InstallOrchestrator<S> {
    installer: ArchiveInstaller,
    source: S,
}

impl<S: ReleaseSource> InstallOrchestrator<S> {
    pub fn new(installer: ArchiveInstaller, source: S) -> Self {
        Self { installer, source }
    }

    pub fn installer(&self) -> &ArchiveInstaller {
        &self.installer
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn is_up_to_date(&mut self) -> bool {
        self.source.is_up_to_date(&self.installer).await
    }

    pub async fn run(&mut self) -> DownloadOutcome {
        self.source.download(&self.installer).await
    }

    pub fn remove(&self) -> Result<(), InstallError> {
        self.installer.remove()
    }
}

impl<S: ReleaseSource> LifecycleHooks for InstallOrchestrator<S> {
    async fn on_post_install(&mut self, force: bool) -> InstallOutcome {
        if !force && self.is_up_to_date().await {
            return InstallOutcome::UpToDate;
        }
        self.run().await.into()
    }

    fn on_uninstall(&self) -> Result<(), InstallError> {
        self.remove()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::TargetPath;
    use crate::notify::{Notifier, RecordingNotifier};
    use std::fs;
    use tempfile::TempDir;

    /// Scripted source that counts downloads.
    struct FakeSource {
        latest: Option<String>,
        downloads: usize,
        notifier: RecordingNotifier,
    }

    impl FakeSource {
        fn new(latest: Option<&str>) -> Self {
            Self {
                latest: latest.map(String::from),
                downloads: 0,
                notifier: RecordingNotifier::new(),
            }
        }
    }

    impl ReleaseSource for FakeSource {
        async fn version(&mut self) -> Option<String> {
            self.latest.clone()
        }

        async fn download(&mut self, installer: &ArchiveInstaller) -> DownloadOutcome {
            self.downloads += 1;
            DownloadOutcome::Installed {
                asset: "fake.tar.gz".to_string(),
                path: installer.path(),
            }
        }

        fn notifier(&self) -> &dyn Notifier {
            &self.notifier
        }
    }

    fn orchestrator(root: &TempDir, latest: Option<&str>) -> InstallOrchestrator<FakeSource> {
        let target = TargetPath::new(
            root.path().join("bin"),
            root.path().join("vendor"),
            "spreadsheet",
        )
        .unwrap();
        InstallOrchestrator::new(ArchiveInstaller::new(target), FakeSource::new(latest))
    }

    #[cfg(unix)]
    fn install_script(orchestrator: &InstallOrchestrator<FakeSource>, version: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = orchestrator.installer().path();
        fs::write(
            &path,
            format!("#!/bin/sh\necho 'spreadsheet version {}'\n", version),
        )
        .unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn test_missing_binary_is_never_up_to_date() {
        let root = TempDir::new().unwrap();
        let mut orchestrator = orchestrator(&root, Some("1.0.0"));

        assert!(!orchestrator.is_up_to_date().await);
        assert!(orchestrator.source().notifier.infos().is_empty());
    }

    #[tokio::test]
    async fn test_post_install_downloads_when_outdated() {
        let root = TempDir::new().unwrap();
        let mut orchestrator = orchestrator(&root, Some("1.0.0"));

        let outcome = orchestrator.on_post_install(false).await;
        assert!(matches!(outcome, InstallOutcome::Installed { .. }));
        assert_eq!(orchestrator.source().downloads, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_post_install_skips_when_up_to_date() {
        let root = TempDir::new().unwrap();
        let mut orchestrator = orchestrator(&root, Some("1.0.0"));
        install_script(&orchestrator, "1.2.0");

        let outcome = orchestrator.on_post_install(false).await;
        assert!(matches!(outcome, InstallOutcome::UpToDate));
        assert_eq!(orchestrator.source().downloads, 0);
        assert_eq!(
            orchestrator.source().notifier.infos(),
            vec!["Spreadsheet is already up to date."]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_post_install_force_ignores_version() {
        let root = TempDir::new().unwrap();
        let mut orchestrator = orchestrator(&root, Some("1.0.0"));
        install_script(&orchestrator, "1.0.0");

        let outcome = orchestrator.on_post_install(true).await;
        assert!(matches!(outcome, InstallOutcome::Installed { .. }));
        assert_eq!(orchestrator.source().downloads, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unknown_latest_version_means_outdated() {
        let root = TempDir::new().unwrap();
        let mut orchestrator = orchestrator(&root, None);
        install_script(&orchestrator, "9.9.9");

        assert!(!orchestrator.is_up_to_date().await);
    }

    #[test]
    fn test_uninstall_removes_files_and_is_idempotent() {
        let root = TempDir::new().unwrap();
        let orchestrator = orchestrator(&root, None);
        fs::write(orchestrator.installer().path(), b"binary").unwrap();

        orchestrator.on_uninstall().unwrap();
        assert!(!orchestrator.installer().path().exists());
        orchestrator.on_uninstall().unwrap();
    }
}
