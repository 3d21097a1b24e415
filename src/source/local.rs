use crate::error::InstallError;
use crate::install::ArchiveInstaller;
use crate::notify::Notifier;
use crate::source::{DownloadOutcome, ReleaseSource};
use crate::version;
use futures_util::stream;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Installs from an archive already on disk, for hosts without network access.
///
/// The archive's file name plays the role of the asset name, so it must end in
/// `.zip` or `.tar.gz`.
pub struct LocalSource {
    archive: PathBuf,
    version: Option<String>,
    notifier: Arc<dyn Notifier>,
}

impl LocalSource {
    pub fn new(archive: impl Into<PathBuf>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            archive: archive.into(),
            version: None,
            notifier,
        }
    }

    /// Version the archive contains. Without one the binary is never
    /// considered up to date.
    pub fn with_version(mut self, version: impl AsRef<str>) -> Self {
        self.version = Some(version::normalize(version.as_ref()).to_string());
        self
    }

    async fn try_install(
        &self,
        installer: &ArchiveInstaller,
    ) -> Result<(String, PathBuf), InstallError> {
        let filename = self
            .archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                InstallError::UnsupportedArchiveExtension(self.archive.display().to_string())
            })?;

        self.notifier
            .info(&format!("Installing archive from {}", self.archive.display()));

        let bytes = fs::read(&self.archive)?;
        let chunks = stream::iter(vec![Ok::<_, std::io::Error>(bytes)]);
        let path = installer
            .install_from_stream(chunks, &filename, self.notifier.as_ref())
            .await?;

        Ok((filename, path))
    }
}

impl ReleaseSource for LocalSource {
    async fn version(&mut self) -> Option<String> {
        self.version.clone()
    }

    async fn download(&mut self, installer: &ArchiveInstaller) -> DownloadOutcome {
        match self.try_install(installer).await {
            Ok((asset, path)) => DownloadOutcome::Installed { asset, path },
            Err(e) => {
                self.notifier
                    .error(&format!("Failed to install local archive: {}", e));
                DownloadOutcome::Failed(e)
            }
        }
    }

    fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::TargetPath;
    use crate::notify::RecordingNotifier;

    fn installer(root: &tempfile::TempDir) -> ArchiveInstaller {
        let target = TargetPath::new(
            root.path().join("bin"),
            root.path().join("vendor"),
            "spreadsheet",
        )
        .unwrap();
        ArchiveInstaller::new(target).with_temp_dir(root.path().join("tmp"))
    }

    #[tokio::test]
    async fn test_missing_archive_fails_with_io_error() {
        let root = tempfile::tempdir().unwrap();
        let installer = installer(&root);
        let notifier = Arc::new(RecordingNotifier::new());
        let mut source = LocalSource::new(root.path().join("missing.tar.gz"), notifier.clone());

        let outcome = source.download(&installer).await;
        assert!(matches!(outcome, DownloadOutcome::Failed(InstallError::Io(_))));
        assert_eq!(notifier.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_version_is_normalized() {
        let notifier = Arc::new(RecordingNotifier::new());
        let mut source = LocalSource::new("spreadsheet.tar.gz", notifier).with_version("v3.2.1");
        assert_eq!(source.version().await.as_deref(), Some("3.2.1"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_installs_local_zip() {
        use std::io::Write;

        let root = tempfile::tempdir().unwrap();
        let archive = root.path().join("spreadsheet_Linux_x86_64.zip");
        let mut writer = zip::ZipWriter::new(fs::File::create(&archive).unwrap());
        writer
            .start_file("spreadsheet", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(b"binary").unwrap();
        writer.finish().unwrap();

        let installer = installer(&root);
        let notifier = Arc::new(RecordingNotifier::new());
        let mut source = LocalSource::new(&archive, notifier.clone());

        let outcome = source.download(&installer).await;
        assert!(outcome.is_success(), "{:?}", outcome);
        assert!(installer.exists());
        assert!(installer.vendor_path().is_file());
    }
}
