//! On-disk side of the installer: where the binary lives, whether it is
//! usable, what version it reports, and the download → extract → copy
//! pipeline that puts it there.

use crate::download::{extract_archive, write_stream_to_file, ArchiveFormat};
use crate::error::InstallError;
use crate::notify::Notifier;
use fs4::fs_std::FileExt;
use futures_util::Stream;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use uuid::Uuid;

pub const DEFAULT_BINARY_NAME: &str = "spreadsheet";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Dropped into a binary directory the installer created itself. Only a
/// marked directory is deleted wholesale on removal.
const OWNED_DIR_MARKER: &str = ".spreadsheet-installer";

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^spreadsheet version (\d+\.\d+\.\d+)$").expect("version pattern is valid")
});

/// Anything that can report the currently installed version.
#[allow(async_fn_in_trait)]
pub trait VersionProbe {
    async fn installed_version(&self) -> Option<String>;
}

/// Primary and vendor locations of the binary. Both end in the same file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPath {
    bin_dir: PathBuf,
    vendor_bin_dir: PathBuf,
    binary_name: String,
}

impl TargetPath {
    /// Relative directories are resolved against the working directory. The
    /// primary directory is created immediately, and marked as owned if it did
    /// not exist before.
    pub fn new(
        bin_dir: impl AsRef<Path>,
        vendor_bin_dir: impl AsRef<Path>,
        binary_name: impl Into<String>,
    ) -> Result<Self, InstallError> {
        let bin_dir = absolute(bin_dir.as_ref())?;
        let vendor_bin_dir = absolute(vendor_bin_dir.as_ref())?;

        let target = Self {
            bin_dir,
            vendor_bin_dir,
            binary_name: binary_name.into(),
        };
        target.ensure_bin_dir()?;
        tracing::debug!("Binary directory: {}", target.bin_dir.display());

        Ok(target)
    }

    fn ensure_bin_dir(&self) -> io::Result<()> {
        if self.bin_dir.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&self.bin_dir)?;
        fs::write(self.owned_marker_path(), b"")
    }

    /// True when the primary directory was created by the installer.
    pub fn owns_bin_dir(&self) -> bool {
        self.owned_marker_path().is_file()
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    pub fn vendor_bin_dir(&self) -> &Path {
        &self.vendor_bin_dir
    }

    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    pub fn path(&self) -> PathBuf {
        self.bin_dir.join(&self.binary_name)
    }

    pub fn vendor_path(&self) -> PathBuf {
        self.vendor_bin_dir.join(&self.binary_name)
    }

    fn lock_path(&self) -> PathBuf {
        self.bin_dir.join(format!(".{}.lock", self.binary_name))
    }

    fn owned_marker_path(&self) -> PathBuf {
        self.bin_dir.join(OWNED_DIR_MARKER)
    }
}

fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Exclusive advisory lock held for the duration of one install.
pub struct InstallLock {
    file: fs::File,
    path: PathBuf,
}

impl InstallLock {
    pub fn acquire(path: &Path) -> Result<Self, InstallError> {
        let lock_err = |source| InstallError::Lock {
            path: path.to_path_buf(),
            source,
        };

        let file = fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(lock_err)?;
        file.lock_exclusive().map_err(lock_err)?;

        tracing::debug!("Acquired install lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveInstaller {
    target: TargetPath,
    temp_dir: PathBuf,
    probe_timeout: Duration,
}

impl ArchiveInstaller {
    pub fn new(target: TargetPath) -> Self {
        Self {
            target,
            temp_dir: std::env::temp_dir(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Directory for the downloaded archive. Defaults to the system temp dir.
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn target(&self) -> &TargetPath {
        &self.target
    }

    pub fn path(&self) -> PathBuf {
        self.target.path()
    }

    pub fn vendor_path(&self) -> PathBuf {
        self.target.vendor_path()
    }

    /// The primary binary is present and executable. On Windows "executable"
    /// means an `exe`, `bat` or `cmd` extension.
    pub fn exists(&self) -> bool {
        let path = self.path();
        let Ok(metadata) = fs::metadata(&path) else {
            return false;
        };

        if cfg!(windows) {
            let ext = path
                .extension()
                .and_then(|s| s.to_str())
                .unwrap_or("")
                .to_lowercase();
            return matches!(ext.as_str(), "exe" | "bat" | "cmd");
        }

        is_executable(&metadata)
    }

    /// Set permission bits on the primary binary. A missing file is left alone
    /// unless `force` is set, in which case an empty one is created first.
    pub fn chmod(&self, mode: u32, force: bool) -> Result<(), InstallError> {
        let path = self.path();

        if !path.exists() {
            if !force {
                return Ok(());
            }
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
        }

        set_mode(&path, mode)?;
        Ok(())
    }

    /// Ask the installed binary for its version. Never cached: the binary can
    /// change between calls.
    pub async fn version(&self) -> Option<String> {
        if !self.exists() {
            return None;
        }

        let path = self.path();
        let mut command = Command::new(&path);
        command.arg("--version").kill_on_drop(true);

        let output = match tokio::time::timeout(self.probe_timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                tracing::debug!("Could not run {} --version: {}", path.display(), e);
                return None;
            }
            Err(_) => {
                tracing::warn!(
                    "{} --version timed out after {:?}",
                    path.display(),
                    self.probe_timeout
                );
                return None;
            }
        };

        if !output.status.success() {
            tracing::debug!("{} --version exited with {}", path.display(), output.status);
            return None;
        }

        parse_version_output(&String::from_utf8_lossy(&output.stdout))
    }

    /// Write `stream` to a temporary archive, extract it into the primary
    /// directory, mark the binary executable and copy it to the vendor path.
    ///
    /// The temporary archive is removed on every exit path, including errors
    /// and cancellation of the returned future.
    pub async fn install_from_stream<S, T, E>(
        &self,
        stream: S,
        filename: &str,
        notifier: &dyn Notifier,
    ) -> Result<PathBuf, InstallError>
    where
        S: Stream<Item = Result<T, E>> + Unpin,
        T: AsRef<[u8]>,
        E: Display,
    {
        self.target.ensure_bin_dir()?;
        let _lock = InstallLock::acquire(&self.target.lock_path())?;

        let mut archive = self.allocate_archive(filename)?;
        let result = self
            .install_archive(&mut archive, stream, filename, notifier)
            .await;

        let archive_path = archive.path().to_path_buf();
        if let Err(e) = archive.close() {
            tracing::warn!(
                "Failed to remove temporary archive {}: {}",
                archive_path.display(),
                e
            );
        }

        result
    }

    async fn install_archive<S, T, E>(
        &self,
        archive: &mut NamedTempFile,
        stream: S,
        filename: &str,
        notifier: &dyn Notifier,
    ) -> Result<PathBuf, InstallError>
    where
        S: Stream<Item = Result<T, E>> + Unpin,
        T: AsRef<[u8]>,
        E: Display,
    {
        let archive_path = archive.path().to_path_buf();
        write_stream_to_file(stream, archive.as_file_mut(), &archive_path).await?;

        notifier.info("Extracting archive...");

        let format = ArchiveFormat::from_filename(filename)?;
        extract_archive(&archive_path, format, self.target.bin_dir()).await?;

        // Windows assets on Windows already carry the right attributes
        if !(filename.contains("Windows") && cfg!(windows)) {
            self.chmod(0o755, true)?;
        }

        self.copy_to_vendor()?;

        let path = self.path();
        notifier.info(&format!(
            "Spreadsheet binary installed successfully at {}.",
            path.display()
        ));
        Ok(path)
    }

    fn allocate_archive(&self, filename: &str) -> Result<NamedTempFile, InstallError> {
        let temp_err = |source| InstallError::TempFile {
            dir: self.temp_dir.clone(),
            source,
        };

        fs::create_dir_all(&self.temp_dir).map_err(temp_err)?;

        let token = Uuid::new_v4().simple().to_string();
        let safe_name: String = filename
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();

        let archive = tempfile::Builder::new()
            .prefix(&format!("{}_{}_", self.target.binary_name(), token))
            .suffix(&format!("_{}", safe_name))
            .tempfile_in(&self.temp_dir)
            .map_err(temp_err)?;

        tracing::debug!("Temporary archive: {}", archive.path().display());
        Ok(archive)
    }

    fn copy_to_vendor(&self) -> Result<(), InstallError> {
        let source = self.path();
        let destination = self.vendor_path();

        // Copying a file onto itself would truncate it
        if source == destination {
            return Ok(());
        }

        fs::create_dir_all(self.target.vendor_bin_dir())?;
        fs::copy(&source, &destination)?;
        tracing::debug!("Copied {} to {}", source.display(), destination.display());
        Ok(())
    }

    /// Delete the installed binary from both locations. A primary directory
    /// the installer created is removed entirely; a shared one keeps every
    /// file the installer did not write and is only removed once empty.
    /// Missing files are fine.
    pub fn remove(&self) -> Result<(), InstallError> {
        let bin_dir = self.target.bin_dir();
        if self.target.owns_bin_dir() {
            tracing::info!("Removing directory: {}", bin_dir.display());
            ignore_missing(fs::remove_dir_all(bin_dir))?;
        } else if bin_dir.exists() {
            for path in [self.path(), self.target.lock_path()] {
                if path.exists() {
                    tracing::info!("Removing file: {}", path.display());
                    ignore_missing(fs::remove_file(&path))?;
                }
            }
            if is_empty_dir(bin_dir)? {
                ignore_missing(fs::remove_dir(bin_dir))?;
            }
        }

        let vendor_path = self.vendor_path();
        if vendor_path.exists() {
            tracing::info!("Removing file: {}", vendor_path.display());
            ignore_missing(fs::remove_file(&vendor_path))?;
        }

        Ok(())
    }
}

impl VersionProbe for ArchiveInstaller {
    async fn installed_version(&self) -> Option<String> {
        self.version().await
    }
}

/// Extract the bare version from `spreadsheet version X.Y.Z` output.
pub fn parse_version_output(stdout: &str) -> Option<String> {
    VERSION_PATTERN
        .captures(stdout.trim())
        .map(|caps| caps[1].to_string())
}

fn ignore_missing(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    match fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(metadata: &fs::Metadata) -> bool {
    metadata.is_file()
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
