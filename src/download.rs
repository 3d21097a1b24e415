use crate::error::InstallError;
use futures_util::{Stream, StreamExt};
use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Decide the format from the asset file name alone.
    pub fn from_filename(filename: &str) -> Result<Self, InstallError> {
        if filename.ends_with(".zip") {
            Ok(ArchiveFormat::Zip)
        } else if filename.ends_with(".tar.gz") {
            Ok(ArchiveFormat::TarGz)
        } else {
            Err(InstallError::UnsupportedArchiveExtension(
                filename.to_string(),
            ))
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }
}

/// Drain `stream` into `file`, flushing once every chunk is written.
/// Returns the number of bytes written.
pub async fn write_stream_to_file<S, T, E>(
    mut stream: S,
    file: &mut fs::File,
    path: &Path,
) -> Result<u64, InstallError>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    T: AsRef<[u8]>,
    E: Display,
{
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| InstallError::StreamRead(e.to_string()))?;
        let bytes = chunk.as_ref();
        file.write_all(bytes)
            .map_err(|source| InstallError::StreamWriteFailure {
                path: path.to_path_buf(),
                source,
            })?;
        written += bytes.len() as u64;
    }

    file.flush()
        .map_err(|source| InstallError::StreamWriteFailure {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!("Wrote {} bytes to {}", written, path.display());
    Ok(written)
}

pub async fn extract_archive(
    archive_path: &Path,
    format: ArchiveFormat,
    extract_dir: &Path,
) -> Result<(), InstallError> {
    tracing::debug!(
        "Extracting {} ({}) into {}",
        archive_path.display(),
        format.extension(),
        extract_dir.display()
    );

    match format {
        ArchiveFormat::Zip => extract_zip(archive_path, extract_dir),
        ArchiveFormat::TarGz => extract_tar_gz(archive_path, extract_dir).await,
    }
}

/// Unpack every entry of a zip archive. Unix permission bits stored in the
/// archive are applied to the extracted files.
fn extract_zip(archive_path: &Path, extract_dir: &Path) -> Result<(), InstallError> {
    let file = fs::File::open(archive_path).map_err(|e| InstallError::ArchiveOpenFailure {
        path: archive_path.to_path_buf(),
        source: e.into(),
    })?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|source| InstallError::ArchiveOpenFailure {
            path: archive_path.to_path_buf(),
            source,
        })?;

    archive
        .extract(extract_dir)
        .map_err(|e| InstallError::ArchiveExtractFailure {
            path: archive_path.to_path_buf(),
            details: e.to_string(),
        })
}

/// Hand tar.gz archives to the system `tar`. No timeout: archive size is unknown.
async fn extract_tar_gz(archive_path: &Path, extract_dir: &Path) -> Result<(), InstallError> {
    let output = Command::new("tar")
        .arg("-xzf")
        .arg(archive_path)
        .arg("-C")
        .arg(extract_dir)
        .output()
        .await
        .map_err(|e| InstallError::ArchiveExtractFailure {
            path: archive_path.to_path_buf(),
            details: format!("could not run tar: {}", e),
        })?;

    if !output.status.success() {
        return Err(InstallError::ArchiveExtractFailure {
            path: archive_path.to_path_buf(),
            details: format!(
                "tar exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    Ok(())
}
