use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

// Each test binary uses a different subset of these helpers.
#[allow(dead_code)]
pub struct TestContext {
    pub _temp_dir: TempDir,
    pub config_path: PathBuf,
    pub bin_dir: PathBuf,
    pub vendor_bin_dir: PathBuf,
    pub bin_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.json");
        let bin_dir = temp_dir.path().join("bin");
        let vendor_bin_dir = temp_dir.path().join("vendor").join("bin");

        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_spreadsheet-installer"));

        Self {
            _temp_dir: temp_dir,
            config_path,
            bin_dir,
            vendor_bin_dir,
            bin_path,
        }
    }

    pub fn root(&self) -> &std::path::Path {
        self._temp_dir.path()
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.env("SPREADSHEET_INSTALLER_CONFIG", &self.config_path);
        cmd.env("SPREADSHEET_INSTALLER_BIN_DIR", &self.bin_dir);
        cmd.env("SPREADSHEET_INSTALLER_VENDOR_BIN_DIR", &self.vendor_bin_dir);
        cmd.env_remove("SPREADSHEET_INSTALLER_REPOSITORY");
        cmd.env_remove("SPREADSHEET_INSTALLER_API_URL");
        cmd.env_remove("RUST_LOG");
        cmd.env("HOME", self._temp_dir.path());
        cmd.env("XDG_DATA_HOME", self._temp_dir.path().join("data"));
        cmd.env("XDG_CONFIG_HOME", self._temp_dir.path().join("config"));
        cmd
    }

    pub fn run(&self, args: &[&str]) -> CommandOutput {
        self.cmd()
            .args(args)
            .output()
            .expect("Failed to run spreadsheet-installer")
            .into()
    }
}

#[allow(dead_code)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

#[allow(dead_code)]
impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_failure(&self) -> &Self {
        if self.status.success() {
            panic!(
                "Command unexpectedly succeeded\nstdout: {}\nstderr: {}",
                self.stdout, self.stderr
            );
        }
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Stderr did not contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}

/// Shell script standing in for the real binary.
#[allow(dead_code)]
pub fn fake_binary(version: &str) -> Vec<u8> {
    format!("#!/bin/sh\necho 'spreadsheet version {}'\n", version).into_bytes()
}

/// A `.tar.gz` holding one executable entry named `name`.
#[allow(dead_code)]
pub fn tar_gz_archive(name: &str, contents: &[u8]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder
        .append_data(&mut header, name, contents)
        .expect("Failed to append tar entry");

    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .expect("Failed to finish tar.gz")
}

/// A `.zip` holding one entry named `name`.
#[allow(dead_code)]
pub fn zip_archive(name: &str, contents: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file(name, zip::write::FileOptions::default().unix_permissions(0o755))
        .expect("Failed to start zip entry");
    writer.write_all(contents).expect("Failed to write zip entry");
    writer
        .finish()
        .expect("Failed to finish zip")
        .into_inner()
}
