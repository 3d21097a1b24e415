use crate::download::ArchiveFormat;
use crate::error::InstallError;

/// Raw OS and architecture strings, as reported by the host or injected by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    Darwin,
    Linux,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Arm64,
}

/// The normalized (OS family, architecture) pair a release asset is chosen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformKey {
    pub os: OsFamily,
    pub arch: Arch,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Normalize into a [`PlatformKey`]. Architecture is checked before the OS.
    pub fn resolve(&self) -> Result<PlatformKey, InstallError> {
        let arch = match self.arch.to_lowercase().as_str() {
            "x86_64" | "amd64" => Arch::X86_64,
            "arm64" | "aarch64" => Arch::Arm64,
            _ => return Err(InstallError::UnsupportedArchitecture(self.arch.clone())),
        };

        // Rust reports macOS as "macos"; release assets call it Darwin
        let os = match self.os.to_lowercase().as_str() {
            "windows" => OsFamily::Windows,
            "darwin" | "macos" => OsFamily::Darwin,
            "linux" => OsFamily::Linux,
            _ => return Err(InstallError::UnsupportedOperatingSystem(self.os.clone())),
        };

        tracing::debug!(
            "Resolved platform {}/{} to {:?}/{:?}",
            self.os,
            self.arch,
            os,
            arch
        );
        Ok(PlatformKey { os, arch })
    }
}

impl OsFamily {
    pub fn label(self) -> &'static str {
        match self {
            OsFamily::Windows => "Windows",
            OsFamily::Darwin => "Darwin",
            OsFamily::Linux => "Linux",
        }
    }
}

impl Arch {
    pub fn label(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl PlatformKey {
    pub fn archive_format(self) -> ArchiveFormat {
        match self.os {
            OsFamily::Windows => ArchiveFormat::Zip,
            OsFamily::Darwin | OsFamily::Linux => ArchiveFormat::TarGz,
        }
    }

    /// Substring matched against release asset names, e.g. `Linux_x86_64.tar.gz`.
    pub fn archive_suffix(self) -> String {
        format!(
            "{}_{}.{}",
            self.os.label(),
            self.arch.label(),
            self.archive_format().extension()
        )
    }
}

/// Resolve a platform straight to its `(archive suffix, format)` pair.
pub fn resolve(platform: &Platform) -> Result<(String, ArchiveFormat), InstallError> {
    let key = platform.resolve()?;
    Ok((key.archive_suffix(), key.archive_format()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_platforms() {
        let cases = [
            ("windows", "x86_64", "Windows_x86_64.zip", ArchiveFormat::Zip),
            ("windows", "arm64", "Windows_arm64.zip", ArchiveFormat::Zip),
            ("darwin", "x86_64", "Darwin_x86_64.tar.gz", ArchiveFormat::TarGz),
            ("darwin", "arm64", "Darwin_arm64.tar.gz", ArchiveFormat::TarGz),
            ("linux", "x86_64", "Linux_x86_64.tar.gz", ArchiveFormat::TarGz),
            ("linux", "arm64", "Linux_arm64.tar.gz", ArchiveFormat::TarGz),
        ];

        for (os, arch, suffix, format) in cases {
            let (got_suffix, got_format) = resolve(&Platform::new(os, arch)).unwrap();
            assert_eq!(got_suffix, suffix, "{}/{}", os, arch);
            assert_eq!(got_format, format, "{}/{}", os, arch);
        }
    }

    #[test]
    fn test_aliases_and_case() {
        let (suffix, _) = resolve(&Platform::new("Linux", "amd64")).unwrap();
        assert_eq!(suffix, "Linux_x86_64.tar.gz");

        let (suffix, _) = resolve(&Platform::new("macos", "aarch64")).unwrap();
        assert_eq!(suffix, "Darwin_arm64.tar.gz");

        let (suffix, _) = resolve(&Platform::new("WINDOWS", "AMD64")).unwrap();
        assert_eq!(suffix, "Windows_x86_64.zip");
    }

    #[test]
    fn test_unsupported_architecture_carries_raw_value() {
        match resolve(&Platform::new("linux", "riscv64")) {
            Err(InstallError::UnsupportedArchitecture(raw)) => assert_eq!(raw, "riscv64"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_os_carries_raw_value() {
        match resolve(&Platform::new("FreeBSD", "x86_64")) {
            Err(InstallError::UnsupportedOperatingSystem(raw)) => assert_eq!(raw, "FreeBSD"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_current_platform_is_populated() {
        let info = Platform::current();
        assert!(!info.os.is_empty());
        assert!(!info.arch.is_empty());
    }
}
