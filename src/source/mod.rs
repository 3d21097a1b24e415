//! Where releases come from.
//!
//! A [`ReleaseSource`] knows the latest published version and how to hand an
//! archive for this host to an [`ArchiveInstaller`]. The GitHub implementation
//! talks to the releases API; [`LocalSource`] installs a pre-downloaded
//! archive for offline machines.

pub mod github;
pub mod local;

pub use github::GitHubSource;
pub use local::LocalSource;

use crate::error::InstallError;
use crate::install::{ArchiveInstaller, VersionProbe};
use crate::notify::Notifier;
use crate::version;
use serde_json::Value;
use std::path::PathBuf;

#[allow(async_fn_in_trait)]
pub trait ReleaseSource {
    /// Latest published version, without a leading `v`. Failures are reported
    /// on the notifier and come back as `None`.
    async fn version(&mut self) -> Option<String>;

    /// Install the archive matching this host. Never panics or raises: every
    /// failure is reported on the notifier and returned as
    /// [`DownloadOutcome::Failed`].
    async fn download(&mut self, installer: &ArchiveInstaller) -> DownloadOutcome;

    fn notifier(&self) -> &dyn Notifier;

    /// True only when both versions are known and the installed one is at
    /// least the latest.
    async fn is_up_to_date<P: VersionProbe>(&mut self, probe: &P) -> bool {
        let current = probe.installed_version().await;
        let latest = self.version().await;

        match (current, latest) {
            (Some(current), Some(latest)) if version::is_at_least(&current, &latest) => {
                self.notifier().info("Spreadsheet is already up to date.");
                true
            }
            (current, latest) => {
                tracing::debug!(
                    "Not up to date (installed: {:?}, latest: {:?})",
                    current,
                    latest
                );
                false
            }
        }
    }
}

#[derive(Debug)]
pub enum DownloadOutcome {
    Installed { asset: String, path: PathBuf },
    Failed(InstallError),
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadOutcome::Installed { .. })
    }

    pub fn error(&self) -> Option<&InstallError> {
        match self {
            DownloadOutcome::Failed(e) => Some(e),
            DownloadOutcome::Installed { .. } => None,
        }
    }
}

/// One entry of a release's asset list. Either field may be missing or of the
/// wrong type in the API response; such entries are skipped during selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: Option<String>,
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub version: Option<String>,
    pub assets: Option<Vec<ReleaseAsset>>,
}

impl ReleaseInfo {
    /// Read the fields we need from a releases API body, tolerating anything
    /// missing or mistyped.
    pub fn from_json(body: &Value) -> Self {
        let version = body
            .get("tag_name")
            .and_then(Value::as_str)
            .map(|tag| version::normalize(tag).to_string());

        let assets = body.get("assets").and_then(Value::as_array).map(|list| {
            list.iter()
                .map(|asset| ReleaseAsset {
                    name: asset.get("name").and_then(Value::as_str).map(String::from),
                    download_url: asset
                        .get("browser_download_url")
                        .and_then(Value::as_str)
                        .map(String::from),
                })
                .collect()
        });

        Self { version, assets }
    }

    pub fn has_assets(&self) -> bool {
        self.assets.as_ref().is_some_and(|assets| !assets.is_empty())
    }
}

/// Release metadata as held by a source: not fetched yet, or fetched (possibly
/// empty). A fetched value is never refreshed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReleaseCache {
    #[default]
    NotFetched,
    Fetched(ReleaseInfo),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedAsset {
    pub name: String,
    pub download_url: String,
}

/// First asset, in list order, whose name contains `suffix`.
pub fn select_asset(release: &ReleaseInfo, suffix: &str) -> Result<SelectedAsset, InstallError> {
    let assets = match &release.assets {
        Some(assets) if !assets.is_empty() => assets,
        _ => return Err(InstallError::NoAssetsInRelease),
    };

    for asset in assets {
        let (Some(name), Some(url)) = (&asset.name, &asset.download_url) else {
            tracing::trace!("Skipping malformed asset entry: {:?}", asset);
            continue;
        };

        if name.contains(suffix) {
            tracing::debug!("Selected asset '{}'", name);
            return Ok(SelectedAsset {
                name: name.clone(),
                download_url: url.clone(),
            });
        }
    }

    Err(InstallError::NoMatchingAsset {
        suffix: suffix.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn release(assets: Value) -> ReleaseInfo {
        ReleaseInfo::from_json(&json!({ "tag_name": "v1.0.0", "assets": assets }))
    }

    #[test]
    fn test_from_json_normalizes_tag() {
        let info = ReleaseInfo::from_json(&json!({ "tag_name": "v1.4.2", "assets": [] }));
        assert_eq!(info.version.as_deref(), Some("1.4.2"));
        assert_eq!(info.assets, Some(vec![]));
    }

    #[test]
    fn test_from_json_tolerates_missing_and_mistyped_fields() {
        let info = ReleaseInfo::from_json(&json!({ "tag_name": 42 }));
        assert_eq!(info, ReleaseInfo::default());

        let info = ReleaseInfo::from_json(&json!({ "assets": "nope" }));
        assert!(info.assets.is_none());
        assert!(!info.has_assets());
    }

    #[test]
    fn test_select_first_matching_asset() {
        let info = release(json!([
            {
                "name": "spreadsheet_Darwin_x86_64.tar.gz",
                "browser_download_url": "https://x/darwin"
            },
            {
                "name": "spreadsheet_Linux_x86_64.tar.gz",
                "browser_download_url": "https://x/first"
            },
            {
                "name": "spreadsheet_Linux_x86_64.tar.gz.sbom",
                "browser_download_url": "https://x/second"
            },
        ]));

        let asset = select_asset(&info, "Linux_x86_64.tar.gz").unwrap();
        assert_eq!(asset.name, "spreadsheet_Linux_x86_64.tar.gz");
        assert_eq!(asset.download_url, "https://x/first");
    }

    #[test]
    fn test_select_skips_malformed_entries() {
        let info = release(json!([
            { "name": 7, "browser_download_url": "https://x/bad-name" },
            { "name": "spreadsheet_Linux_arm64.tar.gz" },
            { "name": "spreadsheet_Linux_arm64.tar.gz", "browser_download_url": "https://x/good" },
        ]));

        let asset = select_asset(&info, "Linux_arm64.tar.gz").unwrap();
        assert_eq!(asset.download_url, "https://x/good");
    }

    #[test]
    fn test_select_without_assets() {
        let info = ReleaseInfo::from_json(&json!({ "tag_name": "v1.0.0" }));
        assert!(matches!(
            select_asset(&info, "Linux_x86_64.tar.gz"),
            Err(InstallError::NoAssetsInRelease)
        ));

        let info = release(json!([]));
        assert!(matches!(
            select_asset(&info, "Linux_x86_64.tar.gz"),
            Err(InstallError::NoAssetsInRelease)
        ));
    }

    #[test]
    fn test_select_without_match() {
        let info = release(json!([
            { "name": "spreadsheet_Windows_x86_64.zip", "browser_download_url": "https://x/win" },
        ]));

        match select_asset(&info, "Linux_x86_64.tar.gz") {
            Err(InstallError::NoMatchingAsset { suffix }) => {
                assert_eq!(suffix, "Linux_x86_64.tar.gz")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
