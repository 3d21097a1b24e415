//! GitHub releases API source.

use crate::error::InstallError;
use crate::install::ArchiveInstaller;
use crate::notify::Notifier;
use crate::platform::Platform;
use crate::repo_id::RepoId;
use crate::source::{
    select_asset, DownloadOutcome, ReleaseCache, ReleaseInfo, ReleaseSource, SelectedAsset,
};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response};
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT_VALUE: &str = concat!("spreadsheet-installer/", env!("CARGO_PKG_VERSION"));
const PROGRESS_TEMPLATE: &str =
    "{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})";

pub struct GitHubSource {
    client: Client,
    repo: RepoId,
    api_base: String,
    platform: Platform,
    notifier: Arc<dyn Notifier>,
    cache: ReleaseCache,
    show_progress: bool,
}

impl GitHubSource {
    pub fn new(repo: RepoId, notifier: Arc<dyn Notifier>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if let Ok(value) = HeaderValue::from_str(&format!("token {}", token)) {
                headers.insert(AUTHORIZATION, value);
                tracing::debug!("Using GITHUB_TOKEN");
            }
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            repo,
            api_base: DEFAULT_API_BASE.to_string(),
            platform: Platform::current(),
            notifier,
            cache: ReleaseCache::NotFetched,
            show_progress: true,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Select assets for `platform` instead of the running host.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Draw a download progress bar on stderr. On by default.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn cache(&self) -> &ReleaseCache {
        &self.cache
    }

    async fn request(&self, url: &str) -> Result<Response, InstallError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| InstallError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::RequestFailed {
                status,
                url: url.to_string(),
            });
        }

        Ok(response)
    }

    async fn fetch_release(&self) -> Result<ReleaseInfo, InstallError> {
        let url = self.repo.latest_release_url(&self.api_base);
        let response = self.request(&url).await?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|source| InstallError::Transport {
                url: url.clone(),
                source,
            })?;

        Ok(ReleaseInfo::from_json(&body))
    }

    /// Release metadata, fetched on first use. A failed fetch is left uncached
    /// so a later call can try again.
    async fn fetch(&mut self) -> Result<ReleaseInfo, InstallError> {
        if let ReleaseCache::Fetched(info) = &self.cache {
            return Ok(info.clone());
        }

        let info = self.fetch_release().await?;
        self.cache = ReleaseCache::Fetched(info.clone());
        Ok(info)
    }

    async fn retrieve_download_info(&mut self) -> Result<SelectedAsset, InstallError> {
        let release = self.fetch().await?;
        if !release.has_assets() {
            return Err(InstallError::NoAssetsInRelease);
        }

        let key = self.platform.resolve()?;
        select_asset(&release, &key.archive_suffix())
    }

    async fn try_download(
        &mut self,
        installer: &ArchiveInstaller,
    ) -> Result<(String, PathBuf), InstallError> {
        let asset = self.retrieve_download_info().await?;

        self.notifier.info(&format!(
            "Downloading archive from GitHub: {}",
            asset.download_url
        ));

        let response = self.request(&asset.download_url).await?;
        let pb = if self.show_progress {
            progress_bar(response.content_length(), &asset.name)
        } else {
            ProgressBar::hidden()
        };
        let progress = pb.clone();
        let stream = Box::pin(response.bytes_stream().inspect(move |chunk| {
            if let Ok(bytes) = chunk {
                progress.inc(bytes.len() as u64);
            }
        }));

        let installed = installer
            .install_from_stream(stream, &asset.name, self.notifier.as_ref())
            .await;
        pb.finish_and_clear();

        Ok((asset.name, installed?))
    }
}

impl ReleaseSource for GitHubSource {
    async fn version(&mut self) -> Option<String> {
        match self.fetch().await {
            Ok(info) => info.version,
            Err(e) => {
                self.notifier.error(&format!(
                    "Failed to fetch the latest release from GitHub: {}",
                    e
                ));
                None
            }
        }
    }

    async fn download(&mut self, installer: &ArchiveInstaller) -> DownloadOutcome {
        match self.try_download(installer).await {
            Ok((asset, path)) => DownloadOutcome::Installed { asset, path },
            Err(e) => {
                self.notifier
                    .error(&format!("Failed to download archive from GitHub: {}", e));
                DownloadOutcome::Failed(e)
            }
        }
    }

    fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }
}

fn progress_bar(total_size: Option<u64>, filename: &str) -> ProgressBar {
    let pb = match total_size {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(PROGRESS_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };
    pb.set_message(format!("Downloading {}", filename));
    pb
}
