mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigAction};
use spreadsheet_installer::config::{
    self, get_setting, load_settings, load_settings_file, save_settings, set_setting,
    unset_setting, SETTING_KEYS,
};
use spreadsheet_installer::{
    ArchiveInstaller, ConsoleNotifier, GitHubSource, InstallOrchestrator, InstallOutcome,
    InstallerSettings, LifecycleHooks, LocalSource, Notifier, ReleaseSource, RepoId, TargetPath,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;

    let overrides = Overrides {
        repository: cli.repository.clone(),
        bin_dir: cli.bin_dir.clone(),
        vendor_bin_dir: cli.vendor_bin_dir.clone(),
    };
    let quiet = cli.quiet;

    match cli.command {
        Commands::Config { action } => handle_config(action),

        Commands::Install {
            force,
            strict,
            archive,
            archive_version,
        } => {
            let session = Session::load(overrides, quiet)?;
            let outcome = match archive {
                Some(archive) => {
                    let mut source = LocalSource::new(archive, session.notifier.clone());
                    if let Some(version) = archive_version {
                        source = source.with_version(version);
                    }
                    post_install(session.installer, source, force).await
                }
                None => {
                    let source = session.github_source()?;
                    post_install(session.installer, source, force).await
                }
            };

            match outcome {
                InstallOutcome::UpToDate => tracing::info!("Nothing to do"),
                InstallOutcome::Installed { asset, path } => {
                    tracing::info!("Installed {} from {}", path.display(), asset)
                }
                InstallOutcome::Failed(e) => {
                    tracing::debug!("Install failed ({:?}): {}", e.kind(), e);
                    if strict {
                        std::process::exit(1);
                    }
                }
            }
            Ok(())
        }

        Commands::Check => {
            let session = Session::load(overrides, quiet)?;
            let source = session.github_source()?;
            let mut orchestrator = InstallOrchestrator::new(session.installer, source);
            if orchestrator.is_up_to_date().await {
                println!("up to date");
                Ok(())
            } else {
                println!("not up to date");
                std::process::exit(1);
            }
        }

        Commands::Remove => {
            let session = Session::load(overrides, quiet)?;
            session.installer.remove()?;
            tracing::info!("Removed {}", session.installer.path().display());
            Ok(())
        }

        Commands::Version => {
            let session = Session::load(overrides, quiet)?;
            println!("spreadsheet-installer {}", cli::get_version());
            match session.installer.version().await {
                Some(version) => println!("{} {}", session.settings.binary_name, version),
                None => println!("{} not installed", session.settings.binary_name),
            }
            Ok(())
        }
    }
}

/// Global flags that take precedence over the config file and environment.
struct Overrides {
    repository: Option<String>,
    bin_dir: Option<PathBuf>,
    vendor_bin_dir: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, mut settings: InstallerSettings) -> InstallerSettings {
        if let Some(repository) = self.repository {
            settings.repository = repository;
        }
        if let Some(bin_dir) = self.bin_dir {
            settings.bin_dir = bin_dir.to_string_lossy().to_string();
        }
        if let Some(vendor_bin_dir) = self.vendor_bin_dir {
            settings.vendor_bin_dir = vendor_bin_dir.to_string_lossy().to_string();
        }
        settings
    }
}

/// Everything a non-config command works with.
struct Session {
    settings: InstallerSettings,
    installer: ArchiveInstaller,
    notifier: Arc<dyn Notifier>,
    quiet: bool,
}

impl Session {
    fn load(overrides: Overrides, quiet: bool) -> Result<Self> {
        let settings = overrides.apply(load_settings()?);
        let installer = build_installer(&settings)?;
        Ok(Self {
            settings,
            installer,
            notifier: Arc::new(ConsoleNotifier::new(quiet)),
            quiet,
        })
    }

    fn github_source(&self) -> Result<GitHubSource> {
        let repo = RepoId::parse(&self.settings.repository)
            .map_err(|e| anyhow!("Invalid repository: {}", e))?;
        Ok(GitHubSource::new(repo, self.notifier.clone())
            .with_api_base(self.settings.api_base_url.as_str())
            .with_progress(!self.quiet))
    }
}

async fn post_install<S: ReleaseSource>(
    installer: ArchiveInstaller,
    source: S,
    force: bool,
) -> InstallOutcome {
    InstallOrchestrator::new(installer, source)
        .on_post_install(force)
        .await
}

fn build_installer(settings: &InstallerSettings) -> Result<ArchiveInstaller> {
    let target = TargetPath::new(
        &settings.bin_dir,
        &settings.vendor_bin_dir,
        settings.binary_name.as_str(),
    )
    .with_context(|| format!("Could not prepare binary directory {}", settings.bin_dir))?;

    Ok(ArchiveInstaller::new(target)
        .with_probe_timeout(Duration::from_secs(settings.version_probe_timeout_secs)))
}

fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let settings = load_settings()?;
            if let Some(key) = key {
                match get_setting(&settings, &key) {
                    Some(value) => println!("{}", value),
                    None => println!("Setting '{}' not found", key),
                }
            } else {
                println!("--- Spreadsheet Installer Settings ---");
                for key in SETTING_KEYS {
                    if let Some(value) = get_setting(&settings, key) {
                        println!("  {}: {}", key, value);
                    }
                }
            }
        }
        ConfigAction::Set { args } => {
            let (key, value) = match args.as_slice() {
                [pair] => pair
                    .split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .ok_or_else(|| anyhow!("Invalid format. Use 'key=value' or 'key value'."))?,
                [key, value] => (key.clone(), value.clone()),
                _ => return Err(anyhow!("Invalid format. Use 'key=value' or 'key value'.")),
            };

            let mut settings = load_settings_file()?;
            set_setting(&mut settings, &key, &value)?;
            save_settings(&settings)?;
            tracing::info!(
                "Setting '{}' updated to '{}'",
                config::normalize_key(&key),
                value
            );
        }
        ConfigAction::Unset { key } => {
            let mut settings = load_settings_file()?;
            unset_setting(&mut settings, &key)?;
            save_settings(&settings)?;
            tracing::info!("Setting '{}' unset", config::normalize_key(&key));
        }
        ConfigAction::Show { format } => {
            let settings = load_settings()?;
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&settings)?),
                "yaml" => print!("{}", serde_yaml::to_string(&settings)?),
                "plain" => {
                    for key in SETTING_KEYS {
                        if let Some(value) = get_setting(&settings, key) {
                            println!("{}={}", key, value);
                        }
                    }
                }
                other => {
                    return Err(anyhow!(
                        "Unknown format '{}'. Use json, yaml or plain.",
                        other
                    ))
                }
            }
        }
    }

    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else if cli.verbose == 0 {
        "warn"
    } else if cli.verbose == 1 {
        "info"
    } else {
        "debug"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}
