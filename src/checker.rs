// Update orchestration: metadata, identity, latest version, verdict

use crate::cache::ResolutionCache;
use crate::config::Config;
use crate::metadata::{self, MetadataExtractor};
use crate::models::{DownloadRecord, PackageMetadata, ProjectIds, UpdateVerdict, VersionRecord};
use crate::providers::ProviderRegistry;
use crate::version;
use chrono::Utc;
use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Returned when the run was stopped by the user between packages
#[derive(Debug)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Interrupted by user")
    }
}

impl std::error::Error for Interrupted {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoIdentity,
    Ignored,
    NoCurrentVersion,
}

/// Terminal state of one package
#[derive(Debug)]
pub enum PackageOutcome {
    Skipped(SkipReason),
    /// No provider had a usable release
    NoVersionInfo,
    Ready(Box<UpdateVerdict>),
}

pub struct UpdateChecker<'a> {
    config: &'a Config,
    registry: &'a ProviderRegistry,
    cache: &'a mut ResolutionCache,
    extractor: &'a dyn MetadataExtractor,
    force_refresh: bool,
    interrupt: Option<Arc<AtomicBool>>,
    progress: ProgressBar,
}

impl<'a> UpdateChecker<'a> {
    pub fn new(
        config: &'a Config,
        registry: &'a ProviderRegistry,
        cache: &'a mut ResolutionCache,
        extractor: &'a dyn MetadataExtractor,
    ) -> Self {
        Self {
            config,
            registry,
            cache,
            extractor,
            force_refresh: false,
            interrupt: None,
            progress: ProgressBar::hidden(),
        }
    }

    /// Ignore cached metadata, project ids and versions
    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    fn is_interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Scan the configured directories and produce a verdict per package.
    ///
    /// Fails only when no configured directory exists (or on interrupt).
    pub async fn check_updates(&mut self) -> anyhow::Result<Vec<UpdateVerdict>> {
        let dirs = self.config.valid_mod_directories();
        if dirs.is_empty() {
            anyhow::bail!("No valid mod directories found in configuration");
        }

        self.cache.prune_expired(self.config.version_max_age_days);

        let mut files = Vec::new();
        for dir in &dirs {
            debug!("Scanning directory: {}", dir.display());
            files.extend(metadata::find_mod_files(dir, self.config.recursive_scan));
        }

        if files.is_empty() {
            warn!("No mod files found in configured directories");
        }

        self.check_paths(&files).await
    }

    /// Run every file through the state machine in order, then evict and save
    pub async fn check_paths(&mut self, files: &[PathBuf]) -> anyhow::Result<Vec<UpdateVerdict>> {
        self.progress.set_length(files.len() as u64);

        let mut seen = HashSet::new();
        let mut verdicts = Vec::new();

        for path in files {
            if self.is_interrupted() {
                self.progress.abandon();
                warn!("Interrupted, saving cache without cleanup");
                if let Err(e) = self.cache.save() {
                    error!("Failed to save cache: {}", e);
                }
                return Err(Interrupted.into());
            }

            let key = metadata::normalize_path(path);
            if !seen.insert(key.clone()) {
                continue;
            }

            if let Some(name) = path.file_name() {
                self.progress.set_message(name.to_string_lossy().to_string());
            }

            match self.check_package(path, &key).await {
                PackageOutcome::Ready(verdict) => verdicts.push(*verdict),
                PackageOutcome::Skipped(reason) => {
                    debug!("Skipped {}: {:?}", path.display(), reason);
                }
                PackageOutcome::NoVersionInfo => {
                    info!("No update information found for {}", path.display());
                }
            }
            self.progress.inc(1);
        }

        self.progress.finish_and_clear();

        self.cache.evict_missing(&seen);
        self.cache.mark_full_scan();
        if let Err(e) = self.cache.save() {
            error!("Failed to save cache: {}", e);
        }

        Ok(verdicts)
    }

    async fn check_package(&mut self, path: &Path, key: &str) -> PackageOutcome {
        let metadata = self.resolve_metadata(path, key);

        let Some(mod_id) = metadata.mod_id.clone() else {
            warn!("Could not determine mod ID for {}", path.display());
            return PackageOutcome::Skipped(SkipReason::NoIdentity);
        };

        if self.config.is_ignored(&mod_id) {
            info!("Skipping ignored mod: {}", mod_id);
            return PackageOutcome::Skipped(SkipReason::Ignored);
        }

        let project_ids = self.resolve_project_ids(&mod_id).await;

        let Some(current_version) = metadata.version.clone() else {
            warn!("Could not determine current version for {}", mod_id);
            return PackageOutcome::Skipped(SkipReason::NoCurrentVersion);
        };

        let Some(record) = self.resolve_latest(&project_ids).await else {
            return PackageOutcome::NoVersionInfo;
        };

        let Some(latest_version) = record.version_number.clone() else {
            warn!("No version number in update info for {}", mod_id);
            return PackageOutcome::NoVersionInfo;
        };

        if !version::is_valid(&current_version) {
            warn!(
                "Installed version '{}' of {} does not look like a version number",
                current_version, mod_id
            );
        }

        let update_available = version::has_update(&current_version, &latest_version);
        if update_available {
            debug!(
                "Update available for {}: {} -> {}",
                mod_id, current_version, latest_version
            );
        } else {
            debug!(
                "No update needed for {} (current: {}, latest: {})",
                mod_id, current_version, latest_version
            );
        }

        PackageOutcome::Ready(Box::new(UpdateVerdict {
            mod_name: metadata.mod_name.clone().unwrap_or_else(|| mod_id.clone()),
            mod_id,
            current_file: metadata.file_name.clone(),
            current_version,
            latest_version,
            update_available,
            provider: record.provider.clone(),
            record,
            metadata,
        }))
    }

    fn resolve_metadata(&mut self, path: &Path, key: &str) -> PackageMetadata {
        if !self.force_refresh
            && let Some(cached) = self.cache.get_metadata(key)
        {
            debug!("Using cached metadata for {}", key);
            return cached.clone();
        }

        debug!("Extracting metadata from {}", path.display());
        let metadata = self.extractor.extract(path);
        self.cache.set_metadata(key, metadata.clone());
        metadata
    }

    async fn resolve_project_ids(&mut self, mod_id: &str) -> ProjectIds {
        let cached = self.cache.get_project_ids(mod_id);
        let mut updates = ProjectIds::new();

        for provider in self.registry.available() {
            let name = provider.name();
            let known = cached.get(name).cloned().flatten();
            if known.is_some() && !self.force_refresh {
                continue;
            }

            let found = provider.resolve_identity(mod_id).await;
            debug!("{} project id for {}: {:?}", name, mod_id, found);
            updates.insert(name.to_string(), found);
        }

        if !updates.is_empty() {
            self.cache.set_project_ids(mod_id, &updates);
        }
        self.cache.get_project_ids(mod_id)
    }

    async fn resolve_latest(&mut self, project_ids: &ProjectIds) -> Option<VersionRecord> {
        let game_version = self.config.minecraft_version.as_str();
        let loader = self.config.loader();
        let order = self.registry.preference_order();

        if !self.force_refresh {
            for name in order {
                let Some(Some(project_id)) = project_ids.get(name) else {
                    continue;
                };
                if let Some(cached) =
                    self.cache
                        .get_version(name, project_id, game_version, loader.as_str())
                {
                    debug!("Using cached {} version for {}", name, project_id);
                    return Some(cached.clone());
                }
            }
        }

        let mut best = None;
        for name in order {
            let Some(Some(project_id)) = project_ids.get(name) else {
                continue;
            };
            let Some(provider) = self.registry.get(name) else {
                continue;
            };

            if let Some(record) = provider.resolve_latest(project_id, game_version, loader).await {
                self.cache.set_version(
                    name,
                    project_id,
                    game_version,
                    loader.as_str(),
                    record.clone(),
                );
                if best.is_none() {
                    best = Some(record);
                }
            }
        }
        best
    }

    /// Download the latest release for each verdict; returns those that succeeded.
    ///
    /// In dry-run mode nothing is transferred and every verdict with an
    /// available provider counts as succeeded.
    pub async fn download_updates(
        &mut self,
        verdicts: &[UpdateVerdict],
        dry_run: bool,
    ) -> Vec<UpdateVerdict> {
        if verdicts.is_empty() {
            return Vec::new();
        }

        let download_dir = self.config.download_dir();
        if !dry_run && let Err(e) = fs::create_dir_all(&download_dir) {
            error!(
                "Failed to create download directory {}: {}",
                download_dir.display(),
                e
            );
            return Vec::new();
        }

        let mut succeeded = Vec::new();
        for verdict in verdicts {
            if self.is_interrupted() {
                warn!("Interrupted, skipping remaining downloads");
                break;
            }

            let Some(provider) = self.registry.get(&verdict.provider) else {
                error!(
                    "Provider {} not available for {}",
                    verdict.provider, verdict.mod_id
                );
                continue;
            };

            let filename = output_filename(&verdict.mod_id, &verdict.mod_name, &verdict.latest_version);
            let destination = download_dir.join(&filename);

            if dry_run {
                info!(
                    "[DRY RUN] Would download {} v{} to {}",
                    verdict.mod_id,
                    verdict.latest_version,
                    destination.display()
                );
                succeeded.push(verdict.clone());
                continue;
            }

            debug!(
                "Downloading {} v{} to {}",
                verdict.mod_id,
                verdict.latest_version,
                destination.display()
            );
            if provider.download(&verdict.record, &destination).await {
                self.cache.record_download(
                    &verdict.mod_id,
                    &verdict.latest_version,
                    DownloadRecord {
                        path: destination.to_string_lossy().to_string(),
                        provider: verdict.provider.clone(),
                        downloaded_at: Utc::now().to_rfc3339(),
                    },
                );
                succeeded.push(verdict.clone());
            } else {
                error!(
                    "Failed to download {} v{}",
                    verdict.mod_id, verdict.latest_version
                );
            }
        }

        if !dry_run && let Err(e) = self.cache.save() {
            error!("Failed to save cache: {}", e);
        }

        succeeded
    }
}

/// `<name>-<version>.jar` with spaces turned into underscores and other
/// unsafe characters dropped
pub fn output_filename(mod_id: &str, mod_name: &str, version: &str) -> String {
    let base = if mod_name.trim().is_empty() {
        mod_id.to_string()
    } else {
        mod_name.trim().replace(' ', "_")
    };
    let base: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    let version: String = version
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+'))
        .collect();

    format!("{}-{}.jar", base, version)
}
