// Resolution cache persisted as mod_cache.json

use crate::constants::KNOWN_PROVIDERS;
use crate::models::{DownloadRecord, PackageMetadata, ProjectIds, VersionRecord};
use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Entry counts reported by `cache status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub mod_files: usize,
    pub project_ids: usize,
    pub latest_versions: usize,
    pub downloaded_files: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionCache {
    #[serde(skip)]
    path: Option<PathBuf>,

    /// RFC 3339 timestamp of the last completed scan
    pub last_scan: Option<String>,
    pub mod_files: BTreeMap<String, PackageMetadata>,
    pub project_ids: BTreeMap<String, ProjectIds>,
    pub latest_versions: BTreeMap<String, VersionRecord>,
    pub downloaded_files: BTreeMap<String, DownloadRecord>,
}

impl ResolutionCache {
    /// An empty cache that is never written to disk
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache from `path`.
    ///
    /// A missing file yields an empty cache. A file that cannot be read or
    /// parsed is moved aside to `<path>.bak` and an empty cache is returned.
    pub fn load(path: &Path) -> Self {
        let mut cache = if path.exists() {
            match Self::read(path) {
                Ok(cache) => {
                    debug!("Loaded cache from {}", path.display());
                    cache
                }
                Err(e) => {
                    let backup = sibling(path, "bak");
                    warn!(
                        "Cache file {} is corrupt ({}). Moving it to {} and starting fresh",
                        path.display(),
                        e,
                        backup.display()
                    );
                    if let Err(e) = fs::rename(path, &backup) {
                        warn!("Could not back up corrupt cache file: {}", e);
                    }
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        cache.path = Some(path.to_path_buf());
        cache
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write the cache atomically: `<path>.tmp` first, then rename over `<path>`
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let tmp = sibling(path, "tmp");
        let text = serde_json::to_string_pretty(self)?;
        fs::write(&tmp, text)?;
        fs::rename(&tmp, path)?;
        debug!("Saved cache to {}", path.display());
        Ok(())
    }

    pub fn mark_full_scan(&mut self) {
        self.mark_full_scan_at(Utc::now());
    }

    pub fn mark_full_scan_at(&mut self, now: DateTime<Utc>) {
        self.last_scan = Some(now.to_rfc3339());
    }

    /// Whether the last full scan is missing or older than `expiry_hours`
    pub fn is_stale(&self, expiry_hours: u64) -> bool {
        self.is_stale_at(expiry_hours, Utc::now())
    }

    pub fn is_stale_at(&self, expiry_hours: u64, now: DateTime<Utc>) -> bool {
        let Some(last_scan) = &self.last_scan else {
            return true;
        };

        match parse_timestamp(last_scan) {
            // An expiry too large to represent never elapses
            Some(scanned) => hours(expiry_hours).is_some_and(|expiry| now - scanned > expiry),
            None => {
                warn!("Invalid last_scan timestamp '{}', treating cache as stale", last_scan);
                true
            }
        }
    }

    /// Project ids for `mod_id`, with every known provider present
    pub fn get_project_ids(&self, mod_id: &str) -> ProjectIds {
        let mut ids: ProjectIds = KNOWN_PROVIDERS
            .iter()
            .map(|name| (name.to_string(), None))
            .collect();

        if let Some(stored) = self.project_ids.get(mod_id) {
            for (provider, id) in stored {
                ids.insert(provider.clone(), id.clone());
            }
        }
        ids
    }

    /// Merge `updates` into the stored ids. An absent value never clears a known id.
    pub fn set_project_ids(&mut self, mod_id: &str, updates: &ProjectIds) {
        let entry = self.project_ids.entry(mod_id.to_string()).or_insert_with(|| {
            KNOWN_PROVIDERS
                .iter()
                .map(|name| (name.to_string(), None))
                .collect()
        });

        for (provider, id) in updates {
            if let Some(id) = id {
                entry.insert(provider.clone(), Some(id.clone()));
            } else {
                entry.entry(provider.clone()).or_insert(None);
            }
        }
    }

    pub fn get_metadata(&self, file_path: &str) -> Option<&PackageMetadata> {
        self.mod_files.get(file_path)
    }

    pub fn set_metadata(&mut self, file_path: &str, metadata: PackageMetadata) {
        self.mod_files.insert(file_path.to_string(), metadata);
    }

    pub fn get_version(
        &self,
        provider: &str,
        project_id: &str,
        game_version: &str,
        loader: &str,
    ) -> Option<&VersionRecord> {
        self.latest_versions
            .get(&version_key(provider, project_id, game_version, loader))
    }

    pub fn set_version(
        &mut self,
        provider: &str,
        project_id: &str,
        game_version: &str,
        loader: &str,
        record: VersionRecord,
    ) {
        self.latest_versions
            .insert(version_key(provider, project_id, game_version, loader), record);
    }

    /// Drop version records published more than `max_age_days` ago.
    ///
    /// Records without a parseable publish timestamp are kept.
    pub fn prune_expired(&mut self, max_age_days: u64) -> usize {
        self.prune_expired_at(max_age_days, Utc::now())
    }

    pub fn prune_expired_at(&mut self, max_age_days: u64, now: DateTime<Utc>) -> usize {
        let Some(max_age) = days(max_age_days) else {
            debug!("Maximum age of {} days never expires, nothing to prune", max_age_days);
            return 0;
        };
        let before = self.latest_versions.len();

        self.latest_versions.retain(|key, record| {
            let Some(published) = &record.date_published else {
                return true;
            };
            match parse_timestamp(published) {
                Some(published) => now - published <= max_age,
                None => {
                    warn!("Invalid publish date '{}' for cached entry {}", published, key);
                    true
                }
            }
        });

        let pruned = before - self.latest_versions.len();
        if pruned > 0 {
            debug!("Pruned {} expired version entries", pruned);
        }
        pruned
    }

    /// Remove metadata for files not in `current_files`
    pub fn evict_missing(&mut self, current_files: &HashSet<String>) -> usize {
        let before = self.mod_files.len();
        self.mod_files.retain(|path, _| current_files.contains(path));
        let evicted = before - self.mod_files.len();
        if evicted > 0 {
            debug!("Evicted {} stale file entries", evicted);
        }
        evicted
    }

    pub fn record_download(&mut self, mod_id: &str, version: &str, record: DownloadRecord) {
        self.downloaded_files
            .insert(format!("{}:{}", mod_id, version), record);
    }

    pub fn get_download(&self, mod_id: &str, version: &str) -> Option<&DownloadRecord> {
        self.downloaded_files.get(&format!("{}:{}", mod_id, version))
    }

    /// Full reset, including project identities
    pub fn clear(&mut self) {
        self.last_scan = None;
        self.mod_files.clear();
        self.project_ids.clear();
        self.latest_versions.clear();
        self.downloaded_files.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            mod_files: self.mod_files.len(),
            project_ids: self.project_ids.len(),
            latest_versions: self.latest_versions.len(),
            downloaded_files: self.downloaded_files.len(),
        }
    }
}

pub fn version_key(provider: &str, project_id: &str, game_version: &str, loader: &str) -> String {
    format!("{}:{}:{}:{}", provider, project_id, game_version, loader)
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn hours(hours: u64) -> Option<TimeDelta> {
    i64::try_from(hours).ok().and_then(TimeDelta::try_hours)
}

fn days(days: u64) -> Option<TimeDelta> {
    i64::try_from(days).ok().and_then(TimeDelta::try_days)
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn record(published: Option<&str>) -> VersionRecord {
        let mut record = VersionRecord::new("modrinth", "AANobbMI");
        record.version_number = Some("0.5.8".into());
        record.date_published = published.map(String::from);
        record
    }

    fn ids(pairs: &[(&str, Option<&str>)]) -> ProjectIds {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(String::from)))
            .collect()
    }

    #[test]
    fn test_unseen_mod_has_all_providers_absent() {
        let cache = ResolutionCache::new();
        let result = cache.get_project_ids("sodium");
        assert_eq!(result, ids(&[("curseforge", None), ("modrinth", None)]));
    }

    #[test]
    fn test_set_project_ids_never_clears() {
        let mut cache = ResolutionCache::new();
        cache.set_project_ids("sodium", &ids(&[("modrinth", Some("AANobbMI"))]));
        cache.set_project_ids(
            "sodium",
            &ids(&[("modrinth", None), ("curseforge", Some("394468"))]),
        );

        let result = cache.get_project_ids("sodium");
        assert_eq!(result["modrinth"].as_deref(), Some("AANobbMI"));
        assert_eq!(result["curseforge"].as_deref(), Some("394468"));
    }

    #[test]
    fn test_version_keyed_by_tuple() {
        let mut cache = ResolutionCache::new();
        cache.set_version("modrinth", "AANobbMI", "1.20.1", "fabric", record(None));

        assert!(cache.get_version("modrinth", "AANobbMI", "1.20.1", "fabric").is_some());
        assert!(cache.get_version("modrinth", "AANobbMI", "1.20.1", "forge").is_none());
        assert!(cache.get_version("curseforge", "AANobbMI", "1.20.1", "fabric").is_none());
        assert!(
            cache
                .latest_versions
                .contains_key("modrinth:AANobbMI:1.20.1:fabric")
        );
    }

    #[test]
    fn test_prune_expired() {
        let mut cache = ResolutionCache::new();
        cache.set_version("modrinth", "old", "1.20.1", "fabric", record(Some("2024-04-01T00:00:00Z")));
        cache.set_version("modrinth", "new", "1.20.1", "fabric", record(Some("2024-05-25T00:00:00Z")));
        cache.set_version("modrinth", "undated", "1.20.1", "fabric", record(None));
        cache.set_version("modrinth", "garbled", "1.20.1", "fabric", record(Some("yesterday")));

        let pruned = cache.prune_expired_at(30, now());

        assert_eq!(pruned, 1);
        assert!(cache.get_version("modrinth", "old", "1.20.1", "fabric").is_none());
        assert!(cache.get_version("modrinth", "new", "1.20.1", "fabric").is_some());
        assert!(cache.get_version("modrinth", "undated", "1.20.1", "fabric").is_some());
        assert!(cache.get_version("modrinth", "garbled", "1.20.1", "fabric").is_some());
    }

    #[test]
    fn test_staleness() {
        let mut cache = ResolutionCache::new();
        assert!(cache.is_stale_at(168, now()));

        cache.mark_full_scan_at(now() - TimeDelta::hours(100));
        assert!(!cache.is_stale_at(168, now()));
        assert!(cache.is_stale_at(24, now()));

        cache.last_scan = Some("not a date".into());
        assert!(cache.is_stale_at(168, now()));
    }

    #[test]
    fn test_huge_ages_never_expire() {
        let mut cache = ResolutionCache::new();
        cache.set_version("modrinth", "old", "1.20.1", "fabric", record(Some("2000-01-01T00:00:00Z")));

        assert_eq!(cache.prune_expired_at(200_000_000_000_000, now()), 0);
        assert_eq!(cache.prune_expired_at(u64::MAX, now()), 0);
        assert!(cache.get_version("modrinth", "old", "1.20.1", "fabric").is_some());

        cache.mark_full_scan_at(now() - TimeDelta::days(3650));
        assert!(!cache.is_stale_at(u64::MAX / 2, now()));
        assert!(!cache.is_stale_at(u64::MAX, now()));
    }

    #[test]
    fn test_staleness_does_not_delete_entries() {
        let mut cache = ResolutionCache::new();
        cache.set_project_ids("sodium", &ids(&[("modrinth", Some("AANobbMI"))]));
        assert!(cache.is_stale_at(168, now()));
        assert_eq!(cache.stats().project_ids, 1);
    }

    #[test]
    fn test_evict_missing() {
        let mut cache = ResolutionCache::new();
        cache.set_metadata("/mods/a.jar", PackageMetadata::default());
        cache.set_metadata("/mods/b.jar", PackageMetadata::default());

        let current: HashSet<String> = ["/mods/a.jar".to_string()].into_iter().collect();
        assert_eq!(cache.evict_missing(&current), 1);
        assert!(cache.get_metadata("/mods/a.jar").is_some());
        assert!(cache.get_metadata("/mods/b.jar").is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mod_cache.json");

        let mut cache = ResolutionCache::load(&path);
        cache.set_project_ids("sodium", &ids(&[("modrinth", Some("AANobbMI"))]));
        cache.set_version("modrinth", "AANobbMI", "1.20.1", "fabric", record(None));
        cache.mark_full_scan_at(now());
        cache.save().unwrap();

        assert!(path.exists());
        assert!(!temp.path().join("mod_cache.json.tmp").exists());

        let loaded = ResolutionCache::load(&path);
        assert_eq!(loaded.get_project_ids("sodium")["modrinth"].as_deref(), Some("AANobbMI"));
        assert_eq!(loaded.last_scan, cache.last_scan);
        assert_eq!(loaded.stats().latest_versions, 1);
    }

    #[test]
    fn test_corrupt_file_is_backed_up() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mod_cache.json");
        fs::write(&path, "{ definitely not json").unwrap();

        let cache = ResolutionCache::load(&path);

        assert_eq!(cache.stats().mod_files, 0);
        assert!(cache.last_scan.is_none());
        assert!(!path.exists());
        let backup = temp.path().join("mod_cache.json.bak");
        assert_eq!(fs::read_to_string(backup).unwrap(), "{ definitely not json");
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut cache = ResolutionCache::new();
        cache.set_project_ids("sodium", &ids(&[("modrinth", Some("AANobbMI"))]));
        cache.set_metadata("/mods/a.jar", PackageMetadata::default());
        cache.record_download(
            "sodium",
            "0.5.8",
            DownloadRecord {
                path: "downloads/Sodium-0.5.8.jar".into(),
                provider: "modrinth".into(),
                downloaded_at: now().to_rfc3339(),
            },
        );
        cache.mark_full_scan_at(now());

        cache.clear();

        assert_eq!(
            cache.stats(),
            CacheStats {
                mod_files: 0,
                project_ids: 0,
                latest_versions: 0,
                downloaded_files: 0
            }
        );
        assert!(cache.last_scan.is_none());
        assert!(cache.get_download("sodium", "0.5.8").is_none());
    }
}
