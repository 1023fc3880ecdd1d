// Cache command for inspecting and maintaining the resolution cache

use crate::cache::ResolutionCache;
use crate::cli::CacheAction;
use crate::config::{self, Config};
use crate::ui;
use std::path::Path;

pub fn cache(config_path: &Path, action: CacheAction) -> anyhow::Result<()> {
    let config = Config::load(config_path)?.unwrap_or_default();
    let cache_path = config::cache_path();
    let mut cache = ResolutionCache::load(&cache_path);

    match action {
        CacheAction::Status => {
            let stats = cache.stats();
            ui::header(&format!("Cache: {}", cache_path.display()));
            ui::action(&format!("{} mod files", stats.mod_files));
            ui::action(&format!("{} project identities", stats.project_ids));
            ui::action(&format!("{} cached versions", stats.latest_versions));
            ui::action(&format!("{} downloads", stats.downloaded_files));
            match &cache.last_scan {
                Some(last_scan) if cache.is_stale(config.cache_expiry_hours) => {
                    ui::warning(&format!("Last full scan {} (stale)", last_scan))
                }
                Some(last_scan) => ui::dim(&format!("Last full scan {}", last_scan)),
                None => ui::dim("No full scan recorded"),
            }
        }
        CacheAction::Prune { max_age_days } => {
            let days = max_age_days.unwrap_or(config.version_max_age_days);
            let removed = cache.prune_expired(days);
            cache.save()?;
            ui::success(&format!(
                "Pruned {} cached versions older than {} days",
                removed, days
            ));
        }
        CacheAction::Clear => {
            cache.clear();
            cache.save()?;
            ui::success("Cache cleared");
        }
    }

    Ok(())
}
