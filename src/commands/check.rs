// Check command: scan mods, report updates, download the chosen ones

use crate::cache::ResolutionCache;
use crate::checker::{Interrupted, UpdateChecker};
use crate::cli::CheckArgs;
use crate::config::{self, Config};
use crate::metadata::ArchiveExtractor;
use crate::models::UpdateVerdict;
use crate::providers::ProviderRegistry;
use crate::report;
use crate::ui;
use log::info;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub async fn check(
    config_path: &Path,
    args: &CheckArgs,
    interrupt: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let config = Config::load_or_create(config_path)?;
    let mut cache = ResolutionCache::load(&config::cache_path());
    let registry = ProviderRegistry::from_config(&config);

    let stale = cache.is_stale(config.cache_expiry_hours);
    if stale && !args.force {
        info!("Cache is stale, refreshing all entries");
    }

    if args.dry_run {
        ui::status("[DRY RUN]", "Downloads will only be previewed");
    }

    let extractor = ArchiveExtractor;
    let mut checker = UpdateChecker::new(&config, &registry, &mut cache, &extractor)
        .force_refresh(args.force || stale)
        .with_interrupt(interrupt.clone())
        .with_progress(ui::scan_bar(0));

    let verdicts = checker.check_updates().await?;
    let updates: Vec<UpdateVerdict> = verdicts.into_iter().filter(|v| v.update_available).collect();

    if updates.is_empty() {
        ui::success("Check complete: All mods are up to date!");
        return Ok(());
    }

    ui::header(&format!(
        "Check complete: Found {} mods with available updates",
        updates.len()
    ));
    ui::print_updates(&updates);

    match report::write_report(&config::reports_dir(), &updates, &config) {
        Ok(Some(path)) => ui::dim(&format!("Detailed report saved to: {}", path.display())),
        Ok(None) => {}
        Err(e) => ui::warning(&format!("Could not write update report: {}", e)),
    }

    let selected = if args.no_interaction {
        ui::dim("Skipping downloads (--no-interaction)");
        Vec::new()
    } else if args.download_all {
        updates
    } else {
        ui::select_updates(&updates)
    };

    if selected.is_empty() {
        return Ok(());
    }

    let downloaded = checker.download_updates(&selected, args.dry_run).await;

    if interrupt.load(Ordering::SeqCst) {
        return Err(Interrupted.into());
    }

    if args.dry_run {
        for update in &downloaded {
            ui::status(
                "[DRY RUN]",
                &format!("Would download {} {}", update.mod_name, update.latest_version),
            );
        }
    } else if downloaded.len() == selected.len() {
        ui::success(&format!(
            "Downloaded {} updates to {}",
            downloaded.len(),
            config.download_dir().display()
        ));
    } else {
        ui::warning(&format!(
            "Downloaded {} of {} updates; see the log for failures",
            downloaded.len(),
            selected.len()
        ));
    }

    Ok(())
}
