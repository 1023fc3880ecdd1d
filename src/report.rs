// Plain-text update report

use crate::config::Config;
use crate::constants::REPOSITORY_URL;
use crate::models::UpdateVerdict;
use chrono::{DateTime, Local};
use log::info;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const SEPARATOR: &str = "   -----------------------------------------";

/// Project page for a verdict, falling back to a URL built from the ids
fn page_url(verdict: &UpdateVerdict) -> Option<String> {
    let record = &verdict.record;
    if let Some(url) = &record.page_url {
        return Some(url.clone());
    }

    let project = if record.project_id.is_empty() {
        record.slug.as_deref().unwrap_or(&verdict.mod_id)
    } else {
        record.project_id.as_str()
    };
    match verdict.provider.as_str() {
        "modrinth" => Some(format!("https://modrinth.com/mod/{}", project)),
        "curseforge" => Some(format!(
            "https://www.curseforge.com/minecraft/mc-mods/{}",
            project
        )),
        _ => None,
    }
}

/// Best manual download link and whether it points straight at a jar
fn download_link(verdict: &UpdateVerdict) -> Option<(String, bool)> {
    let record = &verdict.record;
    if let Some(file) = record.files.iter().find(|f| f.is_jar()) {
        return Some((file.url.clone(), true));
    }
    if let Some(url) = record.download_url() {
        return Some((url.to_string(), false));
    }
    if record.project_id.is_empty() {
        return None;
    }

    let url = match (verdict.provider.as_str(), &record.version_id) {
        ("modrinth", Some(version_id)) => format!(
            "https://modrinth.com/mod/{}/version/{}",
            record.project_id, version_id
        ),
        ("modrinth", None) => format!("https://modrinth.com/mod/{}/versions", record.project_id),
        ("curseforge", Some(file_id)) => format!(
            "https://www.curseforge.com/minecraft/mc-mods/{}/files/{}",
            record.project_id, file_id
        ),
        ("curseforge", None) => format!(
            "https://www.curseforge.com/minecraft/mc-mods/{}/files/all",
            record.project_id
        ),
        _ => return None,
    };
    Some((url, false))
}

/// Render the report body for `updates`
pub fn render(updates: &[UpdateVerdict], config: &Config, generated_at: DateTime<Local>) -> String {
    let mut out = String::new();
    write_body(&mut out, updates, config, generated_at).expect("writing to a String cannot fail");
    out
}

fn write_body<W: fmt::Write>(
    out: &mut W,
    updates: &[UpdateVerdict],
    config: &Config,
    generated_at: DateTime<Local>,
) -> fmt::Result {
    writeln!(out, "=== NyxPatcher Mod Update Report ===")?;
    writeln!(out, "NyxPatcher Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(
        out,
        "Report Generated: {}",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(out, "Minecraft Version: {}", config.minecraft_version)?;
    writeln!(out, "Mod Loader: {}", config.mod_loader)?;
    writeln!(out, "Repository: {}", REPOSITORY_URL)?;
    writeln!(out, "License: {}", env!("CARGO_PKG_LICENSE"))?;
    writeln!(out)?;
    writeln!(out, "Found {} mods with available updates:", updates.len())?;
    writeln!(out)?;

    for (i, update) in updates.iter().enumerate() {
        write_entry(out, i + 1, update)?;
    }
    Ok(())
}

fn write_entry<W: fmt::Write>(out: &mut W, number: usize, update: &UpdateVerdict) -> fmt::Result {
    let record = &update.record;

    writeln!(out, "{}. {} ({})", number, update.mod_name, update.mod_id)?;
    writeln!(out, "   Current Version: {}", update.current_version)?;
    writeln!(out, "   Latest Version: {}", update.latest_version)?;
    writeln!(out, "   Provider: {}", update.provider)?;
    writeln!(out, "   === MOD LINKS ===")?;

    match page_url(update) {
        Some(url) => {
            writeln!(out, "   MOD PAGE:   {}", url)?;
            writeln!(out, "   • View mod details, documentation, and issues")?;
        }
        None => writeln!(out, "   MOD PAGE:   Not available for {}", update.provider)?,
    }

    match download_link(update) {
        Some((url, direct_jar)) => {
            writeln!(out, "   DOWNLOAD:   {}", url)?;
            if direct_jar {
                writeln!(out, "   • Direct .jar download for version {}", update.latest_version)?;
            } else {
                writeln!(
                    out,
                    "   • Use this URL to manually download version {}",
                    update.latest_version
                )?;
            }
        }
        None => writeln!(out, "   DOWNLOAD:   Not available for {}", update.provider)?,
    }

    if let Some(changelog) = &record.changelog_url {
        writeln!(out, "   Changelog: {}", changelog)?;
    }
    if let Some(published) = &record.date_published {
        writeln!(out, "   Published: {}", published)?;
    }

    writeln!(out, "{}", SEPARATOR)?;
    writeln!(out)
}

/// Write `update_report_<timestamp>.txt` into `dir`.
///
/// Returns `None` when there is nothing to report.
pub fn write_report(
    dir: &Path,
    updates: &[UpdateVerdict],
    config: &Config,
) -> anyhow::Result<Option<PathBuf>> {
    if updates.is_empty() {
        info!("No updates to report");
        return Ok(None);
    }

    fs::create_dir_all(dir)?;

    let now = Local::now();
    let path = dir.join(format!("update_report_{}.txt", now.format("%Y%m%d_%H%M%S")));
    fs::write(&path, render(updates, config, now))?;

    info!("Update report written to {}", path.display());
    Ok(Some(path))
}
