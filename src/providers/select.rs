// Unified release selection logic

use crate::models::{ModLoader, VersionRecord};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// A release as listed by a provider, before filtering
#[derive(Debug, Clone)]
pub struct Candidate {
    pub record: VersionRecord,
    /// Downloadable and not withdrawn
    pub available: bool,
    pub server_pack: bool,
}

impl Candidate {
    pub fn new(record: VersionRecord) -> Self {
        Self {
            record,
            available: true,
            server_pack: false,
        }
    }
}

/// Configuration for release selection
pub struct SelectionConfig {
    /// Project identifier for error messages
    pub project_id: String,
    /// Whether to treat an empty loader list as compatible with any loader
    pub treat_empty_loaders_as_compatible: bool,
}

impl SelectionConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            treat_empty_loaders_as_compatible: false,
        }
    }

    pub fn treat_empty_loaders_as_compatible(mut self) -> Self {
        self.treat_empty_loaders_as_compatible = true;
        self
    }
}

/// Select the newest release compatible with `game_version` and `loader`
///
/// Handles:
/// - Game version and loader filtering
/// - Unavailable and server-pack exclusion
/// - Sorting by publication date
pub fn select_latest(
    candidates: Vec<Candidate>,
    game_version: &str,
    loader: ModLoader,
    config: &SelectionConfig,
) -> Result<VersionRecord> {
    if candidates.is_empty() {
        anyhow::bail!("No releases found for project '{}'", config.project_id);
    }

    let mut compatible: Vec<VersionRecord> = candidates
        .into_iter()
        .filter(|c| c.available && !c.server_pack)
        .map(|c| c.record)
        .filter(|r| r.game_versions.iter().any(|gv| gv == game_version))
        .filter(|r| matches_loader(r, loader, config.treat_empty_loaders_as_compatible))
        .collect();

    if compatible.is_empty() {
        anyhow::bail!(
            "No releases of project '{}' are compatible with Minecraft {} and {}",
            config.project_id,
            game_version,
            loader
        );
    }

    // Newest first; undated releases sort last
    compatible.sort_by(|a, b| published_at(b).cmp(&published_at(a)));

    Ok(compatible.swap_remove(0))
}

fn matches_loader(record: &VersionRecord, loader: ModLoader, treat_empty_as_compatible: bool) -> bool {
    if record.loaders.is_empty() {
        return treat_empty_as_compatible;
    }
    record
        .loaders
        .iter()
        .any(|l| l.eq_ignore_ascii_case(loader.as_str()))
}

fn published_at(record: &VersionRecord) -> Option<DateTime<Utc>> {
    record
        .date_published
        .as_deref()
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_candidate(version: &str, published: &str, game_versions: &[&str], loaders: &[&str]) -> Candidate {
        let mut record = VersionRecord::new("modrinth", "AANobbMI");
        record.version_number = Some(version.to_string());
        record.date_published = Some(published.to_string());
        record.game_versions = game_versions.iter().map(|s| s.to_string()).collect();
        record.loaders = loaders.iter().map(|s| s.to_string()).collect();
        Candidate::new(record)
    }

    fn version_of(record: &VersionRecord) -> &str {
        record.version_number.as_deref().unwrap()
    }

    #[test]
    fn test_newest_compatible_wins() {
        let candidates = vec![
            make_candidate("0.5.3", "2023-09-01T00:00:00Z", &["1.20.1"], &["fabric"]),
            make_candidate("0.5.8", "2024-02-01T00:00:00Z", &["1.20.1"], &["fabric"]),
            make_candidate("0.6.0", "2024-05-01T00:00:00Z", &["1.21"], &["fabric"]),
            make_candidate("0.5.9", "2024-03-01T00:00:00Z", &["1.20.1"], &["quilt"]),
        ];

        let config = SelectionConfig::new("AANobbMI");
        let selected = select_latest(candidates, "1.20.1", ModLoader::Fabric, &config).unwrap();
        assert_eq!(version_of(&selected), "0.5.8");
    }

    #[test]
    fn test_publish_dates_compare_as_instants() {
        let candidates = vec![
            make_candidate("1.0.1", "2024-02-01T10:00:00+05:00", &["1.20.1"], &["fabric"]),
            make_candidate("1.0.0", "2024-02-01T06:00:00Z", &["1.20.1"], &["fabric"]),
        ];

        let config = SelectionConfig::new("p");
        let selected = select_latest(candidates, "1.20.1", ModLoader::Fabric, &config).unwrap();
        assert_eq!(version_of(&selected), "1.0.0");
    }

    #[test]
    fn test_unavailable_and_server_packs_excluded() {
        let mut withdrawn = make_candidate("2.0.0", "2024-05-01T00:00:00Z", &["1.20.1"], &[]);
        withdrawn.available = false;
        let mut server = make_candidate("1.9.0", "2024-04-01T00:00:00Z", &["1.20.1"], &[]);
        server.server_pack = true;
        let client = make_candidate("1.8.0", "2024-03-01T00:00:00Z", &["1.20.1"], &[]);

        let config = SelectionConfig::new("238222").treat_empty_loaders_as_compatible();
        let selected =
            select_latest(vec![withdrawn, server, client], "1.20.1", ModLoader::Forge, &config).unwrap();
        assert_eq!(version_of(&selected), "1.8.0");
    }

    #[test]
    fn test_empty_loaders_strict_by_default() {
        let candidates = vec![make_candidate("1.0.0", "2024-01-01T00:00:00Z", &["1.20.1"], &[])];

        let strict = SelectionConfig::new("p");
        assert!(select_latest(candidates.clone(), "1.20.1", ModLoader::Fabric, &strict).is_err());

        let lenient = SelectionConfig::new("p").treat_empty_loaders_as_compatible();
        assert!(select_latest(candidates, "1.20.1", ModLoader::Fabric, &lenient).is_ok());
    }

    #[test]
    fn test_no_compatible_release_is_error() {
        let candidates = vec![make_candidate("1.0.0", "2024-01-01T00:00:00Z", &["1.19.2"], &["fabric"])];
        let config = SelectionConfig::new("p");
        let err = select_latest(candidates, "1.20.1", ModLoader::Fabric, &config).unwrap_err();
        assert!(err.to_string().contains("compatible with Minecraft 1.20.1"));
    }
}
