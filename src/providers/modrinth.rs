// Modrinth provider implementation

use crate::models::{FileRef, ModLoader, VersionRecord};
use crate::providers::http;
use crate::providers::provider_trait::ModProvider;
use crate::providers::search::{self, Searchable};
use crate::providers::select::{self, Candidate, SelectionConfig};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use std::path::Path;

const API_BASE: &str = "https://api.modrinth.com/v2";
const PROVIDER_NAME: &str = "modrinth";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    project_id: String,
    slug: String,
    title: String,
}

impl Searchable for SearchHit {
    fn search_names(&self) -> Vec<&str> {
        vec![self.slug.as_str(), self.title.as_str()]
    }
}

#[derive(Debug, Deserialize)]
struct Version {
    id: String,
    project_id: String,
    version_number: Option<String>,
    date_published: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    game_versions: Vec<String>,
    #[serde(default)]
    loaders: Vec<String>,
    #[serde(default)]
    files: Vec<VersionFile>,
    #[serde(default)]
    changelog_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionFile {
    url: String,
    filename: String,
    #[serde(default)]
    primary: bool,
    hashes: FileHashes,
}

#[derive(Debug, Deserialize)]
struct FileHashes {
    sha512: Option<String>,
}

impl Version {
    fn into_candidate(self) -> Candidate {
        // Only listed and archived releases are offered as updates
        let available = matches!(self.status.as_deref(), None | Some("listed") | Some("archived"));

        let files = self
            .files
            .into_iter()
            .map(|f| {
                FileRef::direct(f.url, Some(f.filename))
                    .with_sha512(f.hashes.sha512)
                    .primary(f.primary)
            })
            .collect();

        let record = VersionRecord {
            version_number: self.version_number,
            provider: PROVIDER_NAME.to_string(),
            date_published: self.date_published,
            files,
            page_url: Some(format!("https://modrinth.com/mod/{}", self.project_id)),
            project_id: self.project_id,
            version_id: Some(self.id),
            changelog_url: self.changelog_url,
            slug: None,
            game_versions: self.game_versions,
            loaders: self.loaders,
        };

        Candidate {
            available,
            ..Candidate::new(record)
        }
    }
}

fn search_url(query: &str) -> String {
    format!(
        "{}/search?query={}&facets={}&limit=5",
        API_BASE,
        urlencoding::encode(query),
        urlencoding::encode(r#"[["project_type:mod"]]"#)
    )
}

fn versions_url(project_id: &str, game_version: &str, loader: ModLoader) -> String {
    format!(
        "{}/project/{}/version?game_versions={}&loaders={}",
        API_BASE,
        urlencoding::encode(project_id),
        urlencoding::encode(&format!(r#"["{}"]"#, game_version)),
        urlencoding::encode(&format!(r#"["{}"]"#, loader))
    )
}

async fn search_project(mod_id: &str) -> anyhow::Result<Option<String>> {
    let response: SearchResponse = http::fetch_json(http::client().get(search_url(mod_id))).await?;
    Ok(search::best_match(response.hits, mod_id).map(|hit| hit.project_id))
}

async fn latest_version(
    project_id: &str,
    game_version: &str,
    loader: ModLoader,
) -> anyhow::Result<VersionRecord> {
    let url = versions_url(project_id, game_version, loader);
    let versions: Vec<Version> = http::fetch_json(http::client().get(url)).await?;

    let candidates = versions.into_iter().map(Version::into_candidate).collect();
    let config = SelectionConfig::new(project_id);
    select::select_latest(candidates, game_version, loader, &config)
}

pub struct ModrinthProvider;

#[async_trait]
impl ModProvider for ModrinthProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn resolve_identity(&self, mod_id: &str) -> Option<String> {
        match search_project(mod_id).await {
            Ok(Some(project_id)) => {
                debug!("Found {} on Modrinth: {}", mod_id, project_id);
                Some(project_id)
            }
            Ok(None) => {
                debug!("No Modrinth results for {}", mod_id);
                None
            }
            Err(e) => {
                warn!("Modrinth search for {} failed: {}", mod_id, e);
                None
            }
        }
    }

    async fn resolve_latest(
        &self,
        project_id: &str,
        game_version: &str,
        loader: ModLoader,
    ) -> Option<VersionRecord> {
        match latest_version(project_id, game_version, loader).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Modrinth version lookup for {} failed: {}", project_id, e);
                None
            }
        }
    }

    async fn download(&self, record: &VersionRecord, destination: &Path) -> bool {
        let Some(file) = record.primary_file() else {
            warn!("No files in Modrinth release of {}", record.project_id);
            return false;
        };

        let request = http::client().get(&file.url);
        match http::download_to_path(request, destination, file.sha512.as_deref()).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Download from Modrinth failed: {}", e);
                false
            }
        }
    }
}
