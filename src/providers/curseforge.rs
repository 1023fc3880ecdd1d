// CurseForge provider implementation

use crate::models::{FileRef, ModLoader, VersionRecord};
use crate::providers::http;
use crate::providers::provider_trait::ModProvider;
use crate::providers::search::{self, Searchable};
use crate::providers::select::{self, Candidate, SelectionConfig};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::path::Path;

const API_BASE: &str = "https://api.curseforge.com/v1";
const PROVIDER_NAME: &str = "curseforge";
const MINECRAFT_GAME_ID: u32 = 432;
const MOD_CLASS_ID: u32 = 6;

/// Loader names CurseForge mixes into a file's `gameVersions`
const LOADER_NAMES: [&str; 4] = ["fabric", "forge", "quilt", "neoforge"];

#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: u64,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    name: String,
}

impl Searchable for SearchHit {
    fn search_names(&self) -> Vec<&str> {
        vec![self.slug.as_str(), self.name.as_str()]
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModFile {
    id: u64,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    file_date: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    game_versions: Vec<String>,
    #[serde(default = "default_available")]
    is_available: bool,
    #[serde(default)]
    is_server_pack: bool,
}

fn default_available() -> bool {
    true
}

/// CurseForge's numeric loader type
fn loader_type_id(loader: ModLoader) -> u32 {
    match loader {
        ModLoader::Forge => 1,
        ModLoader::Fabric => 4,
        ModLoader::Quilt => 5,
    }
}

/// The version is the last `-` separated segment of the display name
fn version_from_display_name(display_name: &str) -> Option<String> {
    let version = display_name.rsplit('-').next().unwrap_or_default().trim();
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}

impl ModFile {
    fn into_candidate(self, project_id: &str) -> Candidate {
        let (loaders, game_versions): (Vec<String>, Vec<String>) = self
            .game_versions
            .into_iter()
            .partition(|gv| LOADER_NAMES.contains(&gv.to_lowercase().as_str()));

        let file = match self.download_url {
            Some(url) => FileRef::direct(url, self.file_name),
            None => FileRef::reference(self.id.to_string(), self.file_name),
        };

        let record = VersionRecord {
            version_number: version_from_display_name(&self.display_name),
            provider: PROVIDER_NAME.to_string(),
            date_published: self.file_date,
            files: vec![file.primary(true)],
            project_id: project_id.to_string(),
            version_id: Some(self.id.to_string()),
            changelog_url: None,
            slug: None,
            page_url: Some(format!(
                "https://www.curseforge.com/minecraft/mc-mods/{}",
                project_id
            )),
            game_versions,
            loaders: loaders.into_iter().map(|l| l.to_lowercase()).collect(),
        };

        Candidate {
            record,
            available: self.is_available,
            server_pack: self.is_server_pack,
        }
    }
}

fn search_url(query: &str) -> String {
    format!(
        "{}/mods/search?gameId={}&classId={}&searchFilter={}&pageSize=5",
        API_BASE,
        MINECRAFT_GAME_ID,
        MOD_CLASS_ID,
        urlencoding::encode(query)
    )
}

fn files_url(project_id: &str, game_version: &str, loader: ModLoader) -> String {
    format!(
        "{}/mods/{}/files?gameVersion={}&modLoaderType={}&pageSize=20",
        API_BASE,
        urlencoding::encode(project_id),
        urlencoding::encode(game_version),
        loader_type_id(loader)
    )
}

pub struct CurseForgeProvider {
    api_key: String,
}

impl CurseForgeProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    fn get(&self, url: &str) -> RequestBuilder {
        http::client()
            .get(url)
            .header("x-api-key", &self.api_key)
            .header("Accept", "application/json")
    }

    async fn search_project(&self, mod_id: &str) -> anyhow::Result<Option<String>> {
        let response: DataResponse<Vec<SearchHit>> =
            http::fetch_json(self.get(&search_url(mod_id))).await?;
        Ok(search::best_match(response.data, mod_id).map(|hit| hit.id.to_string()))
    }

    async fn latest_file(
        &self,
        project_id: &str,
        game_version: &str,
        loader: ModLoader,
    ) -> anyhow::Result<VersionRecord> {
        let url = files_url(project_id, game_version, loader);
        let response: DataResponse<Vec<ModFile>> = http::fetch_json(self.get(&url)).await?;

        let candidates = response
            .data
            .into_iter()
            .map(|f| f.into_candidate(project_id))
            .collect();
        // The server already filtered by loader type
        let config = SelectionConfig::new(project_id).treat_empty_loaders_as_compatible();
        select::select_latest(candidates, game_version, loader, &config)
    }

    async fn direct_download_url(&self, project_id: &str, file_id: &str) -> anyhow::Result<String> {
        let url = format!(
            "{}/mods/{}/files/{}/download-url",
            API_BASE,
            urlencoding::encode(project_id),
            urlencoding::encode(file_id)
        );
        let response: DataResponse<Option<String>> = http::fetch_json(self.get(&url)).await?;
        response
            .data
            .filter(|u| !u.is_empty())
            .ok_or_else(|| anyhow::anyhow!("No download URL for file {}", file_id))
    }

    async fn download_record(&self, record: &VersionRecord, destination: &Path) -> anyhow::Result<()> {
        let file = record
            .primary_file()
            .ok_or_else(|| anyhow::anyhow!("No files in release of {}", record.project_id))?;

        let url = if file.direct {
            file.url.clone()
        } else {
            self.direct_download_url(&record.project_id, &file.url).await?
        };

        debug!("Downloading {} to {}", url, destination.display());
        http::download_to_path(http::client().get(&url), destination, file.sha512.as_deref()).await
    }
}

#[async_trait]
impl ModProvider for CurseForgeProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn resolve_identity(&self, mod_id: &str) -> Option<String> {
        match self.search_project(mod_id).await {
            Ok(Some(project_id)) => {
                debug!("Found {} on CurseForge: {}", mod_id, project_id);
                Some(project_id)
            }
            Ok(None) => {
                debug!("No CurseForge results for {}", mod_id);
                None
            }
            Err(e) => {
                warn!("CurseForge search for {} failed: {}", mod_id, e);
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
        match self.latest_file(project_id, game_version, loader).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("CurseForge file lookup for {} failed: {}", project_id, e);
                None
            }
        }
    }

    async fn download(&self, record: &VersionRecord, destination: &Path) -> bool {
        match self.download_record(record, destination).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Download from CurseForge failed: {}", e);
                false
            }
        }
    }
}
