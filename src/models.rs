// Data model shared by the scanner, providers, cache and checker

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Project ids per provider name; `None` means "not found yet"
pub type ProjectIds = BTreeMap<String, Option<String>>;

/// Mod loader a package targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModLoader {
    Fabric,
    Forge,
    Quilt,
}

impl ModLoader {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModLoader::Fabric => "fabric",
            ModLoader::Forge => "forge",
            ModLoader::Quilt => "quilt",
        }
    }
}

impl fmt::Display for ModLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModLoader {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fabric" => Ok(ModLoader::Fabric),
            "forge" => Ok(ModLoader::Forge),
            "quilt" => Ok(ModLoader::Quilt),
            other => anyhow::bail!(
                "Unknown mod loader: '{}'. Supported loaders: fabric, forge, quilt",
                other
            ),
        }
    }
}

/// Metadata read from one local mod archive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub file_path: String,
    pub file_name: String,
    pub file_size: u64,
    /// Format: "sha256:<hex>"
    pub file_hash: Option<String>,
    pub mod_id: Option<String>,
    pub mod_name: Option<String>,
    pub version: Option<String>,
    pub mc_version: Option<String>,
    pub mod_loader: Option<ModLoader>,
    pub authors: Option<String>,
    pub description: Option<String>,
}

/// A downloadable file attached to a release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    /// Download URL, or a provider-specific file reference when `direct` is false
    pub url: String,
    #[serde(default = "default_direct")]
    pub direct: bool,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub sha512: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

fn default_direct() -> bool {
    true
}

impl FileRef {
    pub fn direct(url: impl Into<String>, filename: Option<String>) -> Self {
        Self {
            url: url.into(),
            direct: true,
            filename,
            sha512: None,
            primary: false,
        }
    }

    pub fn reference(file_ref: impl Into<String>, filename: Option<String>) -> Self {
        Self {
            url: file_ref.into(),
            direct: false,
            filename,
            sha512: None,
            primary: false,
        }
    }

    pub fn with_sha512(mut self, sha512: Option<String>) -> Self {
        self.sha512 = sha512;
        self
    }

    pub fn primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    pub fn is_jar(&self) -> bool {
        self.direct && self.url.to_lowercase().ends_with(".jar")
    }
}

/// A provider's answer about the latest compatible release of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version_number: Option<String>,
    pub provider: String,
    /// RFC 3339 publish timestamp
    #[serde(default)]
    pub date_published: Option<String>,
    #[serde(default)]
    pub files: Vec<FileRef>,
    pub project_id: String,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub changelog_url: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub game_versions: Vec<String>,
    #[serde(default)]
    pub loaders: Vec<String>,
}

impl VersionRecord {
    pub fn new(provider: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            version_number: None,
            provider: provider.into(),
            date_published: None,
            files: Vec::new(),
            project_id: project_id.into(),
            version_id: None,
            changelog_url: None,
            slug: None,
            page_url: None,
            game_versions: Vec::new(),
            loaders: Vec::new(),
        }
    }

    /// The file to download: the one marked primary, else the first
    pub fn primary_file(&self) -> Option<&FileRef> {
        self.files
            .iter()
            .find(|f| f.primary)
            .or_else(|| self.files.first())
    }

    /// Best URL for a human to download this release by hand
    pub fn download_url(&self) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.is_jar())
            .or_else(|| self.files.iter().find(|f| f.direct))
            .map(|f| f.url.as_str())
    }
}

/// The checker's decision for one package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateVerdict {
    pub mod_id: String,
    pub mod_name: String,
    pub current_file: String,
    pub current_version: String,
    pub latest_version: String,
    pub update_available: bool,
    pub record: VersionRecord,
    pub provider: String,
    pub metadata: PackageMetadata,
}

/// Where and when an update was downloaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub path: String,
    pub provider: String,
    pub downloaded_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod_loader_from_str() {
        assert_eq!("Fabric".parse::<ModLoader>().unwrap(), ModLoader::Fabric);
        assert_eq!(" forge ".parse::<ModLoader>().unwrap(), ModLoader::Forge);
        assert!("neoforge".parse::<ModLoader>().is_err());
    }

    #[test]
    fn test_primary_file_prefers_flag() {
        let mut record = VersionRecord::new("modrinth", "AAA");
        record.files = vec![
            FileRef::direct("https://cdn.example/sources.jar", None),
            FileRef::direct("https://cdn.example/mod.jar", None).primary(true),
        ];

        assert_eq!(
            record.primary_file().unwrap().url,
            "https://cdn.example/mod.jar"
        );
    }

    #[test]
    fn test_download_url_skips_references() {
        let mut record = VersionRecord::new("curseforge", "123");
        record.files = vec![FileRef::reference("4567", Some("mod.jar".into()))];
        assert_eq!(record.download_url(), None);

        record
            .files
            .push(FileRef::direct("https://edge.example/files/mod", None));
        assert_eq!(record.download_url(), Some("https://edge.example/files/mod"));
    }

    #[test]
    fn test_file_ref_defaults_to_direct() {
        let file: FileRef = serde_json::from_str(r#"{"url": "https://x/y.jar"}"#).unwrap();
        assert!(file.direct);
        assert!(file.is_jar());
    }
}
