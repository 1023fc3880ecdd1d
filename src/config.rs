// Config module for the configuration file and shared path helpers

use crate::constants;
use crate::models::ModLoader;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub fn config_dir() -> String {
    std::env::var("NYX_DIR").unwrap_or_else(|_| ".".to_string())
}

pub fn config_path() -> PathBuf {
    Path::new(&config_dir()).join(constants::CONFIG_FILE)
}

pub fn cache_path() -> PathBuf {
    Path::new(&config_dir()).join(constants::CACHE_FILE)
}

pub fn reports_dir() -> PathBuf {
    Path::new(&config_dir()).join(constants::REPORTS_DIR)
}

/// User configuration stored as `config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mod_directories: Vec<String>,
    pub minecraft_version: String,
    pub mod_loader: String,
    pub download_directory: String,
    pub ignore_mods: Vec<String>,
    pub default_mod_provider: String,
    pub fallback_mod_provider: String,
    pub curseforge_api_key: String,
    pub cache_expiry_hours: u64,
    pub version_max_age_days: u64,
    pub recursive_scan: bool,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mod_directories: vec![constants::MODS_DIR.to_string()],
            minecraft_version: constants::DEFAULT_MC_VERSION.to_string(),
            mod_loader: constants::DEFAULT_MOD_LOADER.to_string(),
            download_directory: constants::DOWNLOADS_DIR.to_string(),
            ignore_mods: Vec::new(),
            default_mod_provider: constants::DEFAULT_MOD_PROVIDER.to_string(),
            fallback_mod_provider: constants::FALLBACK_MOD_PROVIDER.to_string(),
            curseforge_api_key: String::new(),
            cache_expiry_hours: constants::DEFAULT_CACHE_EXPIRY_HOURS,
            version_max_age_days: constants::DEFAULT_VERSION_MAX_AGE_DAYS,
            recursive_scan: true,
            base_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load the config file at `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist. An unreadable or
    /// malformed file is reported and replaced by the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let base_dir = base_dir_of(path);
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not read {}: {}. Using defaults", path.display(), e);
                return Ok(Some(Self::with_base_dir(base_dir)));
            }
        };

        match serde_json::from_str::<Config>(&text) {
            Ok(mut config) => {
                config.base_dir = base_dir;
                debug!("Loaded configuration from {}", path.display());
                Ok(Some(config))
            }
            Err(e) => {
                warn!("Invalid config file {}: {}. Using defaults", path.display(), e);
                Ok(Some(Self::with_base_dir(base_dir)))
            }
        }
    }

    /// Load the config file, creating it with defaults when missing
    pub fn load_or_create(path: &Path) -> anyhow::Result<Self> {
        if let Some(config) = Self::load(path)? {
            return Ok(config);
        }

        let config = Self::with_base_dir(base_dir_of(path));
        config.save(path)?;
        warn!("Created default configuration at {}", path.display());
        Ok(config)
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            ..Self::default()
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn loader(&self) -> ModLoader {
        match self.mod_loader.parse() {
            Ok(loader) => loader,
            Err(_) => {
                warn!(
                    "Unknown mod loader '{}', falling back to fabric",
                    self.mod_loader
                );
                ModLoader::Fabric
            }
        }
    }

    /// Provider names in preference order, primary first
    pub fn provider_order(&self) -> Vec<String> {
        let mut order = Vec::new();
        for name in [&self.default_mod_provider, &self.fallback_mod_provider] {
            let name = name.trim().to_lowercase();
            if !name.is_empty() && !order.contains(&name) {
                order.push(name);
            }
        }
        order
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn download_dir(&self) -> PathBuf {
        self.resolve(&self.download_directory)
    }

    /// Configured scan directories that exist, in configured order
    pub fn valid_mod_directories(&self) -> Vec<PathBuf> {
        let mut valid = Vec::new();
        for dir in &self.mod_directories {
            let path = self.resolve(dir);
            if path.is_dir() {
                valid.push(path);
            } else {
                warn!("Mod directory does not exist: {}", path.display());
            }
        }
        valid
    }

    pub fn is_ignored(&self, mod_id: &str) -> bool {
        self.ignore_mods.iter().any(|ignored| ignored == mod_id)
    }
}

fn base_dir_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_none() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        assert!(Config::load(&path).unwrap().is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"minecraft_version": "1.20.1", "mod_loader": "forge"}"#).unwrap();

        let config = Config::load(&path).unwrap().unwrap();
        assert_eq!(config.minecraft_version, "1.20.1");
        assert_eq!(config.loader(), ModLoader::Forge);
        assert_eq!(config.mod_directories, vec!["mods".to_string()]);
        assert_eq!(config.cache_expiry_hours, 168);
        assert_eq!(config.base_dir, temp.path());
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let config = Config::load(&path).unwrap().unwrap();
        assert_eq!(config.minecraft_version, constants::DEFAULT_MC_VERSION);
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");

        let config = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.default_mod_provider, "modrinth");

        let reloaded = Config::load(&path).unwrap().unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_unknown_loader_falls_back_to_fabric() {
        let config = Config {
            mod_loader: "neoforge".into(),
            ..Config::default()
        };
        assert_eq!(config.loader(), ModLoader::Fabric);
    }

    #[test]
    fn test_provider_order_dedups() {
        let config = Config {
            default_mod_provider: "CurseForge".into(),
            fallback_mod_provider: "curseforge".into(),
            ..Config::default()
        };
        assert_eq!(config.provider_order(), vec!["curseforge".to_string()]);

        assert_eq!(
            Config::default().provider_order(),
            vec!["modrinth".to_string(), "curseforge".to_string()]
        );
    }

    #[test]
    fn test_relative_paths_resolve_against_base_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("mods")).unwrap();

        let config = Config {
            mod_directories: vec!["mods".into(), "missing".into()],
            ..Config::with_base_dir(temp.path().to_path_buf())
        };

        assert_eq!(config.valid_mod_directories(), vec![temp.path().join("mods")]);
        assert_eq!(config.download_dir(), temp.path().join("downloads"));
    }
}
