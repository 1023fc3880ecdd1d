// Init command for writing a default configuration file

use crate::cli::InitArgs;
use crate::config::Config;
use crate::constants::KNOWN_PROVIDERS;
use crate::models::ModLoader;
use crate::ui;
use std::path::Path;

fn check_provider(name: &str) -> anyhow::Result<String> {
    let name = name.trim().to_lowercase();
    if !KNOWN_PROVIDERS.contains(&name.as_str()) {
        anyhow::bail!(
            "Unknown provider '{}'. Expected one of: {}",
            name,
            KNOWN_PROVIDERS.join(", ")
        );
    }
    Ok(name)
}

pub fn init(config_path: &Path, args: InitArgs) -> anyhow::Result<()> {
    if config_path.exists() {
        ui::dim("Configuration detected. Skipping initialization.");
        return Ok(());
    }

    let mut config = Config::default();

    if let Some(version) = args.minecraft_version {
        config.minecraft_version = version;
    }
    if let Some(loader) = args.loader {
        let loader: ModLoader = loader.parse()?;
        config.mod_loader = loader.to_string();
    }
    if !args.mods_dirs.is_empty() {
        config.mod_directories = args.mods_dirs;
    }
    if let Some(provider) = args.provider {
        config.default_mod_provider = check_provider(&provider)?;
    }
    if let Some(provider) = args.fallback_provider {
        config.fallback_mod_provider = check_provider(&provider)?;
    }
    if let Some(key) = args.curseforge_api_key {
        config.curseforge_api_key = key;
    }

    config.save(config_path)?;
    ui::success(&format!(
        "Initialized {} for Minecraft {} ({})",
        config_path.display(),
        config.minecraft_version,
        config.mod_loader
    ));
    if config.curseforge_api_key.is_empty() {
        ui::dim("No CurseForge API key set; only Modrinth will be queried");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args() -> InitArgs {
        InitArgs {
            minecraft_version: Some("1.20.1".into()),
            loader: Some("Forge".into()),
            mods_dirs: vec!["server/mods".into()],
            provider: Some("CurseForge".into()),
            fallback_provider: Some("modrinth".into()),
            curseforge_api_key: None,
        }
    }

    #[test]
    fn test_init_applies_overrides() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");

        init(&path, args()).unwrap();

        let config = Config::load(&path).unwrap().unwrap();
        assert_eq!(config.minecraft_version, "1.20.1");
        assert_eq!(config.mod_loader, "forge");
        assert_eq!(config.mod_directories, vec!["server/mods".to_string()]);
        assert_eq!(config.provider_order(), vec!["curseforge", "modrinth"]);
    }

    #[test]
    fn test_init_rejects_unknown_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");

        let mut bad_loader = args();
        bad_loader.loader = Some("rift".into());
        assert!(init(&path, bad_loader).is_err());

        let mut bad_provider = args();
        bad_provider.provider = Some("planetminecraft".into());
        assert!(init(&path, bad_provider).is_err());
        assert!(!path.exists());
    }
}
