// Constants module for shared string constants

pub const CONFIG_FILE: &str = "config.json";
pub const CACHE_FILE: &str = "mod_cache.json";
pub const REPORTS_DIR: &str = "reports";
pub const MODS_DIR: &str = "mods";
pub const DOWNLOADS_DIR: &str = "downloads";

pub const DEFAULT_MC_VERSION: &str = "1.20.4";
pub const DEFAULT_MOD_LOADER: &str = "fabric";
pub const DEFAULT_MOD_PROVIDER: &str = "modrinth";
pub const FALLBACK_MOD_PROVIDER: &str = "curseforge";

pub const DEFAULT_CACHE_EXPIRY_HOURS: u64 = 168;
pub const DEFAULT_VERSION_MAX_AGE_DAYS: u64 = 30;

/// Every provider name the tool knows about, registered or not
pub const KNOWN_PROVIDERS: [&str; 2] = ["modrinth", "curseforge"];

pub const REPOSITORY_URL: &str = "https://github.com/Dig-pestroyer/nyxpatcher";
