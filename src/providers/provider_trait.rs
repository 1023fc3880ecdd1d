// Trait definition for mod providers

use crate::models::{ModLoader, VersionRecord};
use std::path::Path;

/// Capabilities every remote mod repository offers (Modrinth, CurseForge).
///
/// Implementations never return errors: transport or decoding failures are
/// logged and reported as `None` / `false`.
#[async_trait::async_trait]
pub trait ModProvider: Send + Sync {
    /// Get the provider name (e.g., "modrinth", "curseforge")
    fn name(&self) -> &'static str;

    /// Find the provider's project id for a local mod identity
    async fn resolve_identity(&self, mod_id: &str) -> Option<String>;

    /// Latest release of `project_id` compatible with `game_version` and `loader`
    ///
    /// # Arguments
    /// * `project_id` - Provider-specific project id from `resolve_identity`
    /// * `game_version` - Minecraft version the release must list
    /// * `loader` - Mod loader the release must support
    async fn resolve_latest(
        &self,
        project_id: &str,
        game_version: &str,
        loader: ModLoader,
    ) -> Option<VersionRecord>;

    /// Download the primary file of `record` to `destination`
    async fn download(&self, record: &VersionRecord, destination: &Path) -> bool;
}
