// Providers module for remote mod repositories

use crate::config::Config;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

pub mod curseforge;
pub mod hash;
pub mod http;
pub mod modrinth;
pub mod provider_trait;
pub mod search;
pub mod select;

pub use curseforge::CurseForgeProvider;
pub use modrinth::ModrinthProvider;
pub use provider_trait::ModProvider;

/// Registry of available providers and their preference order
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ModProvider>>,
    order: Vec<String>,
}

impl ProviderRegistry {
    /// Empty registry that prefers providers in `order`
    pub fn new(order: Vec<String>) -> Self {
        Self {
            providers: HashMap::new(),
            order,
        }
    }

    /// Build the registry from configuration.
    ///
    /// Modrinth is always registered. CurseForge needs an API key.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new(config.provider_order());

        registry.register(Arc::new(ModrinthProvider));

        let api_key = config.curseforge_api_key.trim();
        if api_key.is_empty() {
            warn!("CurseForge API key not configured, CurseForge lookups are disabled");
        } else {
            registry.register(Arc::new(CurseForgeProvider::new(api_key)));
        }

        for name in &registry.order {
            if !registry.providers.contains_key(name) {
                debug!("Preferred provider '{}' is not available", name);
            }
        }

        registry
    }

    pub fn register(&mut self, provider: Arc<dyn ModProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ModProvider>> {
        self.providers.get(name)
    }

    /// Configured provider names, primary first, whether registered or not
    pub fn preference_order(&self) -> &[String] {
        &self.order
    }

    /// Registered providers in preference order
    pub fn available(&self) -> Vec<&Arc<dyn ModProvider>> {
        self.order.iter().filter_map(|name| self.get(name)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curseforge_requires_api_key() {
        let registry = ProviderRegistry::from_config(&Config::default());
        assert!(registry.get("modrinth").is_some());
        assert!(registry.get("curseforge").is_none());
        assert_eq!(registry.available().len(), 1);
        assert_eq!(
            registry.preference_order(),
            &["modrinth".to_string(), "curseforge".to_string()]
        );
    }

    #[test]
    fn test_order_follows_config() {
        let config = Config {
            default_mod_provider: "curseforge".into(),
            fallback_mod_provider: "modrinth".into(),
            curseforge_api_key: "key".into(),
            ..Config::default()
        };

        let registry = ProviderRegistry::from_config(&config);
        let names: Vec<&str> = registry.available().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["curseforge", "modrinth"]);
    }
}
