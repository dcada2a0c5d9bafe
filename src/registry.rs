use crate::{
    cache::{Cache, CachePolicy},
    error::{BotError, Result},
    models::Model,
    webui::WebUiApi,
};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Cache policies for the registry's lookups.
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    pub models: CachePolicy,
    pub lookups: CachePolicy,
    pub samplers: CachePolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            models: CachePolicy::unbounded(),
            lookups: CachePolicy::bounded(16),
            samplers: CachePolicy::disabled(),
        }
    }
}

/// Knows which checkpoints and samplers the WebUI offers.
pub struct ModelRegistry {
    api: Arc<dyn WebUiApi>,
    models: Cache<(), Vec<Model>>,
    hash_by_display: Cache<String, Option<String>>,
    display_by_hash: Cache<String, Option<String>>,
    samplers: Cache<(), Vec<String>>,
}

impl ModelRegistry {
    pub fn new(api: Arc<dyn WebUiApi>) -> Self {
        Self::with_config(api, RegistryConfig::default())
    }

    pub fn with_config(api: Arc<dyn WebUiApi>, config: RegistryConfig) -> Self {
        Self {
            api,
            models: Cache::new(config.models),
            hash_by_display: Cache::new(config.lookups),
            display_by_hash: Cache::new(config.lookups),
            samplers: Cache::new(config.samplers),
        }
    }

    pub fn api(&self) -> &Arc<dyn WebUiApi> {
        &self.api
    }

    pub async fn list_models_with_hash(&self) -> Result<Vec<Model>> {
        self.models
            .get_or_fetch((), || async {
                let entries = self.api.list_sd_models().await?;
                log::debug!("Fetched {} models from WebUI", entries.len());
                Ok::<_, BotError>(entries.into_iter().map(Model::from).collect())
            })
            .await
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        Ok(self
            .list_models_with_hash()
            .await?
            .into_iter()
            .map(|m| m.display_name)
            .collect())
    }

    pub async fn resolve_hash_name(&self, display_name: &str) -> Result<Option<String>> {
        self.hash_by_display
            .get_or_fetch(display_name.to_string(), || async {
                let models = self.list_models_with_hash().await?;
                Ok::<_, BotError>(models
                    .into_iter()
                    .find(|m| m.display_name == display_name)
                    .map(|m| m.hash_name))
            })
            .await
    }

    pub async fn resolve_display_name(&self, hash_name: &str) -> Result<Option<String>> {
        self.display_by_hash
            .get_or_fetch(hash_name.to_string(), || async {
                let models = self.list_models_with_hash().await?;
                Ok::<_, BotError>(models
                    .into_iter()
                    .find(|m| m.hash_name == hash_name)
                    .map(|m| m.display_name))
            })
            .await
    }

    /// Display name of the checkpoint the WebUI currently has loaded.
    pub async fn current_model(&self) -> Result<Option<String>> {
        let options = self.api.get_options().await?;
        match options.sd_model_checkpoint {
            Some(checkpoint) => self.resolve_display_name(&checkpoint).await,
            None => Ok(None),
        }
    }

    pub async fn list_sampler_names(&self) -> Result<Vec<String>> {
        self.samplers
            .get_or_fetch((), || async {
                let samplers = self.api.list_samplers().await?;
                Ok::<_, BotError>(samplers.into_iter().map(|s| s.name).collect())
            })
            .await
    }

    /// Loads the checkpoint identified by `hash_name`.
    pub async fn activate(&self, hash_name: &str) -> Result<()> {
        let mut options = Map::new();
        options.insert(
            "sd_model_checkpoint".to_string(),
            Value::String(hash_name.to_string()),
        );
        self.api.set_options(options).await
    }

    /// Drops every cached entry. Call after the WebUI's model set changes.
    pub async fn invalidate(&self) {
        self.models.invalidate().await;
        self.hash_by_display.invalidate().await;
        self.display_by_hash.invalidate().await;
        self.samplers.invalidate().await;
        log::info!("Model registry caches invalidated");
    }
}
