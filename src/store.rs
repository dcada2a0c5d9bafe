use crate::{
    error::{BotError, Result},
    models::{DefaultValue, GenerationDefaults},
    translator::RequestTranslator,
};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Persisted generation defaults.
///
/// Reads are snapshots. Writers serialize on the write lock, persist the full
/// record to disk, and only then publish the new value, so a failed write
/// leaves the in-memory defaults untouched.
pub struct DefaultsStore {
    path: PathBuf,
    current: RwLock<GenerationDefaults>,
}

impl DefaultsStore {
    /// Opens `path`, creating it with the built-in defaults when it is missing or empty.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let defaults = if raw.trim().is_empty() {
            let defaults = GenerationDefaults::default();
            write_defaults(&path, &defaults).await?;
            log::info!("Wrote built-in defaults to {}", path.display());
            defaults
        } else {
            serde_json::from_str(&raw).map_err(|e| {
                BotError::Config(format!("invalid defaults file {}: {}", path.display(), e))
            })?
        };

        Ok(Self {
            path,
            current: RwLock::new(defaults),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self) -> GenerationDefaults {
        self.current.read().await.clone()
    }

    pub async fn get_field(&self, name: &str) -> Result<DefaultValue> {
        self.current
            .read()
            .await
            .get(name)
            .ok_or_else(|| BotError::NotFound(format!("Unknown default parameter `{}`", name)))
    }

    /// Parses `raw` into `name`'s type, persists, and returns the new defaults.
    pub async fn set(&self, name: &str, raw: &str) -> Result<GenerationDefaults> {
        let mut current = self.current.write().await;
        let updated = RequestTranslator::translate_defaults_update(name, raw, &current)?;
        write_defaults(&self.path, &updated).await?;
        *current = updated.clone();
        log::info!("Default `{}` set to `{}`", name, raw.trim());
        Ok(updated)
    }
}

async fn write_defaults(path: &Path, defaults: &GenerationDefaults) -> Result<()> {
    let body = serde_json::to_string_pretty(defaults)?;
    tokio::fs::write(path, body).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_is_created_with_builtins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("defaults.json");

        let store = DefaultsStore::load(&path).await.unwrap();
        assert_eq!(store.get().await, GenerationDefaults::default());

        let on_disk: GenerationDefaults =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, GenerationDefaults::default());
    }

    #[tokio::test]
    async fn test_empty_file_is_filled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("defaults.json");
        std::fs::write(&path, "").unwrap();

        DefaultsStore::load(&path).await.unwrap();
        assert!(!std::fs::read_to_string(&path).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("defaults.json");

        let store = DefaultsStore::load(&path).await.unwrap();
        let updated = store.set("steps", "45").await.unwrap();
        assert_eq!(updated.steps, 45);
        assert_eq!(store.get_field("steps").await.unwrap(), DefaultValue::Integer(45));

        let reopened = DefaultsStore::load(&path).await.unwrap();
        assert_eq!(reopened.get().await.steps, 45);
    }

    #[tokio::test]
    async fn test_rejected_update_changes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("defaults.json");
        let store = DefaultsStore::load(&path).await.unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let err = store.set("steps", "abc").await.unwrap_err();
        assert!(matches!(err, BotError::TypeMismatch { .. }));
        assert_eq!(store.get().await.steps, 20);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("defaults.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = DefaultsStore::load(&path).await.err().unwrap();
        assert!(matches!(err, BotError::Config(_)));
    }

    #[tokio::test]
    async fn test_unknown_field() {
        let dir = tempdir().unwrap();
        let store = DefaultsStore::load(dir.path().join("d.json")).await.unwrap();
        assert!(matches!(
            store.get_field("colour").await,
            Err(BotError::NotFound(_))
        ));
    }
}
