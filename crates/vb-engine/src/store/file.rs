use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use vb_core::StoreSnapshot;

use super::{RuleStore, StoreError};

/// Store backed by one pretty-printed JSON file.
///
/// A missing file reads as the default snapshot. Writes go to a sibling
/// temporary file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RuleStore for JsonFileStore {
    async fn load(&self) -> Result<StoreSnapshot, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(StoreSnapshot::default()),
            Ok(text) => Ok(StoreSnapshot::from_json(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoreSnapshot::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = snapshot.to_json_pretty()?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use vb_core::{Boost, Language};

    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("vb-engine-{}-{}", std::process::id(), name))
            .join("settings.json")
    }

    #[tokio::test]
    async fn missing_file_reads_as_default() {
        let store = JsonFileStore::new(scratch_path("missing"));
        assert_eq!(store.load().await.unwrap(), StoreSnapshot::default());
    }

    #[tokio::test]
    async fn saved_snapshot_reads_back() {
        let path = scratch_path("roundtrip");
        let store = JsonFileStore::new(&path);

        let mut snapshot = StoreSnapshot::default();
        snapshot.rule_settings.insert("example.com/watch".into(), Boost::clamped(240));
        snapshot.language = Language::En;
        store.save(&snapshot).await.unwrap();

        assert_eq!(store.load().await.unwrap(), snapshot);
        assert!(!store.temp_path().exists());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn malformed_file_is_a_codec_error() {
        let path = scratch_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load().await, Err(StoreError::Codec(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
