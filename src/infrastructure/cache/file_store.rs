//! Filesystem-based template cache

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::application::TemplateStore;
use crate::core::{Result, Template};

/// Stores each template cache as a pretty-printed JSON array file
pub struct FileTemplateStore;

impl FileTemplateStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FileTemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Sibling the new contents are written to before being renamed over `path`
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait]
impl TemplateStore for FileTemplateStore {
    async fn load(&self, path: &Path) -> Result<Vec<Template>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                debug!(path = %path.display(), "Template cache is not UTF-8; starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Vec<Template>>(&content) {
            Ok(templates) => Ok(templates),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Template cache is unusable; starting empty");
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, path: &Path, templates: &[Template]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(templates)?;
        let staging = staging_path(path);

        let mut file = fs::File::create(&staging).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&staging, path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn template(id: &str, version: u64) -> Template {
        Template::from_value(json!({ "id": id, "version": version })).unwrap()
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileTemplateStore::new();

        let templates = store.load(&temp_dir.path().join("absent.json")).await.unwrap();
        assert!(templates.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileTemplateStore::new();
        let path = temp_dir.path().join("cache.json");

        for content in ["[{]", "{\"id\":\"a\"}", "42", ""] {
            std::fs::write(&path, content).unwrap();
            assert!(store.load(&path).await.unwrap().is_empty(), "content: {content:?}");
        }
    }

    #[tokio::test]
    async fn test_load_non_utf8_file_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileTemplateStore::new();
        let path = temp_dir.path().join("cache.json");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        assert!(store.load(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_directories_and_pretty_prints() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileTemplateStore::new();
        let path = temp_dir
            .path()
            .join("resources/element-templates/.camunda.json");

        store.save(&path, &[template("a", 1)]).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[\n  {\n    \"id\": \"a\",\n    \"version\": 1\n  }\n]");
        assert!(!staging_path(&path).exists());
    }

    #[tokio::test]
    async fn test_save_then_load_keeps_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileTemplateStore::new();
        let path = temp_dir.path().join("cache.json");
        let templates = vec![template("b", 2), template("a", 1), template("b", 1)];

        store.save(&path, &templates).await.unwrap();
        let loaded = store.load(&path).await.unwrap();

        assert_eq!(loaded, templates);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileTemplateStore::new();
        let path = temp_dir.path().join("cache.json");

        store.save(&path, &[template("a", 1), template("a", 2)]).await.unwrap();
        store.save(&path, &[template("c", 1)]).await.unwrap();

        assert_eq!(store.load(&path).await.unwrap(), vec![template("c", 1)]);
    }

    #[test]
    fn test_staging_path() {
        assert_eq!(
            staging_path(Path::new("/cache/.camunda.json")),
            PathBuf::from("/cache/.camunda.json.tmp")
        );
    }
}
