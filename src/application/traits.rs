//! Port interfaces for the application layer

use async_trait::async_trait;
use std::path::Path;

use crate::core::{Result, Template};

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Remote source of template indexes and template bodies
///
/// Any HTTP status is a successful fetch; only transport failures
/// (connection, timeout, unreadable body) are errors.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

/// Local persistence of one cached template array per file
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Read the cached templates. A missing file or one that does not hold a
    /// JSON array yields an empty list.
    async fn load(&self, path: &Path) -> Result<Vec<Template>>;

    /// Replace the cache file with `templates`, creating parent directories
    async fn save(&self, path: &Path, templates: &[Template]) -> Result<()>;
}
