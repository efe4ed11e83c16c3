//! Template update engine
//!
//! Reconciles the local element template caches against their remote
//! indexes. Every endpoint update is one task on a shared [`SerialQueue`],
//! so no two read-modify-write cycles ever overlap.

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::application::{FetchResponse, TemplateSource, TemplateStore};
use crate::core::{
    AggregateResult, Endpoint, Result, Template, TemplateMetadata, UpdateDone, UpdateResult,
    UpdaterConfig, is_cached_ref, is_template_compatible,
};
use crate::infrastructure::{FileTemplateStore, HttpTemplateSource};
use crate::queue::{QueueEvent, SerialQueue};

/// Cache files live in `<user_path>/resources/element-templates/`
pub const TEMPLATES_SUBDIR: &str = "resources/element-templates";

const DONE_CAPACITY: usize = 64;

/// Path of the cache file an endpoint maps to
pub fn cache_file_path(user_path: &Path, endpoint: &Endpoint) -> PathBuf {
    user_path.join(TEMPLATES_SUBDIR).join(&endpoint.file_name)
}

/// Keeps element template caches in sync with their remote indexes.
///
/// [`update`](Self::update) returns the outcome of the endpoints it was asked
/// for. Subscribers from [`subscribe`](Self::subscribe) get one [`UpdateDone`]
/// whenever the queue drains, covering every endpoint update that finished
/// since the previous drain, possibly from several overlapping calls.
pub struct TemplateUpdater {
    reconciler: Arc<Reconciler>,
    queue: SerialQueue<UpdateResult, Infallible>,
    done: broadcast::Sender<UpdateDone>,
}

impl TemplateUpdater {
    /// Updater backed by HTTP and JSON files on disk.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(user_path: impl Into<PathBuf>, endpoints: Vec<Endpoint>) -> Result<Self> {
        let source = HttpTemplateSource::new()?;
        Ok(Self::with_collaborators(
            user_path,
            endpoints,
            Arc::new(source),
            Arc::new(FileTemplateStore::new()),
        ))
    }

    /// Updater for a loaded configuration, honoring its fetch timeout
    pub fn from_config(config: &UpdaterConfig) -> Result<Self> {
        let source = HttpTemplateSource::with_timeout(config.fetch_timeout())?;
        Ok(Self::with_collaborators(
            config.resolve_user_path()?,
            config.endpoints.clone(),
            Arc::new(source),
            Arc::new(FileTemplateStore::new()),
        ))
    }

    pub fn with_collaborators(
        user_path: impl Into<PathBuf>,
        endpoints: Vec<Endpoint>,
        source: Arc<dyn TemplateSource>,
        store: Arc<dyn TemplateStore>,
    ) -> Self {
        let queue = SerialQueue::new();
        let (done, _) = broadcast::channel(DONE_CAPACITY);

        tokio::spawn(collect_until_drained(queue.subscribe(), done.clone()));

        Self {
            reconciler: Arc::new(Reconciler {
                user_path: user_path.into(),
                endpoints,
                source,
                store,
            }),
            queue,
            done,
        }
    }

    /// Update every endpoint configured for `execution_platform`.
    ///
    /// Never fails: each problem becomes a warning in the result.
    pub async fn update(
        &self,
        execution_platform: &str,
        execution_platform_version: &str,
    ) -> AggregateResult {
        let endpoints: Vec<Endpoint> = self
            .reconciler
            .endpoints
            .iter()
            .filter(|endpoint| endpoint.execution_platform == execution_platform)
            .cloned()
            .collect();

        info!(
            platform = %execution_platform,
            version = %execution_platform_version,
            endpoints = endpoints.len(),
            "Updating element templates"
        );

        let tasks: Vec<_> = endpoints
            .iter()
            .map(|endpoint| {
                let reconciler = Arc::clone(&self.reconciler);
                let endpoint = endpoint.clone();
                let version = execution_platform_version.to_string();
                self.queue
                    .add(move || async move { Ok(reconciler.reconcile(&endpoint, &version).await) })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;

        let aggregate: AggregateResult = endpoints
            .iter()
            .zip(results)
            .map(|(endpoint, result)| match result {
                Ok(result) => result,
                Err(e) => {
                    let message = format!("Failed to update templates from {}: {}", endpoint.url, e);
                    warn!("{message}");
                    UpdateResult::warning(message)
                }
            })
            .collect();

        info!(
            has_new = aggregate.has_new,
            warnings = aggregate.warnings.len(),
            "Element templates updated"
        );
        aggregate
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UpdateDone> {
        self.done.subscribe()
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.reconciler.endpoints
    }

    pub fn cache_file_path(&self, endpoint: &Endpoint) -> PathBuf {
        cache_file_path(&self.reconciler.user_path, endpoint)
    }

    /// Current cache contents for `endpoint`
    pub async fn cached_templates(&self, endpoint: &Endpoint) -> Result<Vec<Template>> {
        self.reconciler
            .store
            .load(&self.cache_file_path(endpoint))
            .await
    }
}

/// Fold completed results and publish them each time the queue drains
async fn collect_until_drained(
    mut events: broadcast::Receiver<QueueEvent<UpdateResult>>,
    done: broadcast::Sender<UpdateDone>,
) {
    let mut pending = AggregateResult::default();
    loop {
        match events.recv().await {
            Ok(QueueEvent::Completed(result)) => pending.push(result),
            Ok(QueueEvent::Empty) => {
                let _ = done.send(std::mem::take(&mut pending).into());
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Update listener fell behind; some results were not aggregated");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

enum FetchOutcome {
    Fetched(Template),
    Skipped(String),
}

struct Reconciler {
    user_path: PathBuf,
    endpoints: Vec<Endpoint>,
    source: Arc<dyn TemplateSource>,
    store: Arc<dyn TemplateStore>,
}

impl Reconciler {
    async fn reconcile(&self, endpoint: &Endpoint, execution_platform_version: &str) -> UpdateResult {
        match self.try_reconcile(endpoint, execution_platform_version).await {
            Ok(result) => result,
            Err(e) => {
                let message = format!("Failed to update templates from {}: {}", endpoint.url, e);
                warn!("{message}");
                UpdateResult::warning(message)
            }
        }
    }

    async fn try_reconcile(
        &self,
        endpoint: &Endpoint,
        execution_platform_version: &str,
    ) -> Result<UpdateResult> {
        let path = cache_file_path(&self.user_path, endpoint);
        let mut templates = self.store.load(&path).await?;
        let original_len = templates.len();

        debug!(url = %endpoint.url, "Fetching template index");
        let response = self.source.fetch(&endpoint.url).await?;
        if !response.is_success() {
            let message = format!(
                "Failed to fetch templates from {} (HTTP {})",
                endpoint.url, response.status
            );
            warn!("{message}");
            return Ok(UpdateResult::warning(message));
        }

        // Entries are checked one by one so a malformed version does not hide its siblings
        let index: IndexMap<String, Vec<Value>> = serde_json::from_str(&response.body)?;

        let mut warnings = Vec::new();
        for (id, versions) in &index {
            for raw in versions {
                let metadata = match serde_json::from_value::<TemplateMetadata>(raw.clone()) {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        let message = format!(
                            "Skipping invalid metadata for template {} from {}: {}",
                            id, endpoint.url, e
                        );
                        warn!("{message}");
                        warnings.push(message);
                        continue;
                    }
                };
                let metadata = &metadata;

                let existing = templates
                    .iter()
                    .position(|template| template.is(id, metadata.version));

                if existing.is_some_and(|i| is_cached_ref(&templates[i], metadata)) {
                    debug!(id = %id, version = metadata.version, "Template is cached");
                    continue;
                }

                if !is_template_compatible(metadata, execution_platform_version) {
                    debug!(
                        id = %id,
                        version = metadata.version,
                        platform_version = %execution_platform_version,
                        "Template is incompatible"
                    );
                    continue;
                }

                match self.fetch_template(id, metadata).await? {
                    FetchOutcome::Fetched(template) => match existing {
                        Some(i) => templates[i] = template,
                        None => templates.push(template),
                    },
                    FetchOutcome::Skipped(message) => {
                        warn!("{message}");
                        warnings.push(message);
                    }
                }
            }
        }

        self.store.save(&path, &templates).await?;

        let has_new = templates.len() != original_len;
        info!(
            url = %endpoint.url,
            templates = templates.len(),
            has_new,
            warnings = warnings.len(),
            "Template cache reconciled"
        );

        Ok(UpdateResult { warnings, has_new })
    }

    async fn fetch_template(&self, id: &str, metadata: &TemplateMetadata) -> Result<FetchOutcome> {
        debug!(id = %id, version = metadata.version, url = %metadata.reference, "Fetching template");
        let FetchResponse { status, body } = self.source.fetch(&metadata.reference).await?;

        if !(200..300).contains(&status) {
            return Ok(FetchOutcome::Skipped(format!(
                "Failed to fetch template {} version {} from {} (HTTP {})",
                id, metadata.version, metadata.reference, status
            )));
        }

        let parsed = serde_json::from_str::<Value>(&body)
            .map_err(|e| e.to_string())
            .and_then(|value| {
                Template::from_value(value).ok_or_else(|| "expected a JSON object".to_string())
            });

        match parsed {
            Ok(mut template) => {
                template.set_upstream_ref(&metadata.reference);
                Ok(FetchOutcome::Fetched(template))
            }
            Err(reason) => Ok(FetchOutcome::Skipped(format!(
                "Failed to parse template {} version {} fetched from {}: {}",
                id, metadata.version, metadata.reference, reason
            ))),
        }
    }
}
