//! Domain types shared by the queue, the update engine and its adapters

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One remote template index to poll and the local cache file it maps to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Platform family the templates apply to, e.g. `Camunda Cloud`
    #[serde(rename = "executionPlatform", alias = "execution_platform")]
    pub execution_platform: String,
    /// Name of the cache file below `<userPath>/resources/element-templates`
    #[serde(rename = "fileName", alias = "file_name")]
    pub file_name: String,
    /// URL of the remote index
    pub url: String,
}

impl Endpoint {
    pub fn new(
        execution_platform: impl Into<String>,
        file_name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            execution_platform: execution_platform.into(),
            file_name: file_name.into(),
            url: url.into(),
        }
    }
}

/// A single available version of a template, as listed in a remote index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    pub version: u64,
    /// Where the template body for this version can be fetched
    #[serde(rename = "ref")]
    pub reference: String,
    /// Engine name to semver range, e.g. `{ "camunda": "^8.8" }`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<IndexMap<String, String>>,
}

/// Remote index body: template id to its available versions, in received order
pub type TemplatesByIdMetadata = IndexMap<String, Vec<TemplateMetadata>>;

/// A cached element template.
///
/// The body is owned by an external schema, so only `id`, `version` and
/// `metadata.upstreamRef` are interpreted; everything else is carried
/// through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(Value);

impl Template {
    /// Wrap a freshly fetched body. Returns `None` unless it is a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        value.is_object().then_some(Self(value))
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<u64> {
        self.0.get("version").and_then(Value::as_u64)
    }

    /// The URL this body was last fetched from, if recorded
    pub fn upstream_ref(&self) -> Option<&str> {
        self.0
            .get("metadata")
            .and_then(|metadata| metadata.get("upstreamRef"))
            .and_then(Value::as_str)
    }

    /// Record `reference` as `metadata.upstreamRef`, keeping any other metadata
    pub fn set_upstream_ref(&mut self, reference: &str) {
        let Some(body) = self.0.as_object_mut() else {
            return;
        };

        let metadata = body
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if !metadata.is_object() {
            *metadata = Value::Object(Map::new());
        }
        if let Some(metadata) = metadata.as_object_mut() {
            metadata.insert(
                "upstreamRef".to_string(),
                Value::String(reference.to_string()),
            );
        }
    }

    /// Whether this template is the `(id, version)` pair in question
    pub fn is(&self, id: &str, version: u64) -> bool {
        self.id() == Some(id) && self.version() == Some(version)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Outcome of one endpoint's reconciliation cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub warnings: Vec<String>,
    /// The cache grew during the cycle
    pub has_new: bool,
}

impl UpdateResult {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            warnings: vec![message.into()],
            has_new: false,
        }
    }
}

/// Results of several endpoints folded together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateResult {
    pub has_new: bool,
    pub warnings: Vec<String>,
}

impl AggregateResult {
    /// OR the `has_new` flags and append the warnings in order
    pub fn push(&mut self, result: UpdateResult) {
        self.has_new |= result.has_new;
        self.warnings.extend(result.warnings);
    }
}

impl FromIterator<UpdateResult> for AggregateResult {
    fn from_iter<I: IntoIterator<Item = UpdateResult>>(iter: I) -> Self {
        let mut aggregate = Self::default();
        for result in iter {
            aggregate.push(result);
        }
        aggregate
    }
}

/// Broadcast once every time the update queue drains
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateDone {
    pub has_new: bool,
    pub warnings: Vec<String>,
}

impl From<AggregateResult> for UpdateDone {
    fn from(aggregate: AggregateResult) -> Self {
        Self {
            has_new: aggregate.has_new,
            warnings: aggregate.warnings,
        }
    }
}
