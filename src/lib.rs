//! Element template updater
//!
//! Keeps local caches of element templates in sync with remote template
//! indexes. A [`TemplateUpdater`] fetches each configured endpoint's index,
//! fetches the template versions that are new, moved or compatible with the
//! requested platform version, and rewrites the endpoint's JSON cache file.
//! Updates are serialized through a [`SerialQueue`] so that cache
//! read-modify-write cycles never overlap.
#![deny(unsafe_code)]

pub mod application;
pub mod core;
pub mod infrastructure;
pub mod queue;

pub use application::{FetchResponse, TemplateSource, TemplateStore, TemplateUpdater};
pub use crate::core::{
    AggregateResult, Endpoint, Error, Result, Template, TemplateMetadata, TemplatesByIdMetadata,
    UpdateDone, UpdateResult, UpdaterConfig,
};
pub use queue::{QueueError, QueueEvent, SerialQueue};
