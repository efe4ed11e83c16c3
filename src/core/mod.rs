//! Core domain of the element template updater
//!
//! Types describing endpoints, remote indexes and cached templates, plus the
//! pure compatibility rules the update engine applies to them.

pub mod compat;
pub mod config;
pub mod error;
pub mod types;

pub use compat::{is_cached_ref, is_template_compatible};
pub use config::UpdaterConfig;
pub use error::{Error, Result};
pub use types::*;
