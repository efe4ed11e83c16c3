//! Application layer - the update engine and the ports it depends on

pub mod template_updater;
pub mod traits;

pub use template_updater::*;
pub use traits::*;
