//! Infrastructure layer - concrete implementations of the application ports

pub mod cache;
pub mod remote;

pub use cache::*;
pub use remote::*;
