//! Request-serializing task queue

pub mod serial_queue;

pub use serial_queue::{QueueError, QueueEvent, SerialQueue};
