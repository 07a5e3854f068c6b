//! Named message queues and the workers that serve them.

pub mod registry;
pub mod service;

pub use registry::{Envelope, MessageQueue, QueueError, QueueRegistry};
pub use service::{MessageHandler, QueueService};
