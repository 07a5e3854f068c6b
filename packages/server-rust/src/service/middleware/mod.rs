//! Tower middleware layers for the dispatch pipeline.
//!
//! - [`lifecycle`]: Lifecycle gating and in-flight tracking
//! - [`load_shed`]: Semaphore-based concurrency limiting
//! - [`timeout`]: Per-operation timeout enforcement
//! - [`metrics`]: Operation timing via `tracing` spans
//! - [`pipeline`]: Composes all layers into a single service stack

pub mod lifecycle;
pub mod load_shed;
pub mod metrics;
pub mod pipeline;
pub mod timeout;

pub use lifecycle::LifecycleLayer;
pub use load_shed::LoadShedLayer;
pub use metrics::MetricsLayer;
pub use pipeline::{build_dispatch_pipeline, DispatchPipeline};
pub use timeout::TimeoutLayer;
