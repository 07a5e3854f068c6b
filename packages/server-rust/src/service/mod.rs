//! Operation dispatch and the built-in services.
//!
//! This module implements the dispatch pipeline:
//!
//! 1. **Classification** (`classify`): `Message` -> `Result<Classified, ClassifyError>`
//! 2. **Middleware** (`middleware`): Tower layers (lifecycle, load-shedding, timeout, metrics)
//! 3. **Dispatch** (`dispatcher`): Route to a service queue and forward
//! 4. **Collection** (`collector`): Reassemble multi-part replies in index order
//! 5. **Built-in services** (`domain`): Handlers behind the internal queues

pub mod classify;
pub mod collector;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod middleware;
pub mod operation;
pub mod registry;

// Re-export key types for convenient access.
pub use classify::RequestClassifier;
pub use collector::ResponseCollector;
pub use config::ServerConfig;
pub use dispatcher::Dispatcher;
pub use domain::{
    ControlService, DispatcherHandler, IndicationHandlerService, IndicationService,
    ProviderManagerService,
};
pub use middleware::{build_dispatch_pipeline, DispatchPipeline};
pub use operation::{Classified, ClassifyError, DispatchError, DispatchResponse};
pub use registry::{ManagedService, ServiceContext, ServiceRegistry};
