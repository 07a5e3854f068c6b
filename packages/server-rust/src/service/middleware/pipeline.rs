//! Pipeline composition: combines all middleware layers into a single service stack.

use std::sync::Arc;

use cimom_core::Message;
use tower::util::BoxCloneSyncService;
use tower::ServiceBuilder;

use super::lifecycle::LifecycleLayer;
use super::load_shed::LoadShedLayer;
use super::metrics::MetricsLayer;
use super::timeout::TimeoutLayer;
use crate::lifecycle::ServerLifecycle;
use crate::service::config::ServerConfig;
use crate::service::dispatcher::Dispatcher;
use crate::service::operation::{DispatchError, DispatchResponse};

/// The type-erased dispatch pipeline. Cheap to clone; each clone shares the
/// same concurrency limit and lifecycle.
pub type DispatchPipeline = BoxCloneSyncService<Message, DispatchResponse, DispatchError>;

/// Build the dispatch pipeline by wrapping the `Dispatcher` with middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `LifecycleLayer` -- reject unless the server is ready, count in-flight work
/// 2. `LoadShedLayer` -- reject when overloaded
/// 3. `TimeoutLayer` -- enforce per-operation timeouts
/// 4. `MetricsLayer` -- record timing and outcome (closest to the dispatcher)
#[must_use]
pub fn build_dispatch_pipeline(
    dispatcher: Dispatcher,
    lifecycle: Arc<ServerLifecycle>,
    config: &ServerConfig,
) -> DispatchPipeline {
    BoxCloneSyncService::new(
        ServiceBuilder::new()
            .layer(LifecycleLayer::new(lifecycle))
            .layer(LoadShedLayer::new(config.max_concurrent_operations))
            .layer(TimeoutLayer::new(config.default_operation_timeout_ms))
            .layer(MetricsLayer)
            .service(dispatcher),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use cimom_core::{CimName, CimNamespaceName, CimRequest, MessageType, QueueId};
    use tower::ServiceExt;

    use super::*;
    use crate::lifecycle::LifecycleState;
    use crate::queue::QueueRegistry;
    use crate::routing::DynamicRoutingTable;
    use crate::traits::StaticProviderRegistry;

    fn pipeline(lifecycle: Arc<ServerLifecycle>) -> DispatchPipeline {
        let routing = Arc::new(DynamicRoutingTable::new());
        routing
            .build_with(|| Ok(crate::routing::RoutingTable::default()))
            .unwrap();
        let dispatcher = Dispatcher::new(
            QueueId(1),
            routing,
            Arc::new(QueueRegistry::new()),
            Arc::new(StaticProviderRegistry::new()),
            &ServerConfig::default(),
        );
        build_dispatch_pipeline(dispatcher, lifecycle, &ServerConfig::default())
    }

    fn request() -> Message {
        let req = CimRequest::new(
            CimNamespaceName::new("root/cimv2").unwrap(),
            CimName::new("CIM_Foo").unwrap(),
        );
        Message::request(MessageType::GetClassRequest, req).unwrap()
    }

    #[tokio::test]
    async fn pipeline_reaches_the_dispatcher_when_ready() {
        let lifecycle = Arc::new(ServerLifecycle::new());
        lifecycle.set_ready();

        let err = pipeline(lifecycle).oneshot(request()).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotSupported { .. }));
    }

    #[tokio::test]
    async fn pipeline_gates_on_lifecycle() {
        let lifecycle = Arc::new(ServerLifecycle::new());
        let err = pipeline(lifecycle).oneshot(request()).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotReady(LifecycleState::Starting)));
    }
}
