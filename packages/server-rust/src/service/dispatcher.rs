//! Operation dispatch: resolves each request to a service queue, forwards it,
//! and gathers the reply.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use cimom_core::{CimName, CimNamespaceName, Message, QueueId};
use tower::Service;
use tracing::debug;

use super::classify::RequestClassifier;
use super::collector::ResponseCollector;
use super::config::ServerConfig;
use super::operation::{DispatchError, DispatchResponse};
use crate::queue::{QueueError, QueueRegistry};
use crate::routing::{queue_names, DynamicRoutingTable, Route, RouteTarget};
use crate::traits::ProviderRegistry;

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes CIM operation requests to the service that handles them.
///
/// Resolution order for a request's class and namespace:
/// 1. The routing table (internal services and control providers)
/// 2. Registered providers, served by the provider manager queue
/// 3. Otherwise the class is not supported
///
/// The dispatcher pushes its own queue id onto each request's return path
/// before forwarding, so replies come back through it. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    own_id: QueueId,
    routing: Arc<DynamicRoutingTable>,
    queues: Arc<QueueRegistry>,
    providers: Arc<dyn ProviderRegistry>,
    classifier: RequestClassifier,
    reply_capacity: usize,
}

impl Dispatcher {
    /// Creates a dispatcher that forwards on behalf of queue `own_id`.
    #[must_use]
    pub fn new(
        own_id: QueueId,
        routing: Arc<DynamicRoutingTable>,
        queues: Arc<QueueRegistry>,
        providers: Arc<dyn ProviderRegistry>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                own_id,
                routing,
                queues,
                providers,
                classifier: RequestClassifier::new(),
                reply_capacity: config.reply_channel_capacity,
            }),
        }
    }

    #[must_use]
    pub fn own_id(&self) -> QueueId {
        self.inner.own_id
    }

    /// Resolves the route for a class in a namespace.
    ///
    /// # Errors
    ///
    /// - `DispatchError::Routing` if the routing table is not built yet
    /// - `DispatchError::NotSupported` if neither the routing table nor the
    ///   provider registry knows the class
    /// - `DispatchError::Queue` if a provider is registered but the provider
    ///   manager queue is not
    pub async fn resolve(
        &self,
        class_name: &CimName,
        namespace: &CimNamespaceName,
    ) -> Result<Route, DispatchError> {
        if let Some(route) = self.inner.routing.get_routing(class_name, namespace)? {
            return Ok(route.clone());
        }

        let Some(module) = self.inner.providers.lookup(class_name, namespace).await? else {
            return Err(DispatchError::NotSupported {
                class_name: class_name.clone(),
                namespace: namespace.clone(),
            });
        };
        let service_id = self
            .inner
            .queues
            .lookup(queue_names::PROVIDER_MANAGER_SERVICE)
            .ok_or_else(|| {
                QueueError::UnknownName(queue_names::PROVIDER_MANAGER_SERVICE.to_string())
            })?;
        Ok(Route::provider(module, service_id))
    }

    /// Classifies, routes, and forwards one request, then collects every
    /// reply part.
    ///
    /// # Errors
    ///
    /// Returns a `DispatchError` if the message is not a dispatchable
    /// request, cannot be routed, cannot be delivered, or its reply stream
    /// is malformed.
    pub async fn dispatch(&self, mut msg: Message) -> Result<DispatchResponse, DispatchError> {
        let classified = self.inner.classifier.classify(&msg)?;
        let route = self
            .resolve(&classified.class_name, &classified.namespace)
            .await?;
        let queue = self
            .inner
            .queues
            .get(route.service_id)
            .ok_or(QueueError::UnknownQueue(route.service_id))?;

        // Only the slot for this route's target may be set on delivery.
        msg.context.control_provider = None;
        msg.context.provider_module = None;
        match &route.target {
            RouteTarget::Service => {}
            RouteTarget::ControlProvider(name) => msg.context.control_provider = Some(name.clone()),
            RouteTarget::Provider(module) => msg.context.provider_module = Some(module.clone()),
        }
        msg.queue_ids.push(self.inner.own_id)?;
        msg.dest = route.service_id;

        debug!(
            call_id = classified.call_id,
            operation = ?classified.operation,
            class = %classified.class_name,
            namespace = %classified.namespace,
            queue = queue.name(),
            provider = route.provider_name(),
            "dispatching"
        );

        let rx = queue.send_stream(msg, self.inner.reply_capacity).await?;
        let parts = ResponseCollector::new(self.inner.own_id).collect(rx).await?;

        Ok(DispatchResponse {
            call_id: classified.call_id,
            operation: classified.operation,
            route,
            parts,
        })
    }
}

impl Service<Message> for Dispatcher {
    type Response = DispatchResponse;
    type Error = DispatchError;
    type Future = Pin<Box<dyn Future<Output = Result<DispatchResponse, DispatchError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, msg: Message) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { this.dispatch(msg).await })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use cimom_core::{
        CimOperationType, CimRequest, CimResponse, MessageBody, MessageType, QueueIdStack,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::queue::{MessageHandler, QueueService};
    use crate::routing::module_names;
    use crate::traits::StaticProviderRegistry;

    /// Answers with the provider slots it saw in the request context.
    struct EchoContext {
        parts: usize,
    }

    #[async_trait]
    impl MessageHandler for EchoContext {
        async fn handle(&self, request: Message) -> Vec<MessageBody> {
            let seen = format!(
                "{}|{}",
                request.context.control_provider.unwrap_or_default(),
                request.context.provider_module.unwrap_or_default()
            );
            (0..self.parts)
                .map(|_| MessageBody::Response(CimResponse::ok(rmpv::Value::from(seen.as_str()))))
                .collect()
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        providers: Arc<StaticProviderRegistry>,
        _services: Vec<QueueService>,
    }

    fn fixture(parts: usize) -> Fixture {
        let queues = Arc::new(QueueRegistry::new());
        let mut services = Vec::new();
        for name in [
            queue_names::CONTROL_SERVICE,
            queue_names::INDICATION_SERVICE,
            queue_names::INDICATION_HANDLER_SERVICE,
            queue_names::PROVIDER_MANAGER_SERVICE,
        ] {
            let (queue, rx) = queues.register(name, 16).unwrap();
            services.push(QueueService::start(
                queue,
                rx,
                Arc::new(EchoContext { parts }),
                Arc::clone(&queues),
                4,
            ));
        }
        let (own, _own_rx) = queues.register(queue_names::OPERATION_DISPATCHER, 16).unwrap();

        let routing = Arc::new(DynamicRoutingTable::new());
        routing.build_routing_table(&queues).unwrap();

        let providers = Arc::new(StaticProviderRegistry::new());
        let dispatcher = Dispatcher::new(
            own.id(),
            routing,
            queues,
            Arc::clone(&providers) as Arc<dyn ProviderRegistry>,
            &ServerConfig::default(),
        );
        Fixture {
            dispatcher,
            providers,
            _services: services,
        }
    }

    fn request(message_type: MessageType, ns: &str, class: &str) -> Message {
        let req = CimRequest::new(
            CimNamespaceName::new(ns).unwrap(),
            CimName::new(class).unwrap(),
        );
        Message::request(message_type, req).unwrap()
    }

    fn echoed(resp: &DispatchResponse) -> String {
        let value = resp.parts[0].cim_response().unwrap().result.clone().unwrap();
        value.as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn control_provider_name_reaches_the_control_service() {
        let f = fixture(1);
        let resp = f
            .dispatcher
            .dispatch(request(
                MessageType::GetInstanceRequest,
                "root/PG_InterOp",
                "PG_ConfigSetting",
            ))
            .await
            .unwrap();

        assert_eq!(resp.operation, CimOperationType::GetInstance);
        assert_eq!(resp.parts[0].message_type(), MessageType::GetInstanceResponse);
        assert_eq!(echoed(&resp), format!("{}|", module_names::CONFIG_PROVIDER));
    }

    #[tokio::test]
    async fn wildcard_service_route() {
        let f = fixture(1);
        let resp = f
            .dispatcher
            .dispatch(request(
                MessageType::CreateInstanceRequest,
                "root/cimv2",
                "CIM_IndicationSubscription",
            ))
            .await
            .unwrap();
        assert_eq!(resp.route.provider_name(), "");
        assert_eq!(echoed(&resp), "|");
    }

    #[tokio::test]
    async fn registered_provider_goes_to_provider_manager() {
        let f = fixture(1);
        f.providers.register(
            CimName::new("CIM_ComputerSystem").unwrap(),
            CimNamespaceName::new("root/cimv2").unwrap(),
            "ComputerSystemModule",
        );

        let resp = f
            .dispatcher
            .dispatch(request(
                MessageType::EnumerateInstancesRequest,
                "root/cimv2",
                "CIM_ComputerSystem",
            ))
            .await
            .unwrap();
        assert_eq!(
            resp.route.target,
            RouteTarget::Provider("ComputerSystemModule".to_string())
        );
        assert_eq!(echoed(&resp), "|ComputerSystemModule");
    }

    #[tokio::test]
    async fn stale_provider_slots_are_cleared() {
        let f = fixture(1);
        f.providers.register(
            CimName::new("CIM_ComputerSystem").unwrap(),
            CimNamespaceName::new("root/cimv2").unwrap(),
            "ComputerSystemModule",
        );
        let stale = |mut msg: Message| {
            msg.context.control_provider = Some("StaleControl".to_string());
            msg.context.provider_module = Some("StaleModule".to_string());
            msg
        };

        let control = f
            .dispatcher
            .dispatch(stale(request(
                MessageType::GetInstanceRequest,
                "root/PG_InterOp",
                "PG_ConfigSetting",
            )))
            .await
            .unwrap();
        assert_eq!(echoed(&control), format!("{}|", module_names::CONFIG_PROVIDER));

        let service = f
            .dispatcher
            .dispatch(stale(request(
                MessageType::CreateInstanceRequest,
                "root/cimv2",
                "CIM_IndicationSubscription",
            )))
            .await
            .unwrap();
        assert_eq!(echoed(&service), "|");

        let provider = f
            .dispatcher
            .dispatch(stale(request(
                MessageType::EnumerateInstancesRequest,
                "root/cimv2",
                "CIM_ComputerSystem",
            )))
            .await
            .unwrap();
        assert_eq!(echoed(&provider), "|ComputerSystemModule");
    }

    #[tokio::test]
    async fn unknown_class_is_not_supported() {
        let f = fixture(1);
        let err = f
            .dispatcher
            .dispatch(request(
                MessageType::GetInstanceRequest,
                "root/other",
                "PG_ConfigSetting",
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotSupported { .. }));
    }

    #[tokio::test]
    async fn replies_return_with_the_callers_stack() {
        let f = fixture(3);
        let mut msg = request(
            MessageType::EnumerateInstancesRequest,
            "root/cimv2",
            "CIM_IndicationFilter",
        );
        msg.queue_ids = QueueIdStack::with_one(QueueId(42));

        let resp = f.dispatcher.clone().oneshot(msg).await.unwrap();
        assert_eq!(resp.parts.len(), 3);
        for (i, part) in resp.parts.iter().enumerate() {
            assert_eq!(part.index() as usize, i);
            assert_eq!(part.queue_ids.as_slice(), &[QueueId(42)]);
            assert_eq!(part.dest, QueueId(42));
        }
        assert!(resp.parts[2].is_complete());
    }

    #[tokio::test]
    async fn full_return_path_is_rejected() {
        let f = fixture(1);
        let mut msg = request(
            MessageType::GetInstanceRequest,
            "root/PG_InterOp",
            "PG_User",
        );
        for i in 0..QueueIdStack::CAPACITY {
            msg.queue_ids.push(QueueId(100 + i as u32)).unwrap();
        }
        let err = f.dispatcher.dispatch(msg).await.unwrap_err();
        assert!(matches!(err, DispatchError::ReturnPath(_)));
    }

    #[tokio::test]
    async fn unbuilt_routing_table_is_an_error() {
        let queues = Arc::new(QueueRegistry::new());
        let dispatcher = Dispatcher::new(
            QueueId(1),
            Arc::new(DynamicRoutingTable::new()),
            queues,
            Arc::new(StaticProviderRegistry::new()),
            &ServerConfig::default(),
        );
        let err = dispatcher
            .dispatch(request(MessageType::GetClassRequest, "root/cimv2", "CIM_Foo"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Routing(_)));
    }
}
