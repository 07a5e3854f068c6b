//! Built-in services behind the internal queues.
//!
//! Each service implements both `ManagedService` (lifecycle) and
//! `MessageHandler` (request handling). `init` binds a service to the queue
//! registered under its name and opens it; `shutdown` closes it again, after
//! which every request is refused. Their business logic lives outside this
//! crate: an open service answers `CIM_ERR_NOT_SUPPORTED` naming the handler
//! that was asked, which is what a client sees from a stub provider.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use async_trait::async_trait;
use cimom_core::{CimError, CimResponse, Message, MessageBody, QueueId};
use parking_lot::RwLock;
use tower::ServiceExt;
use tracing::{debug, info, warn};

use crate::queue::MessageHandler;
use crate::routing::{module_names, queue_names, CONTROL_PROVIDER_DEFINITIONS};
use crate::service::middleware::DispatchPipeline;
use crate::service::registry::{ManagedService, ServiceContext};

fn error_reply(error: CimError) -> Vec<MessageBody> {
    vec![MessageBody::Response(CimResponse::err(error))]
}

fn describe(request: &Message) -> String {
    match request.cim_request() {
        Some(req) => format!(
            "{} on {}:{}",
            request.message_type(),
            req.namespace,
            req.class_name
        ),
        None => request.message_type().to_string(),
    }
}

// ---------------------------------------------------------------------------
// QueueBinding
// ---------------------------------------------------------------------------

/// The queue a service serves and whether it currently accepts requests.
#[derive(Debug, Default)]
struct QueueBinding {
    queue: OnceLock<QueueId>,
    open: AtomicBool,
}

impl QueueBinding {
    /// Binds to the queue named `name` and opens the service. Binding again
    /// is allowed only to the same queue.
    fn bind(&self, name: &'static str, ctx: &ServiceContext) -> anyhow::Result<QueueId> {
        let id = ctx.bind_queue(name)?;
        let bound = *self.queue.get_or_init(|| id);
        anyhow::ensure!(
            bound == id,
            "service {name} is bound to {bound} but its queue is now {id}"
        );
        self.open.store(true, Ordering::Release);
        info!(service = name, queue = %id, "service opened");
        Ok(id)
    }

    fn close(&self, name: &'static str) {
        if self.open.swap(false, Ordering::AcqRel) {
            info!(service = name, "service closed");
        }
    }

    fn queue_id(&self) -> Option<QueueId> {
        self.queue.get().copied()
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn refuse_if_closed(&self, name: &'static str, request: &Message) -> Option<Vec<MessageBody>> {
        if self.is_open() {
            return None;
        }
        debug!(service = name, message_type = %request.message_type(), "request refused");
        Some(error_reply(CimError::failed(format!(
            "service {name} is not running: {}",
            describe(request)
        ))))
    }
}

// ---------------------------------------------------------------------------
// Macro for services without in-process handlers
// ---------------------------------------------------------------------------

/// Generate a built-in service whose requests are not handled in-process.
macro_rules! builtin_service {
    (
        $(#[$meta:meta])*
        $name:ident, $queue:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default)]
        pub struct $name {
            binding: QueueBinding,
        }

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Queue this service was bound to by `init`.
            #[must_use]
            pub fn queue_id(&self) -> Option<QueueId> {
                self.binding.queue_id()
            }
        }

        #[async_trait]
        impl ManagedService for $name {
            fn name(&self) -> &'static str {
                $queue
            }

            async fn init(&self, ctx: &ServiceContext) -> anyhow::Result<()> {
                self.binding.bind($queue, ctx)?;
                Ok(())
            }

            async fn shutdown(&self, _terminate: bool) -> anyhow::Result<()> {
                self.binding.close($queue);
                Ok(())
            }
        }

        #[async_trait]
        impl MessageHandler for $name {
            async fn handle(&self, request: Message) -> Vec<MessageBody> {
                if let Some(refused) = self.binding.refuse_if_closed($queue, &request) {
                    return refused;
                }
                error_reply(CimError::not_supported(format!(
                    "{}: {} is not implemented",
                    $queue,
                    describe(&request)
                )))
            }
        }
    };
}

builtin_service!(
    /// Indication subscription, filter, and handler management.
    IndicationService, queue_names::INDICATION_SERVICE
);

builtin_service!(
    /// Listener destination queues for indication delivery.
    IndicationHandlerService, queue_names::INDICATION_HANDLER_SERVICE
);

builtin_service!(
    /// Hosts registered provider modules. Requests arrive with the module
    /// chosen by provider-registration lookup in their context.
    ProviderManagerService, queue_names::PROVIDER_MANAGER_SERVICE
);

// ---------------------------------------------------------------------------
// ControlService
// ---------------------------------------------------------------------------

/// Hosts the built-in control providers. The provider a request is for is
/// named in its context by the dispatcher.
#[derive(Debug)]
pub struct ControlService {
    providers: RwLock<HashSet<&'static str, ahash::RandomState>>,
    binding: QueueBinding,
}

impl ControlService {
    /// A control service hosting every built-in control provider module.
    #[must_use]
    pub fn new() -> Self {
        Self::with_providers(module_names::ALL.iter().copied())
    }

    /// A control service hosting only `providers`.
    #[must_use]
    pub fn with_providers(providers: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            providers: RwLock::new(providers.into_iter().collect()),
            binding: QueueBinding::default(),
        }
    }

    #[must_use]
    pub fn hosts(&self, module: &str) -> bool {
        self.providers.read().contains(module)
    }

    /// Stops hosting a provider module. Requests routed to it fail.
    pub fn remove_provider(&self, module: &str) -> bool {
        self.providers.write().remove(module)
    }

    #[must_use]
    pub fn queue_id(&self) -> Option<QueueId> {
        self.binding.queue_id()
    }

    /// Routed provider modules this service does not host, in table order.
    #[must_use]
    pub fn missing_providers(&self) -> Vec<&'static str> {
        let hosted = self.providers.read();
        let mut missing: Vec<&'static str> = Vec::new();
        for def in CONTROL_PROVIDER_DEFINITIONS {
            if !hosted.contains(def.provider) && !missing.contains(&def.provider) {
                missing.push(def.provider);
            }
        }
        missing
    }
}

impl Default for ControlService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManagedService for ControlService {
    fn name(&self) -> &'static str {
        queue_names::CONTROL_SERVICE
    }

    /// Fails if a control-provider route names a module this service does
    /// not host.
    async fn init(&self, ctx: &ServiceContext) -> anyhow::Result<()> {
        let missing = self.missing_providers();
        anyhow::ensure!(
            missing.is_empty(),
            "control providers routed to but not hosted: {}",
            missing.join(", ")
        );
        self.binding.bind(self.name(), ctx)?;
        debug!(providers = self.providers.read().len(), "control providers hosted");
        Ok(())
    }

    async fn shutdown(&self, terminate: bool) -> anyhow::Result<()> {
        self.binding.close(self.name());
        if terminate {
            self.providers.write().clear();
        }
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for ControlService {
    async fn handle(&self, request: Message) -> Vec<MessageBody> {
        if let Some(refused) = self.binding.refuse_if_closed(self.name(), &request) {
            return refused;
        }
        let error = match request.context.control_provider.as_deref() {
            Some(module) if self.hosts(module) => CimError::not_supported(format!(
                "{module}: {} is not implemented",
                describe(&request)
            )),
            Some(module) => {
                warn!(provider = module, "request for unknown control provider");
                CimError::failed(format!("control provider {module} is not available"))
            }
            None => CimError::failed(format!("no control provider for {}", describe(&request))),
        };
        error_reply(error)
    }
}

// ---------------------------------------------------------------------------
// DispatcherHandler
// ---------------------------------------------------------------------------

/// Serves the operation dispatcher queue: every request is run through the
/// dispatch pipeline and the collected reply bodies are sent back in order.
#[derive(Clone)]
pub struct DispatcherHandler {
    pipeline: DispatchPipeline,
}

impl DispatcherHandler {
    #[must_use]
    pub fn new(pipeline: DispatchPipeline) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl MessageHandler for DispatcherHandler {
    async fn handle(&self, request: Message) -> Vec<MessageBody> {
        match self.pipeline.clone().oneshot(request).await {
            Ok(resp) => resp.parts.into_iter().map(|part| part.body).collect(),
            Err(e) => {
                debug!(error = %e, "dispatch failed");
                error_reply(e.to_cim_error())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cimom_core::{CimName, CimNamespaceName, CimRequest, CimStatusCode, MessageType};

    use super::*;
    use crate::queue::QueueRegistry;
    use crate::service::config::ServerConfig;
    use crate::service::registry::ServiceRegistry;

    fn request(class: &str) -> Message {
        let req = CimRequest::new(
            CimNamespaceName::new("root/PG_InterOp").unwrap(),
            CimName::new(class).unwrap(),
        );
        Message::request(MessageType::GetInstanceRequest, req).unwrap()
    }

    fn error_of(mut bodies: Vec<MessageBody>) -> CimError {
        assert_eq!(bodies.len(), 1);
        match bodies.remove(0) {
            MessageBody::Response(resp) => resp.result.unwrap_err(),
            other => panic!("unexpected body {other:?}"),
        }
    }

    /// Context whose registry has a queue for every built-in service.
    fn ctx() -> ServiceContext {
        let queues = Arc::new(QueueRegistry::new());
        for name in [
            queue_names::CONTROL_SERVICE,
            queue_names::INDICATION_SERVICE,
            queue_names::INDICATION_HANDLER_SERVICE,
            queue_names::PROVIDER_MANAGER_SERVICE,
        ] {
            let _ = queues.register(name, 1).unwrap();
        }
        ServiceContext {
            config: Arc::new(ServerConfig::default()),
            queues,
        }
    }

    async fn started<T: ManagedService>(service: T) -> T {
        service.init(&ctx()).await.unwrap();
        service
    }

    #[tokio::test]
    async fn indication_service_names_itself() {
        let service = started(IndicationService::new()).await;
        let err = error_of(service.handle(request("CIM_IndicationFilter")).await);
        assert_eq!(err.code, CimStatusCode::NotSupported);
        assert!(err.message.starts_with(queue_names::INDICATION_SERVICE));
        assert!(err.message.contains("CIM_IndicationFilter"));
    }

    #[tokio::test]
    async fn init_binds_the_registered_queue() {
        let ctx = ctx();
        let service = IndicationHandlerService::new();
        assert!(service.queue_id().is_none());

        service.init(&ctx).await.unwrap();
        assert_eq!(
            service.queue_id(),
            ctx.queues.lookup(queue_names::INDICATION_HANDLER_SERVICE)
        );
    }

    #[tokio::test]
    async fn init_without_a_queue_fails() {
        let ctx = ServiceContext {
            config: Arc::new(ServerConfig::default()),
            queues: Arc::new(QueueRegistry::new()),
        };
        assert!(ProviderManagerService::new().init(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn unstarted_and_stopped_services_refuse_requests() {
        let service = IndicationService::new();
        let err = error_of(service.handle(request("CIM_IndicationFilter")).await);
        assert_eq!(err.code, CimStatusCode::Failed);

        service.init(&ctx()).await.unwrap();
        service.shutdown(false).await.unwrap();
        let err = error_of(service.handle(request("CIM_IndicationFilter")).await);
        assert_eq!(err.code, CimStatusCode::Failed);
        assert!(err.message.contains("not running"));
    }

    #[tokio::test]
    async fn control_service_answers_for_known_provider() {
        let control = started(ControlService::new()).await;
        let mut msg = request("PG_ConfigSetting");
        msg.context.control_provider = Some(module_names::CONFIG_PROVIDER.to_string());

        let err = error_of(control.handle(msg).await);
        assert_eq!(err.code, CimStatusCode::NotSupported);
        assert!(err.message.starts_with(module_names::CONFIG_PROVIDER));
    }

    #[tokio::test]
    async fn control_service_rejects_unknown_or_missing_provider() {
        let control = started(ControlService::new()).await;
        assert!(control.remove_provider(module_names::SHUTDOWN_PROVIDER));

        let mut msg = request("PG_ShutdownService");
        msg.context.control_provider = Some(module_names::SHUTDOWN_PROVIDER.to_string());
        assert_eq!(error_of(control.handle(msg).await).code, CimStatusCode::Failed);

        let err = error_of(control.handle(request("PG_User")).await);
        assert_eq!(err.code, CimStatusCode::Failed);
    }

    #[tokio::test]
    async fn control_service_init_requires_every_routed_provider() {
        let control = ControlService::new();
        assert!(control.missing_providers().is_empty());

        assert!(control.remove_provider(module_names::CONFIG_PROVIDER));
        assert_eq!(control.missing_providers(), vec![module_names::CONFIG_PROVIDER]);
        let err = control.init(&ctx()).await.unwrap_err();
        assert!(err.to_string().contains(module_names::CONFIG_PROVIDER));
        assert!(control.queue_id().is_none());
    }

    #[tokio::test]
    async fn terminating_control_service_drops_its_providers() {
        let control = started(ControlService::new()).await;
        control.shutdown(true).await.unwrap();
        assert!(!control.hosts(module_names::CONFIG_PROVIDER));
    }

    #[tokio::test]
    async fn provider_manager_names_the_module() {
        let manager = started(ProviderManagerService::new()).await;
        let mut msg = request("CIM_ComputerSystem");
        msg.context.provider_module = Some("ComputerSystemModule".to_string());
        let err = error_of(manager.handle(msg).await);
        assert_eq!(err.code, CimStatusCode::NotSupported);
        assert!(err.message.contains("ComputerSystemModule"));
    }

    #[tokio::test]
    async fn services_start_and_stop_through_the_registry() {
        let registry = ServiceRegistry::new();
        let control = registry.register(ControlService::new()).unwrap();
        let indication = registry.register(IndicationService::new()).unwrap();
        registry.register(IndicationHandlerService::new()).unwrap();
        registry.register(ProviderManagerService::new()).unwrap();

        assert_eq!(
            registry.names(),
            vec![
                queue_names::CONTROL_SERVICE,
                queue_names::INDICATION_SERVICE,
                queue_names::INDICATION_HANDLER_SERVICE,
                queue_names::PROVIDER_MANAGER_SERVICE,
            ]
        );

        let ctx = ctx();
        registry.init_all(&ctx).await.unwrap();
        assert_eq!(control.queue_id(), ctx.queues.lookup(queue_names::CONTROL_SERVICE));
        assert!(indication.queue_id().is_some());

        registry.shutdown_all(false).await.unwrap();
        let err = error_of(indication.handle(request("CIM_IndicationFilter")).await);
        assert_eq!(err.code, CimStatusCode::Failed);
    }
}
