//! Server assembly with deferred startup.
//!
//! `new()` allocates shared state, `start()` registers every service queue,
//! builds the routing table, and opens the dispatcher, and `shutdown()`
//! drains and closes the queues in reverse order. Between `new()` and
//! `start()` nothing is running, so callers can share the registries with
//! other components first.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use cimom_core::{ControlMessage, Message};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::lifecycle::{LifecycleState, ServerLifecycle};
use crate::queue::{Envelope, MessageHandler, MessageQueue, QueueRegistry, QueueService};
use crate::routing::{queue_names, DynamicRoutingTable, RouteDump};
use crate::service::{
    build_dispatch_pipeline, ControlService, DispatchPipeline, Dispatcher, DispatcherHandler,
    IndicationHandlerService, IndicationService, ManagedService, ProviderManagerService,
    ServerConfig, ServiceContext, ServiceRegistry,
};
use crate::traits::ProviderRegistry;

/// The CIM object manager core: service queues, routing, and dispatch.
pub struct CimServer {
    config: Arc<ServerConfig>,
    queues: Arc<QueueRegistry>,
    routing: Arc<DynamicRoutingTable>,
    services: ServiceRegistry,
    lifecycle: Arc<ServerLifecycle>,
    providers: Arc<dyn ProviderRegistry>,
    workers: Vec<QueueService>,
    dispatcher_queue: Option<MessageQueue>,
    pipeline: Option<DispatchPipeline>,
}

impl CimServer {
    /// Creates a server without starting any service.
    #[must_use]
    pub fn new(config: ServerConfig, providers: Arc<dyn ProviderRegistry>) -> Self {
        Self {
            config: Arc::new(config),
            queues: Arc::new(QueueRegistry::new()),
            routing: Arc::new(DynamicRoutingTable::new()),
            services: ServiceRegistry::new(),
            lifecycle: Arc::new(ServerLifecycle::new()),
            providers,
            workers: Vec::new(),
            dispatcher_queue: None,
            pipeline: None,
        }
    }

    #[must_use]
    pub fn queues(&self) -> Arc<QueueRegistry> {
        Arc::clone(&self.queues)
    }

    #[must_use]
    pub fn routing(&self) -> Arc<DynamicRoutingTable> {
        Arc::clone(&self.routing)
    }

    #[must_use]
    pub fn lifecycle(&self) -> Arc<ServerLifecycle> {
        Arc::clone(&self.lifecycle)
    }

    #[must_use]
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// The dispatch pipeline, once the server has started.
    #[must_use]
    pub fn dispatch_pipeline(&self) -> Option<DispatchPipeline> {
        self.pipeline.clone()
    }

    /// The operation dispatcher's queue, once the server has started.
    /// Requests enqueued here are dispatched like calls to the pipeline.
    #[must_use]
    pub fn dispatcher_queue(&self) -> Option<&MessageQueue> {
        self.dispatcher_queue.as_ref()
    }

    /// Routing table rows with queue names resolved.
    ///
    /// # Errors
    ///
    /// Fails if the server has not started.
    pub fn route_dump(&self) -> anyhow::Result<Vec<RouteDump>> {
        Ok(self.routing.table()?.dump(&self.queues))
    }

    /// Starts every service, builds the routing table, and opens the
    /// dispatcher. The server is `Ready` when this returns `Ok`.
    ///
    /// # Errors
    ///
    /// Fails if the server was already started, a queue name is taken, a
    /// service fails to initialize, or the routing table cannot be built.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.lifecycle.state() == LifecycleState::Starting && self.pipeline.is_none(),
            "server already started"
        );

        self.start_service(ControlService::new())?;
        self.start_service(IndicationService::new())?;
        self.start_service(IndicationHandlerService::new())?;
        self.start_service(ProviderManagerService::new())?;

        let ctx = ServiceContext {
            config: Arc::clone(&self.config),
            queues: Arc::clone(&self.queues),
        };
        self.services.init_all(&ctx).await?;

        let (queue, rx) = self
            .queues
            .register(queue_names::OPERATION_DISPATCHER, self.config.queue_capacity)?;

        let table = self
            .routing
            .build_routing_table(&self.queues)
            .context("building routing table")?;
        for row in table.dump(&self.queues) {
            anyhow::ensure!(
                row.service_name.is_some(),
                "route for {} targets unregistered queue {}",
                row.class_name,
                row.service_id
            );
        }
        let routes = table.len();

        let dispatcher = Dispatcher::new(
            queue.id(),
            Arc::clone(&self.routing),
            Arc::clone(&self.queues),
            Arc::clone(&self.providers),
            &self.config,
        );
        let pipeline = build_dispatch_pipeline(dispatcher, Arc::clone(&self.lifecycle), &self.config);
        self.spawn_worker(queue.clone(), rx, Arc::new(DispatcherHandler::new(pipeline.clone())));
        self.dispatcher_queue = Some(queue);
        self.pipeline = Some(pipeline);

        self.lifecycle.set_ready();
        info!(queues = self.queues.len(), routes, "server ready");
        Ok(())
    }

    fn start_service<T>(&mut self, service: T) -> anyhow::Result<()>
    where
        T: ManagedService + MessageHandler,
    {
        let service = self.services.register(service)?;
        let (queue, rx) = self
            .queues
            .register(service.name(), self.config.queue_capacity)?;
        self.spawn_worker(queue, rx, service);
        Ok(())
    }

    fn spawn_worker<H: MessageHandler>(
        &mut self,
        queue: MessageQueue,
        rx: mpsc::Receiver<Envelope>,
        handler: Arc<H>,
    ) {
        let worker = QueueService::start(
            queue,
            rx,
            handler,
            Arc::clone(&self.queues),
            self.config.max_threads_per_service_queue,
        );
        self.workers.push(worker);
    }

    /// Drains in-flight operations and closes every queue, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if a service fails to shut down.
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        self.lifecycle.begin_drain();
        let drain_timeout = Duration::from_millis(self.config.drain_timeout_ms);
        if !self.lifecycle.wait_for_drain(drain_timeout).await {
            warn!(
                in_flight = self.lifecycle.in_flight_count(),
                "drain timeout expired, closing queues with operations in flight"
            );
        }

        while let Some(mut worker) = self.workers.pop() {
            let queue = worker.queue().clone();
            let close = Message::control(ControlMessage::IoClose, queue.id());
            if let Err(e) = queue.send_wait(close).await {
                warn!(queue = queue.name(), error = %e, "queue did not acknowledge close");
            }
            worker.join().await;
            self.queues.deregister(queue.id());
        }
        self.dispatcher_queue = None;
        self.pipeline = None;

        self.services.shutdown_all(false).await?;
        self.lifecycle.set_stopped();
        info!("server stopped");
        Ok(())
    }
}
