//! Lifecycle of the built-in services.
//!
//! Every built-in service owns one queue, named after the service. The
//! server registers the queues first and then initializes the services, so
//! `init` can bind to its queue through `ServiceContext::bind_queue`. A
//! failed `init` shuts the already-initialized services down again, newest
//! first, and leaves the registry as if `init_all` had never run.

use std::any::Any;
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use cimom_core::QueueId;
use parking_lot::RwLock;
use tracing::{info, warn};

use super::config::ServerConfig;
use crate::queue::QueueRegistry;

/// What a service sees of the server while it starts.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    pub config: Arc<ServerConfig>,
    pub queues: Arc<QueueRegistry>,
}

impl ServiceContext {
    /// Id of the queue registered under `name`.
    ///
    /// # Errors
    ///
    /// Fails if no queue carries that name.
    pub fn bind_queue(&self, name: &str) -> anyhow::Result<QueueId> {
        self.queues
            .lookup(name)
            .with_context(|| format!("no queue registered for service {name}"))
    }
}

/// A built-in service with a start/stop lifecycle.
#[async_trait]
pub trait ManagedService: Send + Sync + Any {
    /// Service name, which is also the name of its queue.
    fn name(&self) -> &'static str;

    async fn init(&self, ctx: &ServiceContext) -> anyhow::Result<()>;

    /// Stops the service. With `terminate`, skip anything that could block.
    async fn shutdown(&self, terminate: bool) -> anyhow::Result<()>;
}

struct Registered {
    name: &'static str,
    service: Arc<dyn ManagedService>,
    typed: Arc<dyn Any + Send + Sync>,
    initialized: bool,
}

/// The built-in services in registration order.
#[derive(Default)]
pub struct ServiceRegistry {
    entries: RwLock<Vec<Registered>>,
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service and returns a typed handle to it.
    ///
    /// # Errors
    ///
    /// Fails if a service with the same name is already registered.
    pub fn register<T: ManagedService>(&self, service: T) -> anyhow::Result<Arc<T>> {
        let name = service.name();
        let mut entries = self.entries.write();
        anyhow::ensure!(
            entries.iter().all(|e| e.name != name),
            "service {name} is already registered"
        );
        let service = Arc::new(service);
        entries.push(Registered {
            name,
            service: Arc::clone(&service) as Arc<dyn ManagedService>,
            typed: Arc::clone(&service) as Arc<dyn Any + Send + Sync>,
            initialized: false,
        });
        Ok(service)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.read().iter().map(|e| e.name).collect()
    }

    /// The first registered service of type `T`.
    #[must_use]
    pub fn get<T: ManagedService>(&self) -> Option<Arc<T>> {
        self.entries
            .read()
            .iter()
            .find_map(|e| Arc::clone(&e.typed).downcast::<T>().ok())
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn ManagedService>> {
        self.entries
            .read()
            .iter()
            .find(|e| e.name == name)
            .map(|e| Arc::clone(&e.service))
    }

    #[must_use]
    pub fn is_initialized(&self, name: &str) -> bool {
        self.entries
            .read()
            .iter()
            .any(|e| e.name == name && e.initialized)
    }

    fn mark(&self, name: &str, initialized: bool) {
        if let Some(e) = self.entries.write().iter_mut().find(|e| e.name == name) {
            e.initialized = initialized;
        }
    }

    fn pending(&self, initialized: bool) -> Vec<(&'static str, Arc<dyn ManagedService>)> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.initialized == initialized)
            .map(|e| (e.name, Arc::clone(&e.service)))
            .collect()
    }

    /// Initializes every service not yet initialized, in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first `init` failure, after shutting down the services
    /// this call had already initialized.
    pub async fn init_all(&self, ctx: &ServiceContext) -> anyhow::Result<()> {
        let mut started: Vec<(&'static str, Arc<dyn ManagedService>)> = Vec::new();
        for (name, service) in self.pending(false) {
            if let Err(e) = service.init(ctx).await {
                warn!(service = name, error = %e, "service failed to initialize");
                for (done, service) in started.into_iter().rev() {
                    if let Err(e) = service.shutdown(true).await {
                        warn!(service = done, error = %e, "rollback shutdown failed");
                    }
                    self.mark(done, false);
                }
                return Err(e.context(format!("initializing service {name}")));
            }
            self.mark(name, true);
            started.push((name, service));
        }
        info!(services = started.len(), "services initialized");
        Ok(())
    }

    /// Shuts down every initialized service, newest first. A failure does
    /// not stop the remaining services from shutting down.
    ///
    /// # Errors
    ///
    /// Returns the first `shutdown` failure.
    pub async fn shutdown_all(&self, terminate: bool) -> anyhow::Result<()> {
        let mut first_error = None;
        for (name, service) in self.pending(true).into_iter().rev() {
            if let Err(e) = service.shutdown(terminate).await {
                warn!(service = name, error = %e, "service failed to shut down");
                if first_error.is_none() {
                    first_error = Some(e.context(format!("shutting down service {name}")));
                }
            }
            self.mark(name, false);
        }
        first_error.map_or(Ok(()), Err)
    }
}
