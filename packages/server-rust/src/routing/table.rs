//! The class/namespace routing table and its builder.
//!
//! Keys are built from case-folded names: `"<namespace>:<class>"` for a route
//! registered in one namespace and `":<class>"` for a wildcard route. A
//! lookup tries the exact key first and falls back to the wildcard key.

use std::collections::HashMap;

use cimom_core::{CimName, CimNamespaceName, NameError, NamespaceScope, QueueId};
use serde::Serialize;
use tracing::debug;

use super::definitions::{
    queue_names, ControlProviderDefinition, ServiceDefinition, CONTROL_PROVIDER_DEFINITIONS,
    SERVICE_DEFINITIONS,
};
use crate::queue::QueueRegistry;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("routing table has not been built")]
    NotBuilt,
    #[error("class {class} routes to queue {queue:?}, which is not registered")]
    UnknownQueue { class: String, queue: String },
    #[error("duplicate route for {0}")]
    DuplicateRoute(String),
    #[error(transparent)]
    InvalidDefinition(#[from] NameError),
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

/// What handles a routed request once it reaches `Route::service_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// The service owning the queue handles the class itself.
    Service,
    /// A built-in provider module hosted by the control service.
    ControlProvider(String),
    /// A registered provider module hosted by the provider manager.
    Provider(String),
}

/// Result of a routing lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub target: RouteTarget,
    pub service_id: QueueId,
}

impl Route {
    #[must_use]
    pub fn service(service_id: QueueId) -> Self {
        Self {
            target: RouteTarget::Service,
            service_id,
        }
    }

    #[must_use]
    pub fn control_provider(provider: impl Into<String>, service_id: QueueId) -> Self {
        Self {
            target: RouteTarget::ControlProvider(provider.into()),
            service_id,
        }
    }

    #[must_use]
    pub fn provider(module: impl Into<String>, service_id: QueueId) -> Self {
        Self {
            target: RouteTarget::Provider(module.into()),
            service_id,
        }
    }

    /// Provider module name, or `""` for a service route.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        match &self.target {
            RouteTarget::Service => "",
            RouteTarget::ControlProvider(name) | RouteTarget::Provider(name) => name,
        }
    }
}

#[derive(Debug, Clone)]
struct Record {
    class_name: CimName,
    namespace: NamespaceScope,
    route: Route,
}

fn routing_key(namespace: Option<&CimNamespaceName>, class_name: &CimName) -> String {
    match namespace {
        Some(ns) => format!("{}:{}", ns.folded(), class_name.folded()),
        None => format!(":{}", class_name.folded()),
    }
}

fn scope_key(scope: &NamespaceScope, class_name: &CimName) -> String {
    match scope {
        NamespaceScope::Any => routing_key(None, class_name),
        NamespaceScope::Specific(ns) => routing_key(Some(ns), class_name),
    }
}

// ---------------------------------------------------------------------------
// RoutingTable
// ---------------------------------------------------------------------------

/// One row of a routing table dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDump {
    pub class_name: String,
    /// `None` for a wildcard route.
    pub namespace: Option<String>,
    pub provider: String,
    pub service_id: u32,
    /// Queue name, if the queue is still registered.
    pub service_name: Option<String>,
}

/// Immutable class/namespace routing table. Built once with
/// `RoutingTableBuilder`, then only read.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    records: Vec<Record>,
    index: HashMap<String, usize, ahash::RandomState>,
}

impl RoutingTable {
    /// Builds the table from the static service and control-provider
    /// definitions, resolving queue names through `queues`.
    ///
    /// # Errors
    ///
    /// Fails if a definition names an unregistered queue, repeats a
    /// class/namespace pair, or carries a malformed name.
    pub fn from_definitions(queues: &QueueRegistry) -> Result<Self, RoutingError> {
        let mut builder = RoutingTableBuilder::new();
        builder
            .add_service_definitions(SERVICE_DEFINITIONS, queues)?
            .add_control_provider_definitions(CONTROL_PROVIDER_DEFINITIONS, queues)?;
        Ok(builder.build())
    }

    /// Finds the route for `class_name` in `namespace`, falling back to a
    /// wildcard route for the class. `None` means no internal service or
    /// control provider handles the pair.
    #[must_use]
    pub fn get_routing(&self, class_name: &CimName, namespace: &CimNamespaceName) -> Option<&Route> {
        self.index
            .get(&routing_key(Some(namespace), class_name))
            .or_else(|| self.index.get(&routing_key(None, class_name)))
            .map(|&i| &self.records[i].route)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Routes whose target queue is `service_id`.
    pub fn routes_to(&self, service_id: QueueId) -> impl Iterator<Item = &Route> {
        self.records
            .iter()
            .map(|r| &r.route)
            .filter(move |route| route.service_id == service_id)
    }

    /// Every row in insertion order, with queue names resolved through
    /// `queues`.
    #[must_use]
    pub fn dump(&self, queues: &QueueRegistry) -> Vec<RouteDump> {
        self.records
            .iter()
            .map(|r| RouteDump {
                class_name: r.class_name.to_string(),
                namespace: match &r.namespace {
                    NamespaceScope::Any => None,
                    NamespaceScope::Specific(ns) => Some(ns.to_string()),
                },
                provider: r.route.provider_name().to_string(),
                service_id: r.route.service_id.0,
                service_name: queues.name_of(r.route.service_id),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// RoutingTableBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct RoutingTableBuilder {
    table: RoutingTable,
}

impl RoutingTableBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns `RoutingError::DuplicateRoute` if the class already has a route
    /// in the same scope.
    pub fn insert(
        &mut self,
        class_name: CimName,
        namespace: NamespaceScope,
        route: Route,
    ) -> Result<&mut Self, RoutingError> {
        let key = scope_key(&namespace, &class_name);
        if self.table.index.contains_key(&key) {
            return Err(RoutingError::DuplicateRoute(key));
        }
        debug!(
            class = %class_name,
            namespace = %namespace,
            provider = route.provider_name(),
            service_id = route.service_id.0,
            "route added"
        );
        self.table.index.insert(key, self.table.records.len());
        self.table.records.push(Record {
            class_name,
            namespace,
            route,
        });
        Ok(self)
    }

    /// Adds one service route per definition row.
    ///
    /// # Errors
    ///
    /// Fails on an unregistered service queue, a duplicate route, or a
    /// malformed name.
    pub fn add_service_definitions(
        &mut self,
        definitions: &[ServiceDefinition],
        queues: &QueueRegistry,
    ) -> Result<&mut Self, RoutingError> {
        for def in definitions {
            let service_id = resolve_queue(queues, def.class_name, def.service)?;
            self.insert(
                CimName::new(def.class_name)?,
                def.namespace.to_scope()?,
                Route::service(service_id),
            )?;
        }
        Ok(self)
    }

    /// Adds one control-provider route per definition row. Every row targets
    /// the control service queue.
    ///
    /// # Errors
    ///
    /// Fails if the control service queue is not registered, on a duplicate
    /// route, or on a malformed name.
    pub fn add_control_provider_definitions(
        &mut self,
        definitions: &[ControlProviderDefinition],
        queues: &QueueRegistry,
    ) -> Result<&mut Self, RoutingError> {
        for def in definitions {
            let service_id = resolve_queue(queues, def.class_name, queue_names::CONTROL_SERVICE)?;
            self.insert(
                CimName::new(def.class_name)?,
                def.namespace.to_scope()?,
                Route::control_provider(def.provider, service_id),
            )?;
        }
        Ok(self)
    }

    #[must_use]
    pub fn build(self) -> RoutingTable {
        self.table
    }
}

fn resolve_queue(
    queues: &QueueRegistry,
    class_name: &str,
    queue: &str,
) -> Result<QueueId, RoutingError> {
    queues.lookup(queue).ok_or_else(|| RoutingError::UnknownQueue {
        class: class_name.to_string(),
        queue: queue.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
