//! Build-once holder for the routing table.
//!
//! The table is built at startup, after every service queue is registered
//! and before requests are served. Concurrent callers of
//! `build_routing_table` race safely: exactly one runs the build, the rest
//! wait for it and see the same table. After that, lookups are lock-free
//! reads of an immutable table.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use cimom_core::{CimName, CimNamespaceName};
use parking_lot::Mutex;
use tracing::info;

use super::table::{Route, RoutingError, RoutingTable};
use crate::queue::QueueRegistry;

#[derive(Debug, Default)]
pub struct DynamicRoutingTable {
    table: OnceLock<RoutingTable>,
    build_lock: Mutex<()>,
    builds: AtomicUsize,
}

impl DynamicRoutingTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance, for callers that have no server context to
    /// hold one. Creation is thread-safe.
    pub fn global() -> &'static DynamicRoutingTable {
        static GLOBAL: OnceLock<DynamicRoutingTable> = OnceLock::new();
        GLOBAL.get_or_init(DynamicRoutingTable::new)
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.table.get().is_some()
    }

    /// Builds the table from the static definitions. Later calls return the
    /// table built by the first successful call.
    ///
    /// # Errors
    ///
    /// Propagates the first build failure; the table stays unbuilt and the
    /// build may be retried.
    pub fn build_routing_table(&self, queues: &QueueRegistry) -> Result<&RoutingTable, RoutingError> {
        self.build_with(|| RoutingTable::from_definitions(queues))
    }

    /// Runs `build` at most once across all callers that see an unbuilt
    /// table.
    ///
    /// # Errors
    ///
    /// Returns whatever `build` returns on failure.
    pub fn build_with<F>(&self, build: F) -> Result<&RoutingTable, RoutingError>
    where
        F: FnOnce() -> Result<RoutingTable, RoutingError>,
    {
        if let Some(table) = self.table.get() {
            return Ok(table);
        }
        let _guard = self.build_lock.lock();
        if let Some(table) = self.table.get() {
            return Ok(table);
        }

        let table = build()?;
        self.builds.fetch_add(1, Ordering::Relaxed);
        info!(routes = table.len(), "routing table built");
        Ok(self.table.get_or_init(|| table))
    }

    /// # Errors
    ///
    /// Returns `RoutingError::NotBuilt` before the table is built.
    pub fn table(&self) -> Result<&RoutingTable, RoutingError> {
        self.table.get().ok_or(RoutingError::NotBuilt)
    }

    /// Looks up the route for a class in a namespace. `Ok(None)` means no
    /// internal service or control provider handles it.
    ///
    /// # Errors
    ///
    /// Returns `RoutingError::NotBuilt` before the table is built.
    pub fn get_routing(
        &self,
        class_name: &CimName,
        namespace: &CimNamespaceName,
    ) -> Result<Option<&Route>, RoutingError> {
        Ok(self.table()?.get_routing(class_name, namespace))
    }

    /// Number of builds that have run. At most one ever succeeds.
    #[must_use]
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use cimom_core::{NamespaceScope, QueueId};

    use super::*;
    use crate::routing::table::RoutingTableBuilder;

    fn one_route_table() -> RoutingTable {
        let mut builder = RoutingTableBuilder::new();
        builder
            .insert(
                CimName::new("Foo").unwrap(),
                NamespaceScope::Any,
                Route::service(QueueId(1)),
            )
            .unwrap();
        builder.build()
    }

    #[test]
    fn lookup_before_build_is_an_error() {
        let routing = DynamicRoutingTable::new();
        let err = routing
            .get_routing(
                &CimName::new("Foo").unwrap(),
                &CimNamespaceName::new("root/cimv2").unwrap(),
            )
            .unwrap_err();
        assert_eq!(err, RoutingError::NotBuilt);
        assert!(!routing.is_built());
    }

    #[test]
    fn concurrent_builders_run_the_build_once() {
        const THREADS: usize = 16;
        let routing = DynamicRoutingTable::new();
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(THREADS);

        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    let table = routing
                        .build_with(|| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(one_route_table())
                        })
                        .unwrap();
                    assert_eq!(table.len(), 1);
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(routing.build_count(), 1);
        assert!(routing.is_built());
    }

    #[test]
    fn failed_build_can_be_retried() {
        let routing = DynamicRoutingTable::new();
        let err = routing
            .build_with(|| Err(RoutingError::DuplicateRoute(":foo".into())))
            .unwrap_err();
        assert!(matches!(err, RoutingError::DuplicateRoute(_)));
        assert!(!routing.is_built());

        routing.build_with(|| Ok(one_route_table())).unwrap();
        let route = routing
            .get_routing(
                &CimName::new("FOO").unwrap(),
                &CimNamespaceName::new("root/x").unwrap(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(route.service_id, QueueId(1));
    }

    #[test]
    fn rebuild_returns_first_table() {
        let routing = DynamicRoutingTable::new();
        routing.build_with(|| Ok(one_route_table())).unwrap();
        let table = routing.build_with(|| Ok(RoutingTable::default())).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(routing.build_count(), 1);
    }

    #[test]
    fn global_is_a_single_instance() {
        let a: *const DynamicRoutingTable = DynamicRoutingTable::global();
        let b: *const DynamicRoutingTable = DynamicRoutingTable::global();
        assert_eq!(a, b);
    }
}
