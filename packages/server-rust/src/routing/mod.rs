//! Class/namespace routing for internal services and control providers.

pub mod definitions;
pub mod dynamic;
pub mod table;

pub use definitions::{
    module_names, namespaces, queue_names, ControlProviderDefinition, DefinitionNamespace,
    ServiceDefinition, CONTROL_PROVIDER_DEFINITIONS, SERVICE_DEFINITIONS,
};
pub use dynamic::DynamicRoutingTable;
pub use table::{Route, RouteDump, RouteTarget, RoutingError, RoutingTable, RoutingTableBuilder};
