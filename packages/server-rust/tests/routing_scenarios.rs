//! End-to-end routing scenarios against a started server.

use std::sync::Arc;

use cimom_core::{
    convert_message_type_to_op_type, CimName, CimNamespaceName, CimOperationType, CimRequest,
    CimStatusCode, Message, MessageType, QueueId, QueueIdStack,
};
use cimom_server::routing::{module_names, queue_names, RouteTarget};
use cimom_server::service::ServerConfig;
use cimom_server::{CimServer, DynamicRoutingTable, QueueRegistry, StaticProviderRegistry};
use tower::ServiceExt;

fn name(s: &str) -> CimName {
    CimName::new(s).unwrap()
}

fn ns(s: &str) -> CimNamespaceName {
    CimNamespaceName::new(s).unwrap()
}

async fn started() -> CimServer {
    let mut server = CimServer::new(
        ServerConfig::default(),
        Arc::new(StaticProviderRegistry::new()),
    );
    server.start().await.unwrap();
    server
}

#[tokio::test]
async fn indication_subscription_routes_to_indication_service_in_any_namespace() {
    let mut server = started().await;
    let routing = server.routing();
    let indication = server.queues().lookup(queue_names::INDICATION_SERVICE).unwrap();

    for namespace in ["root/cimv2", "root/PG_InterOp", "vendor/x"] {
        let route = routing
            .get_routing(&name("CIM_IndicationSubscription"), &ns(namespace))
            .unwrap()
            .unwrap();
        assert_eq!(route.service_id, indication);
        assert_eq!(route.provider_name(), "");
        assert_eq!(route.target, RouteTarget::Service);
    }

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn config_setting_is_only_routed_in_interop() {
    let mut server = started().await;
    let routing = server.routing();
    let control = server.queues().lookup(queue_names::CONTROL_SERVICE).unwrap();

    let route = routing
        .get_routing(&name("PG_ConfigSetting"), &ns("root/PG_InterOp"))
        .unwrap()
        .unwrap();
    assert_eq!(route.service_id, control);
    assert_eq!(route.provider_name(), module_names::CONFIG_PROVIDER);

    assert!(routing
        .get_routing(&name("PG_ConfigSetting"), &ns("root/other"))
        .unwrap()
        .is_none());

    // The dispatcher turns the miss into "class not supported".
    let req = CimRequest::new(ns("root/other"), name("PG_ConfigSetting"));
    let msg = Message::request(MessageType::GetInstanceRequest, req).unwrap();
    let err = server
        .dispatch_pipeline()
        .unwrap()
        .oneshot(msg)
        .await
        .unwrap_err();
    assert_eq!(err.to_cim_error().code, CimStatusCode::NotSupported);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn get_instance_request_and_response_share_an_operation() {
    assert_eq!(
        convert_message_type_to_op_type(MessageType::GetInstanceRequest),
        Some(CimOperationType::GetInstance)
    );
    assert_eq!(
        convert_message_type_to_op_type(MessageType::GetInstanceResponse),
        Some(CimOperationType::GetInstance)
    );

    let mut server = started().await;
    let req = CimRequest::new(ns("root/PG_InterOp"), name("PG_ConfigSetting"));
    let mut msg = Message::request(MessageType::GetInstanceRequest, req).unwrap();
    msg.queue_ids = QueueIdStack::with_one(QueueId(500));

    let resp = server
        .dispatch_pipeline()
        .unwrap()
        .oneshot(msg)
        .await
        .unwrap();
    assert_eq!(resp.operation, CimOperationType::GetInstance);
    let part = &resp.parts[0];
    assert_eq!(
        convert_message_type_to_op_type(part.message_type()),
        Some(CimOperationType::GetInstance)
    );
    assert_eq!(part.dest, QueueId(500));
    assert_eq!(
        part.context.control_provider.as_deref(),
        Some(module_names::CONFIG_PROVIDER)
    );
    // The control provider is a stub; it answers, but with an error.
    assert_eq!(resp.error().unwrap().code, CimStatusCode::NotSupported);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn lookups_fold_case() {
    let mut server = started().await;
    let routing = server.routing();

    let exact = routing
        .get_routing(&name("PG_User"), &ns("root/PG_InterOp"))
        .unwrap()
        .unwrap()
        .clone();
    let folded = routing
        .get_routing(&name("pg_USER"), &ns("ROOT/pg_interop"))
        .unwrap()
        .unwrap();
    assert_eq!(&exact, folded);

    server.shutdown().await.unwrap();
}

#[test]
fn concurrent_builds_produce_one_table() {
    let queues = QueueRegistry::new();
    for q in [
        queue_names::CONTROL_SERVICE,
        queue_names::INDICATION_SERVICE,
        queue_names::INDICATION_HANDLER_SERVICE,
        queue_names::PROVIDER_MANAGER_SERVICE,
    ] {
        let _ = queues.register(q, 1).unwrap();
    }

    let routing = DynamicRoutingTable::new();
    let lens: Vec<usize> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| routing.build_routing_table(&queues).unwrap().len()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(lens.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(routing.build_count(), 1);

    let route = routing
        .get_routing(&name("__Namespace"), &ns("any/namespace"))
        .unwrap()
        .unwrap();
    assert_eq!(route.provider_name(), module_names::NAMESPACE_PROVIDER);
}
