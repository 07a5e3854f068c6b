//! Static routing definitions for internal services and control providers.
//!
//! These two tables are the whole routing surface of the server. Service
//! rows name the queue of the service that handles a class; control-provider
//! rows name an in-process provider module, and all of them are reached
//! through the control service queue. Queue names are resolved to live queue
//! ids when the routing table is built.

use cimom_core::{CimNamespaceName, NameError, NamespaceScope};

/// Names of the internal service queues.
pub mod queue_names {
    pub const CONTROL_SERVICE: &str = "ControlService";
    pub const INDICATION_SERVICE: &str = "Server::IndicationService";
    pub const INDICATION_HANDLER_SERVICE: &str = "IndicationHandlerService";
    pub const PROVIDER_MANAGER_SERVICE: &str = "Server::ProviderManagerService";
    pub const OPERATION_DISPATCHER: &str = "CIMOpRequestDispatcher";
}

/// Names of the built-in control provider modules.
pub mod module_names {
    pub const CONFIG_PROVIDER: &str = "ControlService::ConfigProvider";
    pub const USER_AUTH_PROVIDER: &str = "ControlService::UserAuthProvider";
    pub const PROVIDER_REGISTRATION_PROVIDER: &str =
        "ControlService::ProviderRegistrationProvider";
    pub const SHUTDOWN_PROVIDER: &str = "ControlService::ShutdownProvider";
    pub const NAMESPACE_PROVIDER: &str = "ControlService::NamespaceProvider";
    pub const CERTIFICATE_PROVIDER: &str = "ControlService::CertificateProvider";
    pub const INTEROP_PROVIDER: &str = "ControlService::InteropProvider";
    pub const CIMOM_STAT_DATA_PROVIDER: &str = "ControlService::CIMOMStatDataProvider";
    pub const QUERY_CAPABILITIES_PROVIDER: &str =
        "ControlService::CIMQueryCapabilitiesProvider";

    /// Every module name, whether or not its rows are compiled in.
    pub const ALL: &[&str] = &[
        CONFIG_PROVIDER,
        USER_AUTH_PROVIDER,
        PROVIDER_REGISTRATION_PROVIDER,
        SHUTDOWN_PROVIDER,
        NAMESPACE_PROVIDER,
        CERTIFICATE_PROVIDER,
        INTEROP_PROVIDER,
        CIMOM_STAT_DATA_PROVIDER,
        QUERY_CAPABILITIES_PROVIDER,
    ];
}

/// Well-known namespaces.
pub mod namespaces {
    pub const INTEROP: &str = "root/PG_InterOp";
    pub const INTERNAL: &str = "root/PG_Internal";
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Namespace column of a definition row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionNamespace {
    /// The class is routed here in every namespace.
    Any,
    Named(&'static str),
}

impl DefinitionNamespace {
    /// # Errors
    ///
    /// Returns `NameError::InvalidNamespace` if a named namespace is malformed.
    pub fn to_scope(self) -> Result<NamespaceScope, NameError> {
        match self {
            Self::Any => Ok(NamespaceScope::Any),
            Self::Named(ns) => CimNamespaceName::new(ns).map(NamespaceScope::Specific),
        }
    }
}

/// Class handled directly by an internal service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub class_name: &'static str,
    pub namespace: DefinitionNamespace,
    /// Queue name of the service.
    pub service: &'static str,
}

/// Class handled by a control provider inside the control service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlProviderDefinition {
    pub class_name: &'static str,
    pub namespace: DefinitionNamespace,
    /// Provider module name.
    pub provider: &'static str,
}

const ANY: DefinitionNamespace = DefinitionNamespace::Any;
const INTEROP: DefinitionNamespace = DefinitionNamespace::Named(namespaces::INTEROP);
#[cfg(any(feature = "dmtf-indication-profile", feature = "indication-count"))]
const INTERNAL: DefinitionNamespace = DefinitionNamespace::Named(namespaces::INTERNAL);

const fn svc(
    class_name: &'static str,
    namespace: DefinitionNamespace,
    service: &'static str,
) -> ServiceDefinition {
    ServiceDefinition {
        class_name,
        namespace,
        service,
    }
}

const fn ctl(
    class_name: &'static str,
    namespace: DefinitionNamespace,
    provider: &'static str,
) -> ControlProviderDefinition {
    ControlProviderDefinition {
        class_name,
        namespace,
        provider,
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

use module_names as m;
use queue_names as q;

/// Classes served by internal services.
pub static SERVICE_DEFINITIONS: &[ServiceDefinition] = &[
    #[cfg(feature = "dmtf-indication-profile")]
    svc("PG_ListenerDestinationQueue", INTERNAL, q::INDICATION_HANDLER_SERVICE),
    #[cfg(feature = "dmtf-indication-profile")]
    svc("CIM_IndicationService", INTEROP, q::INDICATION_SERVICE),
    #[cfg(feature = "dmtf-indication-profile")]
    svc("CIM_IndicationServiceCapabilities", INTEROP, q::INDICATION_SERVICE),
    svc("CIM_IndicationSubscription", ANY, q::INDICATION_SERVICE),
    svc("CIM_FormattedIndicationSubscription", ANY, q::INDICATION_SERVICE),
    svc("CIM_IndicationHandler", ANY, q::INDICATION_SERVICE),
    svc("CIM_ListenerDestinationCIMXML", ANY, q::INDICATION_SERVICE),
    svc("CIM_IndicationHandlerCIMXML", ANY, q::INDICATION_SERVICE),
    svc("PG_IndicationHandlerWSMAN", ANY, q::INDICATION_SERVICE),
    svc("PG_IndicationHandlerSNMPMapper", ANY, q::INDICATION_SERVICE),
    svc("PG_ListenerDestinationSystemLog", ANY, q::INDICATION_SERVICE),
    svc("PG_ListenerDestinationEmail", ANY, q::INDICATION_SERVICE),
    svc("PG_ListenerDestinationFile", ANY, q::INDICATION_SERVICE),
    svc("CIM_IndicationFilter", ANY, q::INDICATION_SERVICE),
    #[cfg(feature = "indication-count")]
    svc("PG_ProviderIndicationData", INTERNAL, q::INDICATION_SERVICE),
    #[cfg(feature = "indication-count")]
    svc("PG_SubscriptionIndicationData", INTERNAL, q::INDICATION_SERVICE),
];

/// Classes served by control providers. All are routed through the control
/// service queue.
pub static CONTROL_PROVIDER_DEFINITIONS: &[ControlProviderDefinition] = &[
    ctl("PG_ConfigSetting", INTEROP, m::CONFIG_PROVIDER),
    ctl("PG_Authorization", INTEROP, m::USER_AUTH_PROVIDER),
    ctl("PG_User", INTEROP, m::USER_AUTH_PROVIDER),
    ctl("PG_ShutdownService", INTEROP, m::SHUTDOWN_PROVIDER),
    ctl("__Namespace", ANY, m::NAMESPACE_PROVIDER),
    #[cfg(feature = "ssl")]
    ctl("PG_SSLCertificate", INTEROP, m::CERTIFICATE_PROVIDER),
    #[cfg(feature = "ssl")]
    ctl("PG_SSLCertificateRevocationList", INTEROP, m::CERTIFICATE_PROVIDER),
    #[cfg(feature = "perfinst")]
    ctl("CIM_CIMOMStatisticalData", INTEROP, m::CIMOM_STAT_DATA_PROVIDER),
    #[cfg(feature = "cql")]
    ctl("CIM_QueryCapabilities", ANY, m::QUERY_CAPABILITIES_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_ObjectManager", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("CIM_Namespace", ANY, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_Namespace", ANY, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_CIMXMLCommunicationMechanism", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_CommMechanismForManager", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_ComputerSystem", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_HostedObjectManager", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_HostedAccessPoint", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_NamespaceInManager", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_RegisteredProfile", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_RegisteredSubProfile", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_ReferencedProfile", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_ElementConformsToProfile", ANY, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_ElementConformsToProfile_RP_RP", ANY, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_ProviderProfileCapabilities", ANY, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_SubProfileRequiresProfile", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_SoftwareIdentity", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_ElementSoftwareIdentity", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "interop")]
    ctl("PG_InstalledSoftwareIdentity", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "dmtf-indication-profile")]
    ctl("PG_ElementCapabilities", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "dmtf-indication-profile")]
    ctl("PG_HostedIndicationService", INTEROP, m::INTEROP_PROVIDER),
    #[cfg(feature = "dmtf-indication-profile")]
    ctl("PG_ServiceAffectsElement", INTEROP, m::INTEROP_PROVIDER),
    ctl("PG_ProviderModule", INTEROP, m::PROVIDER_REGISTRATION_PROVIDER),
    ctl("PG_Provider", INTEROP, m::PROVIDER_REGISTRATION_PROVIDER),
    ctl("PG_ProviderCapabilities", INTEROP, m::PROVIDER_REGISTRATION_PROVIDER),
    ctl("PG_ConsumerCapabilities", INTEROP, m::PROVIDER_REGISTRATION_PROVIDER),
];

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use cimom_core::CimName;

    use super::*;

    fn key(class_name: &str, namespace: DefinitionNamespace) -> (String, String) {
        let ns = match namespace {
            DefinitionNamespace::Any => String::new(),
            DefinitionNamespace::Named(ns) => ns.to_lowercase(),
        };
        (ns, class_name.to_lowercase())
    }

    #[test]
    fn every_row_has_valid_names() {
        for row in SERVICE_DEFINITIONS {
            CimName::new(row.class_name).unwrap();
            row.namespace.to_scope().unwrap();
        }
        for row in CONTROL_PROVIDER_DEFINITIONS {
            CimName::new(row.class_name).unwrap();
            row.namespace.to_scope().unwrap();
        }
    }

    #[test]
    fn no_class_is_defined_twice_for_a_scope() {
        let mut seen = HashSet::new();
        let services = SERVICE_DEFINITIONS
            .iter()
            .map(|r| key(r.class_name, r.namespace));
        let providers = CONTROL_PROVIDER_DEFINITIONS
            .iter()
            .map(|r| key(r.class_name, r.namespace));
        for k in services.chain(providers) {
            assert!(seen.insert(k.clone()), "duplicate definition {k:?}");
        }
    }

    #[test]
    fn providers_are_known_modules() {
        for row in CONTROL_PROVIDER_DEFINITIONS {
            assert!(module_names::ALL.contains(&row.provider), "{}", row.provider);
        }
    }

    #[test]
    fn indication_classes_are_wildcard_routed() {
        let row = SERVICE_DEFINITIONS
            .iter()
            .find(|r| r.class_name == "CIM_IndicationSubscription")
            .unwrap();
        assert_eq!(row.namespace, DefinitionNamespace::Any);
        assert_eq!(row.service, queue_names::INDICATION_SERVICE);
    }

    #[test]
    fn config_setting_is_interop_only() {
        let row = CONTROL_PROVIDER_DEFINITIONS
            .iter()
            .find(|r| r.class_name == "PG_ConfigSetting")
            .unwrap();
        assert_eq!(row.namespace, INTEROP);
        assert_eq!(row.provider, module_names::CONFIG_PROVIDER);
    }
}
