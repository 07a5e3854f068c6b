//! Message type catalogue and CIM operation categories.
//!
//! `MessageType` is the closed set of message kinds exchanged between
//! queues. Discriminants are dense and start at zero, so a raw `u32` is a
//! valid type exactly when it is below `NUMBER_OF_MESSAGES`.

use std::fmt;

use super::MessageError;

// ---------------------------------------------------------------------------
// MessageType
// ---------------------------------------------------------------------------

/// Declares `MessageType` together with its `ALL` table and canonical names.
macro_rules! message_types {
    (
        $( $variant:ident => $name:literal, )+
    ) => {
        /// Kind of a `Message`. See the module docs for the numbering rule.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u32)]
        pub enum MessageType {
            $( $variant, )+
        }

        impl MessageType {
            /// Every message type, in discriminant order.
            pub const ALL: &'static [MessageType] = &[ $( MessageType::$variant, )+ ];

            /// Canonical upper-case name, e.g. `CIM_GET_INSTANCE_REQUEST_MESSAGE`.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( MessageType::$variant => $name, )+
                }
            }
        }
    };
}

message_types! {
    Heartbeat => "HEARTBEAT/REPLY",

    GetClassRequest => "CIM_GET_CLASS_REQUEST_MESSAGE",
    GetInstanceRequest => "CIM_GET_INSTANCE_REQUEST_MESSAGE",
    ExportIndicationRequest => "CIM_EXPORT_INDICATION_REQUEST_MESSAGE",
    DeleteClassRequest => "CIM_DELETE_CLASS_REQUEST_MESSAGE",
    DeleteInstanceRequest => "CIM_DELETE_INSTANCE_REQUEST_MESSAGE",
    CreateClassRequest => "CIM_CREATE_CLASS_REQUEST_MESSAGE",
    CreateInstanceRequest => "CIM_CREATE_INSTANCE_REQUEST_MESSAGE",
    ModifyClassRequest => "CIM_MODIFY_CLASS_REQUEST_MESSAGE",
    ModifyInstanceRequest => "CIM_MODIFY_INSTANCE_REQUEST_MESSAGE",
    EnumerateClassesRequest => "CIM_ENUMERATE_CLASSES_REQUEST_MESSAGE",
    EnumerateClassNamesRequest => "CIM_ENUMERATE_CLASS_NAMES_REQUEST_MESSAGE",
    EnumerateInstancesRequest => "CIM_ENUMERATE_INSTANCES_REQUEST_MESSAGE",
    EnumerateInstanceNamesRequest => "CIM_ENUMERATE_INSTANCE_NAMES_REQUEST_MESSAGE",
    ExecQueryRequest => "CIM_EXEC_QUERY_REQUEST_MESSAGE",
    AssociatorsRequest => "CIM_ASSOCIATORS_REQUEST_MESSAGE",
    AssociatorNamesRequest => "CIM_ASSOCIATOR_NAMES_REQUEST_MESSAGE",
    ReferencesRequest => "CIM_REFERENCES_REQUEST_MESSAGE",
    ReferenceNamesRequest => "CIM_REFERENCE_NAMES_REQUEST_MESSAGE",
    GetPropertyRequest => "CIM_GET_PROPERTY_REQUEST_MESSAGE",
    SetPropertyRequest => "CIM_SET_PROPERTY_REQUEST_MESSAGE",
    GetQualifierRequest => "CIM_GET_QUALIFIER_REQUEST_MESSAGE",
    SetQualifierRequest => "CIM_SET_QUALIFIER_REQUEST_MESSAGE",
    DeleteQualifierRequest => "CIM_DELETE_QUALIFIER_REQUEST_MESSAGE",
    EnumerateQualifiersRequest => "CIM_ENUMERATE_QUALIFIERS_REQUEST_MESSAGE",
    InvokeMethodRequest => "CIM_INVOKE_METHOD_REQUEST_MESSAGE",
    ProcessIndicationRequest => "CIM_PROCESS_INDICATION_REQUEST_MESSAGE",
    HandleIndicationRequest => "CIM_HANDLE_INDICATION_REQUEST_MESSAGE",
    NotifyProviderRegistrationRequest => "CIM_NOTIFY_PROVIDER_REGISTRATION_REQUEST_MESSAGE",
    NotifyProviderTerminationRequest => "CIM_NOTIFY_PROVIDER_TERMINATION_REQUEST_MESSAGE",
    CreateSubscriptionRequest => "CIM_CREATE_SUBSCRIPTION_REQUEST_MESSAGE",
    ModifySubscriptionRequest => "CIM_MODIFY_SUBSCRIPTION_REQUEST_MESSAGE",
    DeleteSubscriptionRequest => "CIM_DELETE_SUBSCRIPTION_REQUEST_MESSAGE",
    DisableModuleRequest => "CIM_DISABLE_MODULE_REQUEST_MESSAGE",
    EnableModuleRequest => "CIM_ENABLE_MODULE_REQUEST_MESSAGE",
    StopAllProvidersRequest => "CIM_STOP_ALL_PROVIDERS_REQUEST_MESSAGE",

    GetClassResponse => "CIM_GET_CLASS_RESPONSE_MESSAGE",
    GetInstanceResponse => "CIM_GET_INSTANCE_RESPONSE_MESSAGE",
    ExportIndicationResponse => "CIM_EXPORT_INDICATION_RESPONSE_MESSAGE",
    DeleteClassResponse => "CIM_DELETE_CLASS_RESPONSE_MESSAGE",
    DeleteInstanceResponse => "CIM_DELETE_INSTANCE_RESPONSE_MESSAGE",
    CreateClassResponse => "CIM_CREATE_CLASS_RESPONSE_MESSAGE",
    CreateInstanceResponse => "CIM_CREATE_INSTANCE_RESPONSE_MESSAGE",
    ModifyClassResponse => "CIM_MODIFY_CLASS_RESPONSE_MESSAGE",
    ModifyInstanceResponse => "CIM_MODIFY_INSTANCE_RESPONSE_MESSAGE",
    EnumerateClassesResponse => "CIM_ENUMERATE_CLASSES_RESPONSE_MESSAGE",
    EnumerateClassNamesResponse => "CIM_ENUMERATE_CLASS_NAMES_RESPONSE_MESSAGE",
    EnumerateInstancesResponse => "CIM_ENUMERATE_INSTANCES_RESPONSE_MESSAGE",
    EnumerateInstanceNamesResponse => "CIM_ENUMERATE_INSTANCE_NAMES_RESPONSE_MESSAGE",
    ExecQueryResponse => "CIM_EXEC_QUERY_RESPONSE_MESSAGE",
    AssociatorsResponse => "CIM_ASSOCIATORS_RESPONSE_MESSAGE",
    AssociatorNamesResponse => "CIM_ASSOCIATOR_NAMES_RESPONSE_MESSAGE",
    ReferencesResponse => "CIM_REFERENCES_RESPONSE_MESSAGE",
    ReferenceNamesResponse => "CIM_REFERENCE_NAMES_RESPONSE_MESSAGE",
    GetPropertyResponse => "CIM_GET_PROPERTY_RESPONSE_MESSAGE",
    SetPropertyResponse => "CIM_SET_PROPERTY_RESPONSE_MESSAGE",
    GetQualifierResponse => "CIM_GET_QUALIFIER_RESPONSE_MESSAGE",
    SetQualifierResponse => "CIM_SET_QUALIFIER_RESPONSE_MESSAGE",
    DeleteQualifierResponse => "CIM_DELETE_QUALIFIER_RESPONSE_MESSAGE",
    EnumerateQualifiersResponse => "CIM_ENUMERATE_QUALIFIERS_RESPONSE_MESSAGE",
    InvokeMethodResponse => "CIM_INVOKE_METHOD_RESPONSE_MESSAGE",
    ProcessIndicationResponse => "CIM_PROCESS_INDICATION_RESPONSE_MESSAGE",
    NotifyProviderRegistrationResponse => "CIM_NOTIFY_PROVIDER_REGISTRATION_RESPONSE_MESSAGE",
    NotifyProviderTerminationResponse => "CIM_NOTIFY_PROVIDER_TERMINATION_RESPONSE_MESSAGE",
    HandleIndicationResponse => "CIM_HANDLE_INDICATION_RESPONSE_MESSAGE",
    CreateSubscriptionResponse => "CIM_CREATE_SUBSCRIPTION_RESPONSE_MESSAGE",
    ModifySubscriptionResponse => "CIM_MODIFY_SUBSCRIPTION_RESPONSE_MESSAGE",
    DeleteSubscriptionResponse => "CIM_DELETE_SUBSCRIPTION_RESPONSE_MESSAGE",
    DisableModuleResponse => "CIM_DISABLE_MODULE_RESPONSE_MESSAGE",
    EnableModuleResponse => "CIM_ENABLE_MODULE_RESPONSE_MESSAGE",
    StopAllProvidersResponse => "CIM_STOP_ALL_PROVIDERS_RESPONSE_MESSAGE",

    OpenEnumerateInstancesRequest => "CIM_OPEN_ENUMERATE_INSTANCES_REQUEST_MESSAGE",
    OpenEnumerateInstancePathsRequest => "CIM_OPEN_ENUMERATE_INSTANCE_PATHS_REQUEST_MESSAGE",
    OpenAssociatorInstancesRequest => "CIM_OPEN_ASSOCIATOR_INSTANCES_REQUEST_MESSAGE",
    OpenAssociatorInstancePathsRequest => "CIM_OPEN_ASSOCIATOR_INSTANCE_PATHS_REQUEST_MESSAGE",
    OpenReferenceInstancesRequest => "CIM_OPEN_REFERENCE_INSTANCES_REQUEST_MESSAGE",
    OpenReferenceInstancePathsRequest => "CIM_OPEN_REFERENCE_INSTANCE_PATHS_REQUEST_MESSAGE",
    OpenQueryInstancesRequest => "CIM_OPEN_QUERY_INSTANCES_REQUEST_MESSAGE",
    PullInstancesWithPathRequest => "CIM_PULL_INSTANCES_WITH_PATHS_REQUEST_MESSAGE",
    PullInstancePathsRequest => "CIM_PULL_INSTANCE_PATHS_REQUEST_MESSAGE",
    PullInstancesRequest => "CIM_PULL_INSTANCES_REQUEST_MESSAGE",
    CloseEnumerationRequest => "CIM_CLOSE_ENUMERATION_REQUEST_MESSAGE",
    EnumerationCountRequest => "CIM_ENUMERATION_COUNT_REQUEST_MESSAGE",

    OpenEnumerateInstancesResponse => "CIM_OPEN_ENUMERATE_INSTANCES_RESPONSE_MESSAGE",
    OpenEnumerateInstancePathsResponse => "CIM_OPEN_ENUMERATE_INSTANCE_PATHS_RESPONSE_MESSAGE",
    OpenAssociatorInstancesResponse => "CIM_OPEN_ASSOCIATOR_INSTANCES_RESPONSE_MESSAGE",
    OpenAssociatorInstancePathsResponse => "CIM_OPEN_ASSOCIATOR_INSTANCE_PATHS_RESPONSE_MESSAGE",
    OpenReferenceInstancesResponse => "CIM_OPEN_REFERENCES_INSTANCE_RESPONSE_MESSAGE",
    OpenReferenceInstancePathsResponse => "CIM_OPEN_REFERENCE_INSTANCE_PATHS_RESPONSE_MESSAGE",
    OpenQueryInstancesResponse => "CIM_OPEN_QUERY_INSTANCES_RESPONSE_MESSAGE",
    PullInstancesWithPathResponse => "CIM_PULL_INSTANCES_WITH_PATH_RESPONSE_MESSAGE",
    PullInstancePathsResponse => "CIM_PULL_INSTANCE_PATHS_RESPONSE_MESSAGE",
    PullInstancesResponse => "CIM_PULL_INSTANCES_RESPONSE_MESSAGE",
    CloseEnumerationResponse => "CIM_CLOSE_ENUMERATION_RESPONSE_MESSAGE",
    EnumerationCountResponse => "CIM_ENUMERATION_COUNT_RESPONSE_MESSAGE",

    Socket => "SOCKET_MESSAGE",
    CloseConnection => "CLOSE_CONNECTION_MESSAGE",
    Http => "HTTP_MESSAGE",
    HttpError => "HTTP_ERROR_MESSAGE",
    ClientException => "CLIENT_EXCEPTION_MESSAGE",

    AsyncIoClose => "ASYNC::IOCLOSE",
    AsyncCimServiceStart => "ASYNC::CIMSERVICE_START",
    AsyncCimServiceStop => "ASYNC::CIMSERVICE_STOP",
    AsyncOpStart => "ASYNC::ASYNC_OP_START",
    AsyncOpResult => "ASYNC::ASYNC_OP_RESULT",
    AsyncLegacyOpStart => "ASYNC::ASYNC_LEGACY_OP_START",
    AsyncLegacyOpResult => "ASYNC::ASYNC_LEGACY_OP_RESULT",
    AsyncModuleOpStart => "ASYNC::ASYNC_MODULE_OP_START",
    AsyncModuleOpResult => "ASYNC::ASYNC_MODULE_OP_RESULT",

    NotifyProviderEnableRequest => "CIM_NOTIFY_PROVIDER_ENABLE_REQUEST_MESSAGE",
    NotifyProviderEnableResponse => "CIM_NOTIFY_PROVIDER_ENABLE_RESPONSE_MESSAGE",
    NotifyProviderFailRequest => "CIM_NOTIFY_PROVIDER_FAIL_REQUEST_MESSAGE",
    NotifyProviderFailResponse => "CIM_NOTIFY_PROVIDER_FAIL_RESPONSE_MESSAGE",
    InitializeProviderAgentRequest => "CIM_INITIALIZE_PROVIDER_AGENT_REQUEST_MESSAGE",
    InitializeProviderAgentResponse => "CIM_INITIALIZE_PROVIDER_AGENT_RESPONSE_MESSAGE",
    NotifyConfigChangeRequest => "CIM_NOTIFY_CONFIG_CHANGE_REQUEST_MESSAGE",
    NotifyConfigChangeResponse => "CIM_NOTIFY_CONFIG_CHANGE_RESPONSE_MESSAGE",
    SubscriptionInitCompleteRequest => "CIM_SUBSCRIPTION_INIT_COMPLETE_REQUEST_MESSAGE",
    SubscriptionInitCompleteResponse => "CIM_SUBSCRIPTION_INIT_COMPLETE_RESPONSE_MESSAGE",
    IndicationServiceDisabledRequest => "CIM_INDICATION_SERVICE_DISABLED_REQUEST_MESSAGE",
    IndicationServiceDisabledResponse => "CIM_INDICATION_SERVICE_DISABLED_RESPONSE_MESSAGE",
    ProvAgtGetScmoClassRequest => "PROVAGT_GET_SCMOCLASS_REQUEST_MESSAGE",
    ProvAgtGetScmoClassResponse => "PROVAGT_GET_SCMOCLASS_RESPONSE_MESSAGE",
    NotifySubscriptionNotActiveRequest => "CIM_NOTIFY_SUBSCRIPTION_NOT_ACTIVE_REQUEST_MESSAGE",
    NotifySubscriptionNotActiveResponse => "CIM_NOTIFY_SUBSCRIPTION_NOT_ACTIVE_RESPONSE_MESSAGE",
    NotifyListenerNotActiveRequest => "CIM_NOTIFY_LISTENER_NOT_ACTIVE_REQUEST_MESSAGE",
    NotifyListenerNotActiveResponse => "CIM_NOTIFY_LISTENER_NOT_ACTIVE_RESPONSE_MESSAGE",
    WsmanExportIndicationRequest => "WSMAN_EXPORT_INDICATION_REQUEST_MESSAGE",
    WsmanExportIndicationResponse => "WSMAN_EXPORT_INDICATION_RESPONSE_MESSAGE",
}

/// Number of message types. Every valid raw type value is below this.
#[allow(clippy::cast_possible_truncation)]
pub const NUMBER_OF_MESSAGES: u32 = MessageType::ALL.len() as u32;

/// Request/response pairs, one row per request that expects a reply.
///
/// Control requests (`AsyncIoClose`, service start/stop) are answered with
/// `AsyncOpResult` and are handled in `MessageType::response_type` instead,
/// so that every type appears here at most once.
const REQUEST_RESPONSE_PAIRS: &[(MessageType, MessageType)] = &[
    (MessageType::GetClassRequest, MessageType::GetClassResponse),
    (MessageType::GetInstanceRequest, MessageType::GetInstanceResponse),
    (MessageType::ExportIndicationRequest, MessageType::ExportIndicationResponse),
    (MessageType::DeleteClassRequest, MessageType::DeleteClassResponse),
    (MessageType::DeleteInstanceRequest, MessageType::DeleteInstanceResponse),
    (MessageType::CreateClassRequest, MessageType::CreateClassResponse),
    (MessageType::CreateInstanceRequest, MessageType::CreateInstanceResponse),
    (MessageType::ModifyClassRequest, MessageType::ModifyClassResponse),
    (MessageType::ModifyInstanceRequest, MessageType::ModifyInstanceResponse),
    (MessageType::EnumerateClassesRequest, MessageType::EnumerateClassesResponse),
    (MessageType::EnumerateClassNamesRequest, MessageType::EnumerateClassNamesResponse),
    (MessageType::EnumerateInstancesRequest, MessageType::EnumerateInstancesResponse),
    (MessageType::EnumerateInstanceNamesRequest, MessageType::EnumerateInstanceNamesResponse),
    (MessageType::ExecQueryRequest, MessageType::ExecQueryResponse),
    (MessageType::AssociatorsRequest, MessageType::AssociatorsResponse),
    (MessageType::AssociatorNamesRequest, MessageType::AssociatorNamesResponse),
    (MessageType::ReferencesRequest, MessageType::ReferencesResponse),
    (MessageType::ReferenceNamesRequest, MessageType::ReferenceNamesResponse),
    (MessageType::GetPropertyRequest, MessageType::GetPropertyResponse),
    (MessageType::SetPropertyRequest, MessageType::SetPropertyResponse),
    (MessageType::GetQualifierRequest, MessageType::GetQualifierResponse),
    (MessageType::SetQualifierRequest, MessageType::SetQualifierResponse),
    (MessageType::DeleteQualifierRequest, MessageType::DeleteQualifierResponse),
    (MessageType::EnumerateQualifiersRequest, MessageType::EnumerateQualifiersResponse),
    (MessageType::InvokeMethodRequest, MessageType::InvokeMethodResponse),
    (MessageType::ProcessIndicationRequest, MessageType::ProcessIndicationResponse),
    (MessageType::HandleIndicationRequest, MessageType::HandleIndicationResponse),
    (MessageType::NotifyProviderRegistrationRequest, MessageType::NotifyProviderRegistrationResponse),
    (MessageType::NotifyProviderTerminationRequest, MessageType::NotifyProviderTerminationResponse),
    (MessageType::CreateSubscriptionRequest, MessageType::CreateSubscriptionResponse),
    (MessageType::ModifySubscriptionRequest, MessageType::ModifySubscriptionResponse),
    (MessageType::DeleteSubscriptionRequest, MessageType::DeleteSubscriptionResponse),
    (MessageType::DisableModuleRequest, MessageType::DisableModuleResponse),
    (MessageType::EnableModuleRequest, MessageType::EnableModuleResponse),
    (MessageType::StopAllProvidersRequest, MessageType::StopAllProvidersResponse),
    (MessageType::OpenEnumerateInstancesRequest, MessageType::OpenEnumerateInstancesResponse),
    (MessageType::OpenEnumerateInstancePathsRequest, MessageType::OpenEnumerateInstancePathsResponse),
    (MessageType::OpenAssociatorInstancesRequest, MessageType::OpenAssociatorInstancesResponse),
    (MessageType::OpenAssociatorInstancePathsRequest, MessageType::OpenAssociatorInstancePathsResponse),
    (MessageType::OpenReferenceInstancesRequest, MessageType::OpenReferenceInstancesResponse),
    (MessageType::OpenReferenceInstancePathsRequest, MessageType::OpenReferenceInstancePathsResponse),
    (MessageType::OpenQueryInstancesRequest, MessageType::OpenQueryInstancesResponse),
    (MessageType::PullInstancesWithPathRequest, MessageType::PullInstancesWithPathResponse),
    (MessageType::PullInstancePathsRequest, MessageType::PullInstancePathsResponse),
    (MessageType::PullInstancesRequest, MessageType::PullInstancesResponse),
    (MessageType::CloseEnumerationRequest, MessageType::CloseEnumerationResponse),
    (MessageType::EnumerationCountRequest, MessageType::EnumerationCountResponse),
    (MessageType::AsyncOpStart, MessageType::AsyncOpResult),
    (MessageType::AsyncLegacyOpStart, MessageType::AsyncLegacyOpResult),
    (MessageType::AsyncModuleOpStart, MessageType::AsyncModuleOpResult),
    (MessageType::NotifyProviderEnableRequest, MessageType::NotifyProviderEnableResponse),
    (MessageType::NotifyProviderFailRequest, MessageType::NotifyProviderFailResponse),
    (MessageType::InitializeProviderAgentRequest, MessageType::InitializeProviderAgentResponse),
    (MessageType::NotifyConfigChangeRequest, MessageType::NotifyConfigChangeResponse),
    (MessageType::SubscriptionInitCompleteRequest, MessageType::SubscriptionInitCompleteResponse),
    (MessageType::IndicationServiceDisabledRequest, MessageType::IndicationServiceDisabledResponse),
    (MessageType::ProvAgtGetScmoClassRequest, MessageType::ProvAgtGetScmoClassResponse),
    (MessageType::NotifySubscriptionNotActiveRequest, MessageType::NotifySubscriptionNotActiveResponse),
    (MessageType::NotifyListenerNotActiveRequest, MessageType::NotifyListenerNotActiveResponse),
    (MessageType::WsmanExportIndicationRequest, MessageType::WsmanExportIndicationResponse),
];

impl MessageType {
    /// Numeric value of this type.
    #[must_use]
    pub fn raw(self) -> u32 {
        self as u32
    }

    /// Whether this is a control request addressed to a queue service itself.
    #[must_use]
    pub fn is_control(self) -> bool {
        matches!(
            self,
            Self::AsyncIoClose | Self::AsyncCimServiceStart | Self::AsyncCimServiceStop
        )
    }

    /// Whether this type is a request that expects a reply.
    #[must_use]
    pub fn is_request(self) -> bool {
        self.is_control() || REQUEST_RESPONSE_PAIRS.iter().any(|(req, _)| *req == self)
    }

    /// Whether this type is the reply half of a request/response pair.
    #[must_use]
    pub fn is_response(self) -> bool {
        REQUEST_RESPONSE_PAIRS.iter().any(|(_, resp)| *resp == self)
    }

    /// The reply type for a request, or `None` if this is not a request.
    #[must_use]
    pub fn response_type(self) -> Option<MessageType> {
        if self.is_control() {
            return Some(Self::AsyncOpResult);
        }
        REQUEST_RESPONSE_PAIRS
            .iter()
            .find(|(req, _)| *req == self)
            .map(|(_, resp)| *resp)
    }

    /// The CIM operation category of a CIM operation request or response.
    ///
    /// Returns `None` for every type that is not part of a client-visible CIM
    /// operation (indications, provider control, transport, async plumbing).
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn operation_type(self) -> Option<CimOperationType> {
        use CimOperationType as Op;

        let op = match self {
            Self::GetClassRequest | Self::GetClassResponse => Op::GetClass,
            Self::GetInstanceRequest | Self::GetInstanceResponse => Op::GetInstance,
            Self::DeleteClassRequest | Self::DeleteClassResponse => Op::DeleteClass,
            Self::DeleteInstanceRequest | Self::DeleteInstanceResponse => Op::DeleteInstance,
            Self::CreateClassRequest | Self::CreateClassResponse => Op::CreateClass,
            Self::CreateInstanceRequest | Self::CreateInstanceResponse => Op::CreateInstance,
            Self::ModifyClassRequest | Self::ModifyClassResponse => Op::ModifyClass,
            Self::ModifyInstanceRequest | Self::ModifyInstanceResponse => Op::ModifyInstance,
            Self::EnumerateClassesRequest | Self::EnumerateClassesResponse => {
                Op::EnumerateClasses
            }
            Self::EnumerateClassNamesRequest | Self::EnumerateClassNamesResponse => {
                Op::EnumerateClassNames
            }
            Self::EnumerateInstancesRequest | Self::EnumerateInstancesResponse => {
                Op::EnumerateInstances
            }
            Self::EnumerateInstanceNamesRequest | Self::EnumerateInstanceNamesResponse => {
                Op::EnumerateInstanceNames
            }
            Self::ExecQueryRequest | Self::ExecQueryResponse => Op::ExecQuery,
            Self::AssociatorsRequest | Self::AssociatorsResponse => Op::Associators,
            Self::AssociatorNamesRequest | Self::AssociatorNamesResponse => Op::AssociatorNames,
            Self::ReferencesRequest | Self::ReferencesResponse => Op::References,
            Self::ReferenceNamesRequest | Self::ReferenceNamesResponse => Op::ReferenceNames,
            Self::GetPropertyRequest | Self::GetPropertyResponse => Op::GetProperty,
            Self::SetPropertyRequest | Self::SetPropertyResponse => Op::SetProperty,
            Self::GetQualifierRequest | Self::GetQualifierResponse => Op::GetQualifier,
            Self::SetQualifierRequest | Self::SetQualifierResponse => Op::SetQualifier,
            Self::DeleteQualifierRequest | Self::DeleteQualifierResponse => Op::DeleteQualifier,
            Self::EnumerateQualifiersRequest | Self::EnumerateQualifiersResponse => {
                Op::EnumerateQualifiers
            }
            Self::InvokeMethodRequest | Self::InvokeMethodResponse => Op::InvokeMethod,
            Self::OpenEnumerateInstancesRequest | Self::OpenEnumerateInstancesResponse => {
                Op::OpenEnumerateInstances
            }
            Self::OpenEnumerateInstancePathsRequest | Self::OpenEnumerateInstancePathsResponse => {
                Op::OpenEnumerateInstancePaths
            }
            Self::OpenAssociatorInstancesRequest | Self::OpenAssociatorInstancesResponse => {
                Op::OpenAssociatorInstances
            }
            Self::OpenAssociatorInstancePathsRequest
            | Self::OpenAssociatorInstancePathsResponse => Op::OpenAssociatorInstancePaths,
            Self::OpenReferenceInstancesRequest | Self::OpenReferenceInstancesResponse => {
                Op::OpenReferenceInstances
            }
            Self::OpenReferenceInstancePathsRequest | Self::OpenReferenceInstancePathsResponse => {
                Op::OpenReferenceInstancePaths
            }
            Self::OpenQueryInstancesRequest | Self::OpenQueryInstancesResponse => {
                Op::OpenQueryInstances
            }
            Self::PullInstancesWithPathRequest | Self::PullInstancesWithPathResponse => {
                Op::PullInstancesWithPath
            }
            Self::PullInstancePathsRequest | Self::PullInstancePathsResponse => {
                Op::PullInstancePaths
            }
            Self::PullInstancesRequest | Self::PullInstancesResponse => Op::PullInstances,
            Self::CloseEnumerationRequest | Self::CloseEnumerationResponse => {
                Op::CloseEnumeration
            }
            Self::EnumerationCountRequest | Self::EnumerationCountResponse => {
                Op::EnumerationCount
            }
            _ => return None,
        };
        Some(op)
    }
}

impl TryFrom<u32> for MessageType {
    type Error = MessageError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        usize::try_from(raw)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(MessageError::UnknownType(raw))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display name for a raw type value, `"UNKNOWN"` if it is out of range.
#[must_use]
pub fn message_type_name(raw: u32) -> &'static str {
    match MessageType::try_from(raw) {
        Ok(t) => t.as_str(),
        Err(_) => {
            tracing::debug!(raw, "unknown message type");
            "UNKNOWN"
        }
    }
}

// ---------------------------------------------------------------------------
// CimOperationType
// ---------------------------------------------------------------------------

/// Client-visible CIM operation categories shared by a request and its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CimOperationType {
    GetClass,
    GetInstance,
    DeleteClass,
    DeleteInstance,
    CreateClass,
    CreateInstance,
    ModifyClass,
    ModifyInstance,
    EnumerateClasses,
    EnumerateClassNames,
    EnumerateInstances,
    EnumerateInstanceNames,
    ExecQuery,
    Associators,
    AssociatorNames,
    References,
    ReferenceNames,
    GetProperty,
    SetProperty,
    GetQualifier,
    SetQualifier,
    DeleteQualifier,
    EnumerateQualifiers,
    InvokeMethod,
    OpenEnumerateInstances,
    OpenEnumerateInstancePaths,
    OpenAssociatorInstances,
    OpenAssociatorInstancePaths,
    OpenReferenceInstances,
    OpenReferenceInstancePaths,
    OpenQueryInstances,
    PullInstancesWithPath,
    PullInstancePaths,
    PullInstances,
    CloseEnumeration,
    EnumerationCount,
}

impl CimOperationType {
    pub const ALL: &'static [CimOperationType] = &[
        Self::GetClass,
        Self::GetInstance,
        Self::DeleteClass,
        Self::DeleteInstance,
        Self::CreateClass,
        Self::CreateInstance,
        Self::ModifyClass,
        Self::ModifyInstance,
        Self::EnumerateClasses,
        Self::EnumerateClassNames,
        Self::EnumerateInstances,
        Self::EnumerateInstanceNames,
        Self::ExecQuery,
        Self::Associators,
        Self::AssociatorNames,
        Self::References,
        Self::ReferenceNames,
        Self::GetProperty,
        Self::SetProperty,
        Self::GetQualifier,
        Self::SetQualifier,
        Self::DeleteQualifier,
        Self::EnumerateQualifiers,
        Self::InvokeMethod,
        Self::OpenEnumerateInstances,
        Self::OpenEnumerateInstancePaths,
        Self::OpenAssociatorInstances,
        Self::OpenAssociatorInstancePaths,
        Self::OpenReferenceInstances,
        Self::OpenReferenceInstancePaths,
        Self::OpenQueryInstances,
        Self::PullInstancesWithPath,
        Self::PullInstancePaths,
        Self::PullInstances,
        Self::CloseEnumeration,
        Self::EnumerationCount,
    ];

    /// Whether the operation targets a class definition rather than instances.
    #[must_use]
    pub fn is_class_operation(self) -> bool {
        matches!(
            self,
            Self::GetClass
                | Self::DeleteClass
                | Self::CreateClass
                | Self::ModifyClass
                | Self::EnumerateClasses
                | Self::EnumerateClassNames
        )
    }

    /// Whether the operation addresses qualifier declarations.
    #[must_use]
    pub fn is_qualifier_operation(self) -> bool {
        matches!(
            self,
            Self::GetQualifier
                | Self::SetQualifier
                | Self::DeleteQualifier
                | Self::EnumerateQualifiers
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;

    #[test]
    fn all_is_dense_and_in_discriminant_order() {
        for (i, t) in MessageType::ALL.iter().enumerate() {
            assert_eq!(t.raw() as usize, i, "{t} out of order");
        }
        assert_eq!(NUMBER_OF_MESSAGES, 129);
    }

    #[test]
    fn try_from_rejects_out_of_range() {
        assert_eq!(MessageType::try_from(0).unwrap(), MessageType::Heartbeat);
        assert_eq!(
            MessageType::try_from(NUMBER_OF_MESSAGES - 1).unwrap(),
            MessageType::WsmanExportIndicationResponse
        );
        assert!(matches!(
            MessageType::try_from(NUMBER_OF_MESSAGES),
            Err(MessageError::UnknownType(n)) if n == NUMBER_OF_MESSAGES
        ));
        assert_eq!(message_type_name(NUMBER_OF_MESSAGES + 7), "UNKNOWN");
    }

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = MessageType::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(names.len(), MessageType::ALL.len());
    }

    #[test]
    fn get_instance_request_and_response_share_category() {
        assert_eq!(
            MessageType::GetInstanceRequest.operation_type(),
            Some(CimOperationType::GetInstance)
        );
        assert_eq!(
            MessageType::GetInstanceResponse.operation_type(),
            Some(CimOperationType::GetInstance)
        );
    }

    #[test]
    fn every_category_has_exactly_one_request_and_one_response() {
        let mut requests: HashMap<CimOperationType, Vec<MessageType>> = HashMap::new();
        let mut responses: HashMap<CimOperationType, Vec<MessageType>> = HashMap::new();

        for t in MessageType::ALL {
            if let Some(op) = t.operation_type() {
                if t.is_request() {
                    requests.entry(op).or_default().push(*t);
                } else {
                    assert!(t.is_response(), "{t} has a category but no pairing");
                    responses.entry(op).or_default().push(*t);
                }
            }
        }

        for op in CimOperationType::ALL {
            let req = requests.get(op).map_or(0, Vec::len);
            let resp = responses.get(op).map_or(0, Vec::len);
            assert_eq!(req, 1, "{op:?} has {req} request types");
            assert_eq!(resp, 1, "{op:?} has {resp} response types");
        }
    }

    #[test]
    fn request_and_its_response_map_to_same_category() {
        for (req, resp) in REQUEST_RESPONSE_PAIRS {
            assert_eq!(req.operation_type(), resp.operation_type(), "{req} / {resp}");
        }
    }

    #[test]
    fn pairs_use_each_type_once() {
        let mut seen = HashSet::new();
        for (req, resp) in REQUEST_RESPONSE_PAIRS {
            assert!(seen.insert(*req), "{req} listed twice");
            assert!(seen.insert(*resp), "{resp} listed twice");
        }
    }

    #[test]
    fn non_operations_have_no_category() {
        for t in [
            MessageType::Heartbeat,
            MessageType::ProcessIndicationRequest,
            MessageType::CreateSubscriptionRequest,
            MessageType::AsyncIoClose,
            MessageType::Http,
        ] {
            assert_eq!(t.operation_type(), None, "{t}");
        }
    }

    #[test]
    fn control_requests_are_answered_with_op_result() {
        assert!(MessageType::AsyncIoClose.is_request());
        assert_eq!(
            MessageType::AsyncCimServiceStop.response_type(),
            Some(MessageType::AsyncOpResult)
        );
        assert_eq!(MessageType::GetClassResponse.response_type(), None);
    }
}
