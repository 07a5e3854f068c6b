//! Types flowing through the dispatch pipeline.

use cimom_core::{
    CimError, CimName, CimNamespaceName, CimOperationType, CimStatusCode, Message, MessageType,
    QueueIdStackError,
};

use crate::lifecycle::LifecycleState;
use crate::queue::QueueError;
use crate::routing::{Route, RoutingError};

/// A request message accepted for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub call_id: u64,
    pub message_type: MessageType,
    pub operation: CimOperationType,
    pub namespace: CimNamespaceName,
    pub class_name: CimName,
}

/// Every reply part of one dispatched operation, in index order.
#[derive(Debug)]
pub struct DispatchResponse {
    pub call_id: u64,
    pub operation: CimOperationType,
    pub route: Route,
    pub parts: Vec<Message>,
}

impl DispatchResponse {
    /// The first failed part's error, if any part failed.
    #[must_use]
    pub fn error(&self) -> Option<&CimError> {
        self.parts
            .iter()
            .filter_map(Message::cim_response)
            .find_map(|resp| resp.result.as_ref().err())
    }
}

/// Errors from classifying a `Message` for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("{0} is not a CIM operation request")]
    NotARequest(MessageType),
    #[error("{0} carries no target class and namespace")]
    NoTarget(MessageType),
}

/// Errors returned by the dispatcher and its middleware.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error("class {class_name} is not supported in namespace {namespace}")]
    NotSupported {
        class_name: CimName,
        namespace: CimNamespaceName,
    },
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("return path: {0}")]
    ReturnPath(#[from] QueueIdStackError),
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("server overloaded, try again later")]
    Overloaded,
    #[error("server is {0}, not accepting operations")]
    NotReady(LifecycleState),
    #[error("reply stream ended after {received} part(s) without a final part")]
    Incomplete { received: usize },
    #[error("reply part {0} received twice")]
    DuplicatePart(u32),
    #[error("reply part {index} arrived after final part {final_index}")]
    PartAfterFinal { index: u32, final_index: u32 },
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DispatchError {
    /// The CIM error reported to the client for this failure.
    #[must_use]
    pub fn to_cim_error(&self) -> CimError {
        let code = match self {
            Self::Classify(ClassifyError::NoTarget(_)) => CimStatusCode::InvalidParameter,
            Self::NotSupported { .. } => CimStatusCode::NotSupported,
            Self::Overloaded => CimStatusCode::ServerLimitsExceeded,
            Self::NotReady(LifecycleState::Draining | LifecycleState::Stopped) => {
                CimStatusCode::ServerIsShuttingDown
            }
            _ => CimStatusCode::Failed,
        };
        CimError::new(code, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_supported_maps_to_cim_code() {
        let err = DispatchError::NotSupported {
            class_name: CimName::new("CIM_Foo").unwrap(),
            namespace: CimNamespaceName::new("root/cimv2").unwrap(),
        };
        let cim = err.to_cim_error();
        assert_eq!(cim.code, CimStatusCode::NotSupported);
        assert_eq!(cim.message, "class CIM_Foo is not supported in namespace root/cimv2");
    }

    #[test]
    fn draining_maps_to_shutting_down() {
        let cim = DispatchError::NotReady(LifecycleState::Draining).to_cim_error();
        assert_eq!(cim.code, CimStatusCode::ServerIsShuttingDown);

        let cim = DispatchError::NotReady(LifecycleState::Starting).to_cim_error();
        assert_eq!(cim.code, CimStatusCode::Failed);
    }

    #[test]
    fn overload_and_timeout_codes() {
        assert_eq!(
            DispatchError::Overloaded.to_cim_error().code,
            CimStatusCode::ServerLimitsExceeded
        );
        assert_eq!(
            DispatchError::Timeout { timeout_ms: 5 }.to_cim_error().code,
            CimStatusCode::Failed
        );
    }
}
