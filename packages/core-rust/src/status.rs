//! CIM status codes and the error type carried in failed responses.

use std::fmt;

/// DMTF CIM status codes (DSP0200).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CimStatusCode {
    Success = 0,
    Failed = 1,
    AccessDenied = 2,
    InvalidNamespace = 3,
    InvalidParameter = 4,
    InvalidClass = 5,
    NotFound = 6,
    NotSupported = 7,
    ClassHasChildren = 8,
    ClassHasInstances = 9,
    InvalidSuperclass = 10,
    AlreadyExists = 11,
    NoSuchProperty = 12,
    TypeMismatch = 13,
    QueryLanguageNotSupported = 14,
    InvalidQuery = 15,
    MethodNotAvailable = 16,
    MethodNotFound = 17,
    NamespaceNotEmpty = 20,
    InvalidEnumerationContext = 21,
    InvalidOperationTimeout = 22,
    PullHasBeenAbandoned = 23,
    PullCannotBeAbandoned = 24,
    FilteredEnumerationNotSupported = 25,
    ContinuationOnErrorNotSupported = 26,
    ServerLimitsExceeded = 27,
    ServerIsShuttingDown = 28,
}

impl CimStatusCode {
    /// Numeric code as sent on the wire.
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// The `CIM_ERR_*` symbol for this code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "CIM_ERR_SUCCESS",
            Self::Failed => "CIM_ERR_FAILED",
            Self::AccessDenied => "CIM_ERR_ACCESS_DENIED",
            Self::InvalidNamespace => "CIM_ERR_INVALID_NAMESPACE",
            Self::InvalidParameter => "CIM_ERR_INVALID_PARAMETER",
            Self::InvalidClass => "CIM_ERR_INVALID_CLASS",
            Self::NotFound => "CIM_ERR_NOT_FOUND",
            Self::NotSupported => "CIM_ERR_NOT_SUPPORTED",
            Self::ClassHasChildren => "CIM_ERR_CLASS_HAS_CHILDREN",
            Self::ClassHasInstances => "CIM_ERR_CLASS_HAS_INSTANCES",
            Self::InvalidSuperclass => "CIM_ERR_INVALID_SUPERCLASS",
            Self::AlreadyExists => "CIM_ERR_ALREADY_EXISTS",
            Self::NoSuchProperty => "CIM_ERR_NO_SUCH_PROPERTY",
            Self::TypeMismatch => "CIM_ERR_TYPE_MISMATCH",
            Self::QueryLanguageNotSupported => "CIM_ERR_QUERY_LANGUAGE_NOT_SUPPORTED",
            Self::InvalidQuery => "CIM_ERR_INVALID_QUERY",
            Self::MethodNotAvailable => "CIM_ERR_METHOD_NOT_AVAILABLE",
            Self::MethodNotFound => "CIM_ERR_METHOD_NOT_FOUND",
            Self::NamespaceNotEmpty => "CIM_ERR_NAMESPACE_NOT_EMPTY",
            Self::InvalidEnumerationContext => "CIM_ERR_INVALID_ENUMERATION_CONTEXT",
            Self::InvalidOperationTimeout => "CIM_ERR_INVALID_OPERATION_TIMEOUT",
            Self::PullHasBeenAbandoned => "CIM_ERR_PULL_HAS_BEEN_ABANDONED",
            Self::PullCannotBeAbandoned => "CIM_ERR_PULL_CANNOT_BE_ABANDONED",
            Self::FilteredEnumerationNotSupported => "CIM_ERR_FILTERED_ENUMERATION_NOT_SUPPORTED",
            Self::ContinuationOnErrorNotSupported => "CIM_ERR_CONTINUATION_ON_ERROR_NOT_SUPPORTED",
            Self::ServerLimitsExceeded => "CIM_ERR_SERVER_LIMITS_EXCEEDED",
            Self::ServerIsShuttingDown => "CIM_ERR_SERVER_IS_SHUTTING_DOWN",
        }
    }
}

impl fmt::Display for CimStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A CIM error as returned to clients: a status code plus a description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct CimError {
    pub code: CimStatusCode,
    pub message: String,
}

impl CimError {
    #[must_use]
    pub fn new(code: CimStatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(CimStatusCode::Failed, message)
    }

    #[must_use]
    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(CimStatusCode::NotSupported, message)
    }
}
