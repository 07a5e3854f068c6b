//! `cimom` core: message types, queue-id stacks, CIM names and status codes.

pub mod context;
pub mod messages;
pub mod name;
pub mod status;

pub use context::OperationContext;
pub use messages::{
    convert_message_type_to_op_type, message_type_name, CimOperationType, CimRequest,
    CimResponse, ControlMessage, HttpMethod, Message, MessageBody, MessageError, MessageMask,
    MessageType, QueueId, QueueIdStack, QueueIdStackError, NUMBER_OF_MESSAGES,
};
pub use name::{CimName, CimNamespaceName, NameError, NamespaceScope};
pub use status::{CimError, CimStatusCode};
