//! Messages exchanged between server queues.
//!
//! - `types`: the closed `MessageType` catalogue and CIM operation categories
//! - `mask`: request/reply/async classification flags and HTTP method
//! - `queue_id`: queue addresses and the return-path `QueueIdStack`
//! - `message`: the `Message` envelope and its bodies

pub mod mask;
pub mod message;
pub mod queue_id;
pub mod types;

pub use mask::{HttpMethod, MessageMask};
pub use message::{
    convert_message_type_to_op_type, CimRequest, CimResponse, ControlMessage, Message,
    MessageBody,
};
pub use queue_id::{QueueId, QueueIdStack, QueueIdStackError};
pub use types::{message_type_name, CimOperationType, MessageType, NUMBER_OF_MESSAGES};

/// Errors from constructing or converting messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("unknown message type {0}")]
    UnknownType(u32),
    #[error("{0} is not a CIM operation request")]
    NotARequest(MessageType),
    #[error("{0} has no response type")]
    NoResponseType(MessageType),
}
