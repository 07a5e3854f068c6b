//! The unit of work exchanged between queues.

use crate::context::OperationContext;
use crate::name::{CimName, CimNamespaceName};
use crate::status::CimError;

use super::mask::{HttpMethod, MessageMask};
use super::queue_id::{QueueId, QueueIdStack};
use super::types::{CimOperationType, MessageType, NUMBER_OF_MESSAGES};
use super::MessageError;

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// Target and arguments of a CIM operation request.
///
/// The arguments are kept as an opaque `MsgPack` value; the routing core
/// only reads the target class and namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct CimRequest {
    pub namespace: CimNamespaceName,
    pub class_name: CimName,
    pub payload: rmpv::Value,
}

impl CimRequest {
    #[must_use]
    pub fn new(namespace: CimNamespaceName, class_name: CimName) -> Self {
        Self {
            namespace,
            class_name,
            payload: rmpv::Value::Nil,
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: rmpv::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Outcome of a CIM operation, or one piece of it for multi-part results.
#[derive(Debug, Clone, PartialEq)]
pub struct CimResponse {
    pub result: Result<rmpv::Value, CimError>,
}

impl CimResponse {
    #[must_use]
    pub fn ok(value: rmpv::Value) -> Self {
        Self { result: Ok(value) }
    }

    #[must_use]
    pub fn err(error: CimError) -> Self {
        Self { result: Err(error) }
    }
}

/// Requests addressed to a queue service itself rather than to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Resume accepting requests.
    ServiceStart,
    /// Stop accepting requests other than `ServiceStart`.
    ServiceStop,
    /// Stop accepting messages, drain, and exit.
    IoClose,
    Heartbeat,
}

impl ControlMessage {
    #[must_use]
    pub fn message_type(self) -> MessageType {
        match self {
            Self::ServiceStart => MessageType::AsyncCimServiceStart,
            Self::ServiceStop => MessageType::AsyncCimServiceStop,
            Self::IoClose => MessageType::AsyncIoClose,
            Self::Heartbeat => MessageType::Heartbeat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum MessageBody {
    #[default]
    Empty,
    Request(CimRequest),
    Response(CimResponse),
    Control(ControlMessage),
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A typed message with its routing metadata.
///
/// A message has exactly one owner at a time; handing it to a queue moves
/// it. The type is fixed at construction. The queue-id stack records where
/// the reply must go.
#[derive(Debug)]
pub struct Message {
    message_type: MessageType,
    /// Queue the message is addressed to.
    pub dest: QueueId,
    mask: MessageMask,
    pub http_method: HttpMethod,
    /// Close the client connection after this reply is written.
    pub close_connect: bool,
    index: u32,
    complete: bool,
    async_slot: Option<Box<Message>>,
    pub queue_ids: QueueIdStack,
    pub context: OperationContext,
    pub body: MessageBody,
}

impl Message {
    #[must_use]
    pub fn new(message_type: MessageType, dest: QueueId, mask: MessageMask) -> Self {
        Self {
            message_type,
            dest,
            mask,
            http_method: HttpMethod::default(),
            close_connect: false,
            index: 0,
            complete: true,
            async_slot: None,
            queue_ids: QueueIdStack::new(),
            context: OperationContext::default(),
            body: MessageBody::Empty,
        }
    }

    /// A CIM operation request. The destination is left unset for the
    /// dispatcher to fill in.
    ///
    /// # Errors
    ///
    /// Returns `MessageError::NotARequest` if `message_type` is not a CIM
    /// operation request.
    pub fn request(message_type: MessageType, request: CimRequest) -> Result<Self, MessageError> {
        if !message_type.is_request() || message_type.operation_type().is_none() {
            return Err(MessageError::NotARequest(message_type));
        }
        let mut msg = Self::new(message_type, QueueId::NONE, MessageMask::HA_REQUEST);
        msg.body = MessageBody::Request(request);
        Ok(msg)
    }

    /// A control request addressed to the service behind `dest`.
    #[must_use]
    pub fn control(control: ControlMessage, dest: QueueId) -> Self {
        let mut msg = Self::new(
            control.message_type(),
            dest,
            MessageMask::HA_REQUEST | MessageMask::HA_ASYNC,
        );
        msg.body = MessageBody::Control(control);
        msg
    }

    /// The reply to `request`, addressed to the queue on top of its stack.
    ///
    /// The reply carries the request's queue-id stack and operation context
    /// unchanged; the receiving side pops its own id when it forwards.
    ///
    /// # Errors
    ///
    /// Returns `MessageError::NoResponseType` if `request` has no reply type.
    pub fn response_for(request: &Message, body: MessageBody) -> Result<Self, MessageError> {
        let response_type = request
            .message_type
            .response_type()
            .ok_or(MessageError::NoResponseType(request.message_type))?;

        let mut mask = MessageMask::HA_REPLY;
        if request.mask.contains(MessageMask::HA_ASYNC) {
            mask |= MessageMask::HA_ASYNC;
        }

        let dest = request.queue_ids.top().unwrap_or(QueueId::NONE);
        let mut reply = Self::new(response_type, dest, mask);
        reply.http_method = request.http_method;
        reply.close_connect = request.close_connect;
        reply.queue_ids = request.queue_ids;
        reply.context = request.context.clone();
        reply.body = body;
        Ok(reply)
    }

    /// A copy of this message without its body or continuation.
    ///
    /// Used to build several replies to one request after the request itself
    /// has been handed on.
    #[must_use]
    pub fn clone_header(&self) -> Message {
        let mut header = Self::new(self.message_type, self.dest, self.mask);
        header.http_method = self.http_method;
        header.close_connect = self.close_connect;
        header.index = self.index;
        header.complete = self.complete;
        header.queue_ids = self.queue_ids;
        header.context = self.context.clone();
        header
    }

    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    #[must_use]
    pub fn mask(&self) -> MessageMask {
        self.mask
    }

    pub fn set_mask(&mut self, mask: MessageMask) {
        self.mask = mask;
    }

    /// Position of this message within a multi-part response.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn set_index(&mut self, index: u32) {
        self.index = index;
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    /// Whether this is the final piece of its response.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn set_complete(&mut self, complete: bool) {
        self.complete = complete;
    }

    /// Takes the attached continuation message, leaving the slot empty.
    pub fn get_async(&mut self) -> Option<Box<Message>> {
        self.async_slot.take()
    }

    /// Attaches a continuation message, returning any message it replaces.
    pub fn put_async(&mut self, msg: Message) -> Option<Box<Message>> {
        self.async_slot.replace(Box::new(msg))
    }

    /// Whether the type is inside the message catalogue. The mask is not
    /// consulted; see `mask_is_consistent`.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.message_type.raw() < NUMBER_OF_MESSAGES
    }

    /// The mask does not claim to be both a request and a reply.
    #[must_use]
    pub fn mask_is_consistent(&self) -> bool {
        !(self.mask.is_request() && self.mask.is_reply())
    }

    #[must_use]
    pub fn operation_type(&self) -> Option<CimOperationType> {
        self.message_type.operation_type()
    }

    /// The CIM request body, if this message carries one.
    #[must_use]
    pub fn cim_request(&self) -> Option<&CimRequest> {
        match &self.body {
            MessageBody::Request(req) => Some(req),
            _ => None,
        }
    }

    /// The CIM response body, if this message carries one.
    #[must_use]
    pub fn cim_response(&self) -> Option<&CimResponse> {
        match &self.body {
            MessageBody::Response(resp) => Some(resp),
            _ => None,
        }
    }

    #[must_use]
    pub fn control_message(&self) -> Option<ControlMessage> {
        match self.body {
            MessageBody::Control(c) => Some(c),
            _ => None,
        }
    }
}

/// Operation category shared by a request type and its response type.
///
/// Returns `None` for message types outside the CIM operation set.
#[must_use]
pub fn convert_message_type_to_op_type(message_type: MessageType) -> Option<CimOperationType> {
    message_type.operation_type()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
