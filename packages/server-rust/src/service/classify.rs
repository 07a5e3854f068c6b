//! Request classification: checks that a `Message` is a dispatchable CIM
//! operation and extracts its routing target.

use std::sync::atomic::{AtomicU64, Ordering};

use cimom_core::Message;

use super::operation::{Classified, ClassifyError};

// ---------------------------------------------------------------------------
// RequestClassifier
// ---------------------------------------------------------------------------

/// Classifies incoming request messages and assigns each a call id.
#[derive(Debug)]
pub struct RequestClassifier {
    call_id_counter: AtomicU64,
}

impl RequestClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            call_id_counter: AtomicU64::new(1),
        }
    }

    fn next_call_id(&self) -> u64 {
        self.call_id_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// # Errors
    ///
    /// - `ClassifyError::NotARequest` for responses, control messages, and
    ///   internal message types
    /// - `ClassifyError::NoTarget` for requests without a CIM request body
    pub fn classify(&self, msg: &Message) -> Result<Classified, ClassifyError> {
        let message_type = msg.message_type();
        if !message_type.is_request() {
            return Err(ClassifyError::NotARequest(message_type));
        }
        let operation = message_type
            .operation_type()
            .ok_or(ClassifyError::NotARequest(message_type))?;
        let request = msg
            .cim_request()
            .ok_or(ClassifyError::NoTarget(message_type))?;

        Ok(Classified {
            call_id: self.next_call_id(),
            message_type,
            operation,
            namespace: request.namespace.clone(),
            class_name: request.class_name.clone(),
        })
    }
}

impl Default for RequestClassifier {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
