//! Queue registration and message delivery.
//!
//! Every service owns one named queue. The registry hands out ids, resolves
//! names to ids (used when the routing table is built), and resolves ids back
//! to queue handles (used to deliver replies to the queue on top of a
//! message's return path).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use cimom_core::{Message, QueueId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("a queue named {0:?} is already registered")]
    DuplicateName(String),
    #[error("no queue registered as {0}")]
    UnknownQueue(QueueId),
    #[error("no queue registered under the name {0:?}")]
    UnknownName(String),
    #[error("{0} is closed")]
    Closed(QueueId),
    #[error("{0} dropped the request without replying")]
    NoReply(QueueId),
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A message in transit, with the channel its replies should go to.
///
/// Without a reply channel, replies are delivered to the queue whose id is
/// on top of the message's queue-id stack.
#[derive(Debug)]
pub struct Envelope {
    pub message: Message,
    pub reply: Option<mpsc::Sender<Message>>,
}

// ---------------------------------------------------------------------------
// MessageQueue
// ---------------------------------------------------------------------------

/// Sending handle for one registered queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MessageQueue {
    id: QueueId,
    name: Arc<str>,
    tx: mpsc::Sender<Envelope>,
}

impl MessageQueue {
    #[must_use]
    pub fn id(&self) -> QueueId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the serving side has stopped accepting messages.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Delivers `msg` without waiting for a reply.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Closed` if the queue no longer accepts messages.
    pub async fn enqueue(&self, msg: Message) -> Result<(), QueueError> {
        self.send(Envelope {
            message: msg,
            reply: None,
        })
        .await
    }

    /// Delivers `msg` and waits for its first reply.
    ///
    /// Use `send_stream` for operations that may answer in several parts.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Closed` if the queue no longer accepts messages,
    /// or `QueueError::NoReply` if the request was dropped unanswered.
    pub async fn send_wait(&self, msg: Message) -> Result<Message, QueueError> {
        let mut rx = self.send_stream(msg, 1).await?;
        rx.recv().await.ok_or(QueueError::NoReply(self.id))
    }

    /// Delivers `msg` and returns a receiver yielding every reply part.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::Closed` if the queue no longer accepts messages.
    pub async fn send_stream(
        &self,
        msg: Message,
        capacity: usize,
    ) -> Result<mpsc::Receiver<Message>, QueueError> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.send(Envelope {
            message: msg,
            reply: Some(tx),
        })
        .await?;
        Ok(rx)
    }

    async fn send(&self, envelope: Envelope) -> Result<(), QueueError> {
        self.tx
            .send(envelope)
            .await
            .map_err(|_| QueueError::Closed(self.id))
    }
}

// ---------------------------------------------------------------------------
// QueueRegistry
// ---------------------------------------------------------------------------

/// Thread-safe registry of live queues.
///
/// Queue ids start at 1; `QueueId::NONE` is never assigned.
#[derive(Debug)]
pub struct QueueRegistry {
    by_id: DashMap<QueueId, MessageQueue>,
    by_name: DashMap<Arc<str>, QueueId>,
    next_id: AtomicU32,
}

impl QueueRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            by_name: DashMap::new(),
            next_id: AtomicU32::new(1),
        }
    }

    /// Registers a queue, returning its handle and the receiving end that the
    /// owning service consumes.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::DuplicateName` if `name` is already registered.
    pub fn register(
        &self,
        name: &str,
        capacity: usize,
    ) -> Result<(MessageQueue, mpsc::Receiver<Envelope>), QueueError> {
        let name: Arc<str> = Arc::from(name);
        match self.by_name.entry(Arc::clone(&name)) {
            Entry::Occupied(_) => Err(QueueError::DuplicateName(name.to_string())),
            Entry::Vacant(slot) => {
                let id = QueueId(self.next_id.fetch_add(1, Ordering::Relaxed));
                let (tx, rx) = mpsc::channel(capacity.max(1));
                let queue = MessageQueue { id, name, tx };
                self.by_id.insert(id, queue.clone());
                slot.insert(id);
                debug!(queue = %queue.name, id = id.0, "queue registered");
                Ok((queue, rx))
            }
        }
    }

    /// Removes a queue. Its id is never reused.
    pub fn deregister(&self, id: QueueId) -> Option<MessageQueue> {
        let (_, queue) = self.by_id.remove(&id)?;
        self.by_name.remove(queue.name());
        debug!(queue = %queue.name, id = id.0, "queue deregistered");
        Some(queue)
    }

    /// Resolves a queue name to its id.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<QueueId> {
        self.by_name.get(name).map(|entry| *entry.value())
    }

    #[must_use]
    pub fn get(&self, id: QueueId) -> Option<MessageQueue> {
        self.by_id.get(&id).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<MessageQueue> {
        self.lookup(name).and_then(|id| self.get(id))
    }

    /// Display name of a queue, for diagnostics.
    #[must_use]
    pub fn name_of(&self, id: QueueId) -> Option<String> {
        self.by_id.get(&id).map(|entry| entry.value().name().to_string())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All live queues in registration order.
    #[must_use]
    pub fn queues(&self) -> Vec<MessageQueue> {
        let mut queues: Vec<MessageQueue> = self
            .by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        queues.sort_by_key(MessageQueue::id);
        queues
    }

    /// Delivers `msg` to the queue named by its `dest`.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::UnknownQueue` if no queue has that id, or
    /// `QueueError::Closed` if it no longer accepts messages.
    pub async fn deliver(&self, msg: Message) -> Result<(), QueueError> {
        let queue = self.get(msg.dest).ok_or(QueueError::UnknownQueue(msg.dest))?;
        queue.enqueue(msg).await
    }
}

impl Default for QueueRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
