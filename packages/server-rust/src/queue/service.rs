//! Queue-serving worker.
//!
//! A `QueueService` owns the receiving end of one registered queue and runs
//! a tokio task that:
//! 1. Handles control messages itself (start, stop, close, heartbeat)
//! 2. Passes every other message to its `MessageHandler`, with at most
//!    `max_concurrency` handler calls in flight
//! 3. Numbers the handler's reply parts and returns them to the caller's
//!    reply channel, or to the queue on top of the request's return path

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cimom_core::{
    CimError, CimResponse, ControlMessage, Message, MessageBody, MessageMask, MessageType,
    QueueId,
};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::registry::{Envelope, MessageQueue, QueueRegistry};

// ---------------------------------------------------------------------------
// MessageHandler trait
// ---------------------------------------------------------------------------

/// Request handler behind a queue.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Handles one request and returns its reply bodies in order.
    ///
    /// Returning more than one body produces a multi-part reply. An empty
    /// list produces a single empty success reply when the request type
    /// expects one.
    async fn handle(&self, request: Message) -> Vec<MessageBody>;
}

// ---------------------------------------------------------------------------
// QueueService
// ---------------------------------------------------------------------------

/// Worker task serving one queue.
pub struct QueueService {
    queue: MessageQueue,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl QueueService {
    /// Starts serving `rx` with `handler`. The service starts in the running
    /// state.
    pub fn start<H: MessageHandler>(
        queue: MessageQueue,
        rx: mpsc::Receiver<Envelope>,
        handler: Arc<H>,
        registry: Arc<QueueRegistry>,
        max_concurrency: usize,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let worker = Worker {
            name: Arc::from(queue.name()),
            id: queue.id(),
            handler,
            registry,
            running: Arc::clone(&running),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        };
        let handle = tokio::spawn(worker.run(rx));
        Self {
            queue,
            running,
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn queue(&self) -> &MessageQueue {
        &self.queue
    }

    /// Whether the service is accepting requests (not stopped by
    /// `ServiceStop`).
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Waits for the worker to exit. Returns immediately if already joined.
    pub async fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(queue = %self.queue.name(), error = %e, "queue worker panicked");
            }
        }
    }
}

struct Worker<H> {
    name: Arc<str>,
    id: QueueId,
    handler: Arc<H>,
    registry: Arc<QueueRegistry>,
    running: Arc<AtomicBool>,
    permits: Arc<Semaphore>,
}

impl<H: MessageHandler> Worker<H> {
    async fn run(self, mut rx: mpsc::Receiver<Envelope>) {
        let mut in_flight = JoinSet::new();
        debug!(queue = %self.name, "queue worker started");

        while let Some(Envelope { message, reply }) = rx.recv().await {
            if let Some(control) = message.control_message() {
                if control == ControlMessage::IoClose {
                    // Buffered messages are still served; new sends fail.
                    rx.close();
                    info!(queue = %self.name, "incoming queue closed");
                }
                self.handle_control(control, &message);
                let ack = Self::control_reply(&message);
                deliver(&self.registry, ack, reply.as_ref()).await;
                continue;
            }

            if !self.running.load(Ordering::Acquire) {
                warn!(
                    queue = %self.name,
                    message_type = %message.message_type(),
                    "request rejected: service is stopped"
                );
                let error = CimError::failed(format!("service {} is stopped", self.name));
                let bodies = vec![MessageBody::Response(CimResponse::err(error))];
                send_replies(&self.registry, &message, bodies, reply.as_ref()).await;
                continue;
            }

            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                break;
            };
            let handler = Arc::clone(&self.handler);
            let registry = Arc::clone(&self.registry);
            in_flight.spawn(async move {
                let header = message.clone_header();
                let bodies = handler.handle(message).await;
                send_replies(&registry, &header, bodies, reply.as_ref()).await;
                drop(permit);
            });

            while let Some(done) = in_flight.try_join_next() {
                if let Err(e) = done {
                    warn!(queue = %self.name, error = %e, "handler task failed");
                }
            }
        }

        while let Some(done) = in_flight.join_next().await {
            if let Err(e) = done {
                warn!(queue = %self.name, error = %e, "handler task failed");
            }
        }
        info!(queue = %self.name, id = self.id.0, "queue worker stopped");
    }

    fn handle_control(&self, control: ControlMessage, message: &Message) {
        match control {
            ControlMessage::ServiceStart => {
                self.running.store(true, Ordering::Release);
                info!(queue = %self.name, "service started");
            }
            ControlMessage::ServiceStop => {
                self.running.store(false, Ordering::Release);
                info!(queue = %self.name, "service stopped");
            }
            ControlMessage::IoClose => {}
            ControlMessage::Heartbeat => {
                debug!(queue = %self.name, from = ?message.queue_ids.top().ok(), "heartbeat");
            }
        }
    }

    fn control_reply(message: &Message) -> Message {
        match Message::response_for(message, MessageBody::Empty) {
            Ok(reply) => reply,
            // Heartbeat answers with its own type.
            Err(_) => {
                let dest = message.queue_ids.top().unwrap_or(QueueId::NONE);
                let mut reply = Message::new(MessageType::Heartbeat, dest, MessageMask::HA_REPLY);
                reply.queue_ids = message.queue_ids;
                reply
            }
        }
    }
}

/// Builds the numbered replies for `request` and delivers each one.
async fn send_replies(
    registry: &QueueRegistry,
    request: &Message,
    mut bodies: Vec<MessageBody>,
    reply_tx: Option<&mpsc::Sender<Message>>,
) {
    if bodies.is_empty() {
        if request.message_type().response_type().is_none() {
            return;
        }
        bodies.push(MessageBody::Response(CimResponse::ok(rmpv::Value::Nil)));
    }

    let last = bodies.len() - 1;
    for (index, body) in bodies.into_iter().enumerate() {
        let mut reply = match Message::response_for(request, body) {
            Ok(reply) => reply,
            Err(e) => {
                debug!(error = %e, "no reply sent");
                return;
            }
        };
        #[allow(clippy::cast_possible_truncation)]
        reply.set_index(index as u32);
        reply.set_complete(index == last);
        deliver(registry, reply, reply_tx).await;
    }
}

async fn deliver(registry: &QueueRegistry, reply: Message, reply_tx: Option<&mpsc::Sender<Message>>) {
    if let Some(tx) = reply_tx {
        if tx.send(reply).await.is_err() {
            debug!("reply receiver dropped");
        }
        return;
    }
    if reply.dest.is_none() {
        debug!(message_type = %reply.message_type(), "reply has no return address");
        return;
    }
    if let Err(e) = registry.deliver(reply).await {
        warn!(error = %e, "reply could not be delivered");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
