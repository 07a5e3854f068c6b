//! Timeout middleware for dispatched operations.
//!
//! Rejects operations that exceed their timeout with `DispatchError::Timeout`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use cimom_core::Message;
use tower::{Layer, Service};

use crate::service::operation::{DispatchError, DispatchResponse};

// ---------------------------------------------------------------------------
// TimeoutLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps services with per-operation timeout enforcement.
///
/// The timeout is read from each message's `context.timeout_ms`, falling
/// back to the layer's default when the client supplied none.
#[derive(Debug, Clone)]
pub struct TimeoutLayer {
    default_timeout_ms: u64,
}

impl TimeoutLayer {
    #[must_use]
    pub fn new(default_timeout_ms: u64) -> Self {
        Self { default_timeout_ms }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            default_timeout_ms: self.default_timeout_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// TimeoutService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
    default_timeout_ms: u64,
}

impl<S> Service<Message> for TimeoutService<S>
where
    S: Service<Message, Response = DispatchResponse, Error = DispatchError> + Send,
    S::Future: Send + 'static,
{
    type Response = DispatchResponse;
    type Error = DispatchError;
    type Future = Pin<Box<dyn Future<Output = Result<DispatchResponse, DispatchError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, msg: Message) -> Self::Future {
        let timeout_ms = msg.context.timeout_ms.unwrap_or(self.default_timeout_ms);
        let fut = self.inner.call(msg);
        Box::pin(async move {
            let duration = Duration::from_millis(timeout_ms);
            match tokio::time::timeout(duration, fut).await {
                Ok(result) => result,
                Err(_elapsed) => Err(DispatchError::Timeout { timeout_ms }),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
