//! Lifecycle gate: only a `Ready` server dispatches, and every accepted
//! operation is counted as in flight until it completes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use cimom_core::Message;
use tower::{Layer, Service};
use tracing::debug;

use crate::lifecycle::{LifecycleState, ServerLifecycle};
use crate::service::operation::{DispatchError, DispatchResponse};

#[derive(Debug, Clone)]
pub struct LifecycleLayer {
    lifecycle: Arc<ServerLifecycle>,
}

impl LifecycleLayer {
    #[must_use]
    pub fn new(lifecycle: Arc<ServerLifecycle>) -> Self {
        Self { lifecycle }
    }
}

impl<S> Layer<S> for LifecycleLayer {
    type Service = LifecycleService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LifecycleService {
            inner,
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleService<S> {
    inner: S,
    lifecycle: Arc<ServerLifecycle>,
}

impl<S> Service<Message> for LifecycleService<S>
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
        let state = self.lifecycle.state();
        if state != LifecycleState::Ready {
            debug!(state = %state, message_type = %msg.message_type(), "operation rejected");
            return Box::pin(async move { Err(DispatchError::NotReady(state)) });
        }

        let guard = self.lifecycle.in_flight_guard();
        let fut = self.inner.call(msg);
        Box::pin(async move {
            let result = fut.await;
            drop(guard);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tower::ServiceExt;

    use super::*;
    use crate::service::middleware::test_support::{request, SlowService};

    #[tokio::test]
    async fn rejects_before_ready() {
        let lifecycle = Arc::new(ServerLifecycle::new());
        let svc = LifecycleLayer::new(lifecycle).layer(SlowService { delay_ms: 0 });
        let err = svc.oneshot(request()).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotReady(LifecycleState::Starting)));
    }

    #[tokio::test]
    async fn rejects_while_draining() {
        let lifecycle = Arc::new(ServerLifecycle::new());
        lifecycle.set_ready();
        lifecycle.begin_drain();
        let svc = LifecycleLayer::new(lifecycle).layer(SlowService { delay_ms: 0 });
        let err = svc.oneshot(request()).await.unwrap_err();
        assert!(matches!(err, DispatchError::NotReady(LifecycleState::Draining)));
    }

    #[tokio::test]
    async fn tracks_in_flight_operations() {
        let lifecycle = Arc::new(ServerLifecycle::new());
        lifecycle.set_ready();
        let mut svc = LifecycleLayer::new(Arc::clone(&lifecycle)).layer(SlowService { delay_ms: 50 });

        let fut = svc.call(request());
        assert_eq!(lifecycle.in_flight_count(), 1);

        fut.await.unwrap();
        assert_eq!(lifecycle.in_flight_count(), 0);
        assert!(lifecycle.wait_for_drain(Duration::from_millis(10)).await);
    }
}
