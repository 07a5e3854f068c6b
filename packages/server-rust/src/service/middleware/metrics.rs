//! Metrics middleware for dispatched operations.
//!
//! Records operation duration and outcome using `tracing` spans.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use cimom_core::Message;
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::operation::{DispatchError, DispatchResponse};

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments operations with timing via `tracing` spans.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<Message> for MetricsService<S>
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
        let message_type = msg.message_type().as_str();
        let (class_name, namespace) = msg
            .cim_request()
            .map(|req| (req.class_name.to_string(), req.namespace.to_string()))
            .unwrap_or_default();

        let span = info_span!(
            "operation",
            message_type = message_type,
            class = %class_name,
            namespace = %namespace,
            call_id = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(msg);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = start.elapsed().as_millis() as u64;
                let outcome = match &result {
                    Ok(resp) if resp.error().is_some() => "cim_error",
                    Ok(_) => "ok",
                    Err(_) => "error",
                };

                let span = tracing::Span::current();
                if let Ok(resp) = &result {
                    span.record("call_id", resp.call_id);
                }
                span.record("duration_ms", duration_ms);
                span.record("outcome", outcome);

                tracing::info!(
                    message_type = message_type,
                    duration_ms = duration_ms,
                    outcome = outcome,
                    "operation complete"
                );

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tower::ServiceExt;

    use super::*;
    use crate::service::middleware::test_support::{request, SlowService};

    #[tokio::test]
    async fn metrics_layer_passes_through_response() {
        let svc = MetricsLayer.layer(SlowService { delay_ms: 0 });
        let resp = svc.oneshot(request()).await.unwrap();
        assert_eq!(resp.call_id, 7);
    }
}
