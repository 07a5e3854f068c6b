/// Server-level configuration for queues, dispatch, and shutdown.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Timeout for operations whose context carries none, in milliseconds.
    pub default_operation_timeout_ms: u64,
    /// Maximum number of concurrent operations before load shedding.
    pub max_concurrent_operations: u32,
    /// Capacity of each service queue.
    pub queue_capacity: usize,
    /// Maximum concurrent handler calls per service queue.
    pub max_threads_per_service_queue: usize,
    /// Buffered reply parts per dispatched operation.
    pub reply_channel_capacity: usize,
    /// How long shutdown waits for in-flight operations, in milliseconds.
    pub drain_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_operation_timeout_ms: 30_000,
            max_concurrent_operations: 1000,
            queue_capacity: 256,
            max_threads_per_service_queue: 5,
            reply_channel_capacity: 64,
            drain_timeout_ms: 5_000,
        }
    }
}
