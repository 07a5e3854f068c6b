//! CIM object manager server binary.
//!
//! Usage:
//!   cimserver
//!   cimserver --dump-routes
//!   RUST_LOG=cimom_server=debug cimserver --json-logs

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cimom_server::service::ServerConfig;
use cimom_server::traits::StaticProviderRegistry;
use cimom_server::CimServer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cimserver")]
#[command(about = "CIM object manager: service queues, routing, and operation dispatch")]
#[command(version)]
struct Args {
    /// Default operation timeout in milliseconds
    #[arg(long, env = "CIMOM_OPERATION_TIMEOUT_MS", default_value_t = 30_000)]
    operation_timeout_ms: u64,

    /// Concurrent operations before new ones are rejected
    #[arg(long, env = "CIMOM_MAX_CONCURRENT_OPERATIONS", default_value_t = 1000)]
    max_concurrent_operations: u32,

    /// Capacity of each service queue
    #[arg(long, env = "CIMOM_QUEUE_CAPACITY", default_value_t = 256)]
    queue_capacity: usize,

    /// Concurrent handler calls per service queue
    #[arg(long, env = "CIMOM_MAX_THREADS_PER_SERVICE_QUEUE", default_value_t = 5)]
    max_threads_per_service_queue: usize,

    /// How long shutdown waits for in-flight operations, in milliseconds
    #[arg(long, env = "CIMOM_DRAIN_TIMEOUT_MS", default_value_t = 5_000)]
    drain_timeout_ms: u64,

    /// Print the routing table as JSON and exit
    #[arg(long)]
    dump_routes: bool,

    /// Enable JSON logging format
    #[arg(long, env = "CIMOM_JSON_LOGS")]
    json_logs: bool,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            default_operation_timeout_ms: self.operation_timeout_ms,
            max_concurrent_operations: self.max_concurrent_operations,
            queue_capacity: self.queue_capacity,
            max_threads_per_service_queue: self.max_threads_per_service_queue,
            drain_timeout_ms: self.drain_timeout_ms,
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let mut server = CimServer::new(
        args.server_config(),
        Arc::new(StaticProviderRegistry::new()),
    );
    if let Err(e) = server.start().await {
        error!(error = %e, "server failed to start");
        return Err(e);
    }

    if args.dump_routes {
        let rows = server.route_dump()?;
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return server.shutdown().await;
    }

    tokio::signal::ctrl_c().await?;
    info!("received shutdown signal");
    server.shutdown().await
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
