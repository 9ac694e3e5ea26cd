pub mod context;
pub mod errors;
pub mod worker_client;

/// Generated from `proto/fleet.proto`.
pub mod proto {
    tonic::include_proto!("fleet.v1");
}

pub use context::ContextExt;
pub use errors::RpcConversionError;
pub use worker_client::{ConnectionProvider, WorkerClient};
