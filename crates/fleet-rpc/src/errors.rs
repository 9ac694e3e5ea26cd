use tonic::Status;

/// Errors converting between wire messages and the internal data model,
/// distinct from `fleet_model::FleetError` which covers business-logic
/// failures. Mirrors the split the teacher draws between RPC-layer
/// conversion errors and domain errors.
#[derive(Debug, thiserror::Error)]
pub enum RpcConversionError {
    #[error("field {0} is required")]
    MissingField(&'static str),
    #[error("server id {0} is not a valid uuid")]
    InvalidServerId(String),
    #[error("rack id {0} is not a valid uuid")]
    InvalidRackId(String),
    #[error("status {0} is not a recognized server status")]
    InvalidStatus(String),
}

impl From<RpcConversionError> for Status {
    fn from(err: RpcConversionError) -> Self {
        tracing::warn!(%err, "rejecting malformed rpc request");
        Status::invalid_argument(err.to_string())
    }
}
