/// Structured error types for the RPC layer
///
/// The taxonomy separates failures that quarantine an endpoint and retry
/// elsewhere (Transport, Rpc) from terminal conditions (AllEndpointsFailed,
/// NoProviders).
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    /// Network-level failure: timeout, connection refused, TLS, DNS
    #[error("transport error against {endpoint}: {message}")]
    Transport {
        endpoint: String,
        message: String,
    },

    /// The node answered with a JSON-RPC error object
    #[error("rpc error against {endpoint}: {message}")]
    Rpc {
        endpoint: String,
        message: String,
    },

    /// The node answered but the payload did not have the expected shape
    #[error("malformed response from {endpoint}: {message}")]
    MalformedResponse {
        endpoint: String,
        message: String,
    },

    /// Every configured endpoint was tried once in this attempt cycle
    #[error("operation failed on all {attempts} endpoints, last error: {last_error}")]
    AllEndpointsFailed {
        attempts: usize,
        last_error: String,
    },

    /// Startup condition: no endpoint survived the liveness probe
    #[error("no usable RPC providers (0 of {configured} endpoints reachable)")]
    NoProviders {
        configured: usize,
    },
}

impl RpcError {
    /// Whether the failure should quarantine the endpoint it occurred on
    pub fn is_endpoint_failure(&self) -> bool {
        matches!(
            self,
            RpcError::Transport { .. } | RpcError::Rpc { .. } | RpcError::MalformedResponse { .. }
        )
    }

    /// The endpoint this error was observed on, when there is one
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            RpcError::Transport { endpoint, .. } => Some(endpoint),
            RpcError::Rpc { endpoint, .. } => Some(endpoint),
            RpcError::MalformedResponse { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }
}
