//! Error types for the control-plane server.

use nodectl_rpc::protocol::{self, RpcError};

/// Errors that can occur while dispatching or serving
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame codec error
    #[error("Codec error: {0}")]
    Codec(#[from] nodectl_rpc::CodecError),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// Dispatch attempted during warmup; carries the warmup status
    #[error("Server warming up: {0}")]
    InWarmup(String),

    /// No registered command has this name
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// A named argument matched none of the declared parameter names
    #[error("Unknown named parameter {0}")]
    UnknownNamedParameter(String),

    /// The handler failed; the message is kept verbatim
    #[error("{0}")]
    HandlerFailure(String),

    /// `run_later` called with no timer backend installed
    #[error("No timer handler registered for RPC")]
    NoTimerBackend,

    /// Structured error raised by a handler or by request parsing
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl From<ServerError> for RpcError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Io(e) => RpcError::internal_error(e.to_string()),
            ServerError::Codec(e) => RpcError::internal_error(e.to_string()),
            ServerError::Config(msg) => RpcError::internal_error(msg),
            ServerError::InWarmup(status) => RpcError::in_warmup(status),
            ServerError::MethodNotFound(_) => RpcError::method_not_found(),
            ServerError::UnknownNamedParameter(key) => {
                RpcError::invalid_parameter(format!("Unknown named parameter {key}"))
            }
            ServerError::HandlerFailure(msg) => RpcError::misc_error(msg),
            e @ ServerError::NoTimerBackend => RpcError::internal_error(e.to_string()),
            ServerError::Rpc(e) => e,
        }
    }
}

impl ServerError {
    /// Wire code this error is reported under.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            ServerError::Io(_)
            | ServerError::Codec(_)
            | ServerError::Config(_)
            | ServerError::NoTimerBackend => protocol::INTERNAL_ERROR,
            ServerError::InWarmup(_) => protocol::IN_WARMUP,
            ServerError::MethodNotFound(_) => protocol::METHOD_NOT_FOUND,
            ServerError::UnknownNamedParameter(_) => protocol::INVALID_PARAMETER,
            ServerError::HandlerFailure(_) => protocol::MISC_ERROR,
            ServerError::Rpc(e) => e.code,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
