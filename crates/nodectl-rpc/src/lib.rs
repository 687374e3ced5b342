//! JSON-RPC envelopes for the nodectl control plane.
//!
//! This crate holds everything both ends of a control connection agree on:
//!
//! - [`protocol`]: request/reply/error envelopes, error codes, request
//!   parsing and batch reply correlation
//! - [`transport`]: length-prefixed frame codec
//! - [`client`]: async client used by the `nodectl` CLI
//!
//! # Example
//!
//! ```no_run
//! use nodectl_rpc::RpcClient;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), nodectl_rpc::ClientError> {
//! let mut client = RpcClient::connect().await?;
//! let uptime = client.call("uptime", json!([])).await?;
//! println!("up for {uptime} seconds");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod protocol;
pub mod transport;

pub use client::{ClientError, DEFAULT_CLIENT_TIMEOUT, RpcClient, socket_path};

pub use protocol::{
    BatchError, INTERNAL_ERROR, INVALID_PARAMETER, INVALID_REQUEST, IN_WARMUP, JsonRpcRequest,
    METHOD_NOT_FOUND, MISC_ERROR, PARSE_ERROR, Params, Reply, RpcError, TYPE_ERROR, build_error,
    build_reply, build_request, check_body, parse_batch_reply, serialize_reply,
};

pub use transport::{CodecError, FrameCodec};
