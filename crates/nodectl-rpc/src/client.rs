//! RPC client helper for talking to a running `nodectld`.
//!
//! One request (or one batch) is written per frame and exactly one reply
//! frame is read back, so the client needs no correlation table of its own.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::UnixStream;
use tokio_util::codec::Framed;

use crate::protocol::{BatchError, Reply, RpcError, build_request, parse_batch_reply};
use crate::transport::{CodecError, FrameCodec};

/// Default wait for a reply; long-running control commands are expected.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(900);

fn runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR").map_or_else(|_| std::env::temp_dir(), PathBuf::from)
}

/// Get the default socket path for the daemon.
///
/// Prefers `$XDG_RUNTIME_DIR`, falling back to the system temp directory.
#[must_use]
pub fn socket_path() -> PathBuf {
    runtime_dir().join("nodectl.sock")
}

/// Errors that can occur with the RPC client
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC error: {code} - {message}")]
    Rpc { code: i32, message: String },

    #[error("{0}")]
    Batch(#[from] BatchError),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Request timeout")]
    Timeout,
}

impl From<RpcError> for ClientError {
    fn from(e: RpcError) -> Self {
        ClientError::Rpc {
            code: e.code,
            message: e.message,
        }
    }
}

/// Client for a single control connection
pub struct RpcClient {
    framed: Framed<UnixStream, FrameCodec>,
    next_id: u64,
    timeout: Duration,
}

impl RpcClient {
    /// Connect to the daemon at the default socket path.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the socket connection fails.
    pub async fn connect() -> Result<Self, ClientError> {
        Self::connect_to(socket_path()).await
    }

    /// Connect to the daemon at a specific socket path.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the socket connection fails.
    pub async fn connect_to(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(path.as_ref()).await?;
        tracing::debug!("Connected to {}", path.as_ref().display());
        Ok(Self {
            framed: Framed::new(stream, FrameCodec::new()),
            next_id: 1,
            timeout: DEFAULT_CLIENT_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Call one method and return its result.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Rpc` if the daemon answered with an error, or a
    /// transport error if the exchange failed.
    pub async fn call(&mut self, method: &str, params: Value) -> Result<Value, ClientError> {
        let id = self.next_id;
        self.next_id += 1;

        let document = self
            .exchange(build_request(method, params, Value::from(id)).to_string())
            .await?;
        let reply: Reply = serde_json::from_value(document)?;
        Ok(reply.into_result()?)
    }

    /// Send several calls as one batch.
    ///
    /// Members are numbered `0..n` so the replies can be put back in call
    /// order. A `None` slot means the daemon sent no reply for that call.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Batch` if the reply cannot be correlated, or a
    /// transport error if the exchange failed.
    pub async fn call_batch(
        &mut self,
        calls: Vec<(String, Value)>,
    ) -> Result<Vec<Option<Reply>>, ClientError> {
        let expected = calls.len();
        let requests: Vec<Value> = calls
            .into_iter()
            .enumerate()
            .map(|(index, (method, params))| build_request(&method, params, Value::from(index)))
            .collect();

        let document = self.exchange(Value::Array(requests).to_string()).await?;
        parse_batch_reply(&document, expected)?
            .into_iter()
            .map(|slot| {
                if slot.is_null() {
                    Ok(None)
                } else {
                    serde_json::from_value::<Reply>(slot)
                        .map(Some)
                        .map_err(ClientError::from)
                }
            })
            .collect()
    }

    /// Send a caller-built request body (object or batch array) and return
    /// the reply document untouched.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the exchange failed.
    pub async fn call_raw(&mut self, body: &Value) -> Result<Value, ClientError> {
        self.exchange(body.to_string()).await
    }

    async fn exchange(&mut self, text: String) -> Result<Value, ClientError> {
        self.framed.send(text).await?;

        match tokio::time::timeout(self.timeout, self.framed.next()).await {
            Ok(Some(Ok(document))) => Ok(document),
            Ok(Some(Err(e))) => Err(e.into()),
            Ok(None) => Err(ClientError::ConnectionClosed),
            Err(_) => Err(ClientError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{METHOD_NOT_FOUND, serialize_reply};
    use serde_json::json;
    use tokio::net::UnixListener;

    /// Serve one frame with a canned answer built from the request.
    async fn serve_once<F>(listener: UnixListener, answer: F)
    where
        F: FnOnce(Value) -> String + Send + 'static,
    {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, FrameCodec::new());
        let request = framed.next().await.unwrap().unwrap();
        framed.send(answer(request)).await.unwrap();
    }

    #[test]
    fn test_socket_path_name() {
        assert!(socket_path().ends_with("nodectl.sock"));
    }

    #[test]
    fn test_client_error_from_rpc_error() {
        let err: ClientError = RpcError::method_not_found().into();
        match err {
            ClientError::Rpc { code, message } => {
                assert_eq!(code, METHOD_NOT_FOUND);
                assert_eq!(message, "Method not found");
            }
            _ => panic!("Expected Rpc error"),
        }
    }

    #[tokio::test]
    async fn test_call_returns_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(serve_once(listener, |req| {
            assert_eq!(req["method"], "uptime");
            serialize_reply(json!(12), None, req["id"].clone())
        }));

        let mut client = RpcClient::connect_to(&path).await.unwrap();
        let result = client.call("uptime", json!([])).await.unwrap();
        assert_eq!(result, 12);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_call_surfaces_rpc_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(serve_once(listener, |req| {
            serialize_reply(Value::Null, Some(RpcError::method_not_found()), req["id"].clone())
        }));

        let mut client = RpcClient::connect_to(&path).await.unwrap();
        let err = client.call("nope", Value::Null).await.unwrap_err();
        assert!(matches!(err, ClientError::Rpc { code: METHOD_NOT_FOUND, .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_call_batch_reorders_replies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(serve_once(listener, |req| {
            let members = req.as_array().unwrap();
            assert_eq!(members.len(), 2);
            format!(
                "{}\n",
                json!([
                    {"result": "second", "error": null, "id": 1},
                    {"result": "first", "error": null, "id": 0},
                ])
            )
        }));

        let mut client = RpcClient::connect_to(&path).await.unwrap();
        let replies = client
            .call_batch(vec![
                ("a".to_string(), json!([])),
                ("b".to_string(), json!([])),
            ])
            .await
            .unwrap();
        assert_eq!(replies[0].as_ref().unwrap().result, "first");
        assert_eq!(replies[1].as_ref().unwrap().result, "second");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_call_raw_returns_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(serve_once(listener, |req| {
            assert_eq!(req["id"], "mine");
            serialize_reply(json!("ok"), None, req["id"].clone())
        }));

        let mut client = RpcClient::connect_to(&path).await.unwrap();
        let reply = client
            .call_raw(&json!({"method": "x", "params": [], "id": "mine"}))
            .await
            .unwrap();
        assert_eq!(reply, json!({"result": "ok", "error": null, "id": "mine"}));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_missing_socket_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = RpcClient::connect_to(dir.path().join("absent.sock")).await;
        assert!(matches!(result, Err(ClientError::Io(_))));
    }
}
