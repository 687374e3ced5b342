//! Unix socket transport for the control plane.
//!
//! Each frame is one request body: an object for a single call or an array
//! for a batch. Each body gets exactly one reply frame.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use nodectl_rpc::{CodecError, FrameCodec, Reply, RpcError};
use serde_json::Value;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, warn};

use crate::error::{Result, ServerError};
use crate::server::RpcServer;
use crate::session::Peer;

/// Bind the control socket, replacing a stale socket file.
///
/// # Errors
///
/// Returns an error if another daemon is answering on `path` or the socket
/// cannot be bound.
pub async fn bind(path: &Path) -> Result<UnixListener> {
    cleanup_stale_socket(path).await?;
    let listener = UnixListener::bind(path)?;
    info!("Listening on {:?}", path);
    Ok(listener)
}

async fn cleanup_stale_socket(path: &Path) -> Result<()> {
    if path.exists() {
        if UnixStream::connect(path).await.is_ok() {
            return Err(ServerError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                "Another nodectld is already running",
            )));
        }
        info!("Removing stale socket at {}", path.display());
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Accept connections until the server's shutdown token fires, then remove
/// the socket file.
///
/// # Errors
///
/// Currently always returns `Ok`; accept failures are logged and skipped.
pub async fn serve(server: Arc<RpcServer>, listener: UnixListener, path: PathBuf) -> Result<()> {
    let shutdown = server.shutdown_token();

    info!("Ready to accept connections");
    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    let server = Arc::clone(&server);
                    let path = path.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(server, stream, &path).await {
                            error!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => error!("Accept error: {}", e),
            },
        }
    }

    if path.exists()
        && let Err(e) = std::fs::remove_file(&path)
    {
        warn!("Failed to remove socket file {:?}: {}", path, e);
    }
    Ok(())
}

async fn handle_connection(server: Arc<RpcServer>, stream: UnixStream, path: &Path) -> Result<()> {
    let peer = Peer::from_stream(&stream, path);
    debug!("New connection: {} ({})", peer.id, peer.user);

    let template = peer.request_template();
    let mut framed = Framed::new(stream, FrameCodec::new());

    while let Some(frame) = framed.next().await {
        let body = match frame {
            Ok(body) => body,
            // The stream ends after a decode error; answer, then hang up.
            Err(CodecError::Body(err)) => {
                debug!("Rejected body from {}: {}", peer.id, err);
                framed.send(Reply::failure(err, Value::Null).to_text()).await?;
                break;
            }
            Err(e @ (CodecError::Json(_) | CodecError::Utf8(_))) => {
                debug!("Unparseable body from {}: {}", peer.id, e);
                let reply = Reply::failure(RpcError::parse_error("Parse error"), Value::Null);
                framed.send(reply.to_text()).await?;
                break;
            }
            Err(e) => {
                warn!("Read error from {}: {}", peer.id, e);
                break;
            }
        };

        if !server.is_running() {
            debug!("Server interrupted, dropping request from {}", peer.id);
            break;
        }

        let server = Arc::clone(&server);
        let template = template.clone();
        let reply = tokio::task::spawn_blocking(move || server.handle_body(&template, &body))
            .await
            .map_err(|e| ServerError::Io(std::io::Error::other(e)))?;

        framed.send(reply).await?;
    }

    debug!("Connection closed: {}", peer.id);
    Ok(())
}
