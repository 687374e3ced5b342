//! Identity of a control connection.

use std::fmt;
use std::path::Path;

use nodectl_rpc::JsonRpcRequest;
use tokio::net::UnixStream;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the transport knows about the peer.
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: ConnectionId,
    pub user: String,
    pub uri: String,
}

impl Peer {
    /// Describe the peer on `stream`, accepted on the socket at `path`.
    ///
    /// The user is the peer's uid as reported by the kernel, or empty when
    /// the platform cannot tell.
    #[must_use]
    pub fn from_stream(stream: &UnixStream, path: &Path) -> Self {
        let user = stream
            .peer_cred()
            .map(|cred| format!("uid:{}", cred.uid()))
            .unwrap_or_default();
        Self {
            id: ConnectionId::new(),
            user,
            uri: path.display().to_string(),
        }
    }

    /// Request template carrying the transport fields for this peer.
    #[must_use]
    pub fn request_template(&self) -> JsonRpcRequest {
        JsonRpcRequest {
            uri: self.uri.clone(),
            auth_user: self.user.clone(),
            ..JsonRpcRequest::default()
        }
    }
}
