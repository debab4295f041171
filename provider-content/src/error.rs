use bridge_traits::error::BridgeError;
use core_auth::types::RemoteError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// The content API answered with a failure.
    #[error("Content API request failed: {0}")]
    Api(RemoteError),

    /// The request never produced a response (network, TLS, timeout).
    #[error("Transport error: {0}")]
    Transport(#[from] BridgeError),

    /// A successful response could not be decoded.
    #[error("Malformed content API response: {0}")]
    Parse(String),
}

impl GatewayError {
    /// Whether this is an authorization failure eligible for the
    /// refresh-and-retry-once protocol.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Api(remote) if remote.status == Some(401))
    }

    /// Normalized view for the invalidation detector.
    pub fn to_remote(&self) -> RemoteError {
        match self {
            GatewayError::Api(remote) => remote.clone(),
            GatewayError::Transport(e) => RemoteError::from_message(e.to_string()),
            GatewayError::Parse(message) => RemoteError::from_message(message.clone()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
