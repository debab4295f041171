use crate::types::RemoteError;
use bridge_traits::error::BridgeError;
use core_library::error::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// The remote endpoint answered with a non-success status.
    #[error("Auth endpoint rejected the request: {0}")]
    Api(RemoteError),

    /// The request never produced a response (network, TLS, timeout).
    #[error("Transport error: {0}")]
    Transport(#[from] BridgeError),

    /// A successful response could not be decoded.
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// No session exists locally.
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Local store error: {0}")]
    Store(#[from] LibraryError),
}

impl AuthError {
    /// The normalized remote failure, when this error carries one.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            AuthError::Api(remote) => Some(remote),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
