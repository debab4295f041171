use core_library::error::LibraryError;
use provider_content::error::GatewayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// A second `sync_all` was invoked while one was still running.
    #[error("A sync is already in progress")]
    AlreadyRunning,

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Local store error: {0}")]
    Store(#[from] LibraryError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
