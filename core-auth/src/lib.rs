//! # Authentication Module
//!
//! Owns the current session: password login, token refresh with a
//! 5-minute expiry buffer, profile persistence, logout, and the
//! detection of permanently invalidated credentials.
//!
//! ## Overview
//!
//! - [`SessionManager`](session::SessionManager) orchestrates the auth
//!   lifecycle and mirrors the persisted session/user records in memory
//! - [`AuthApi`](api::AuthApi) is the thin client for the content API's
//!   auth endpoints
//! - [`InvalidationHandler`](invalidation::InvalidationHandler) is the
//!   single place that decides "this session is unrecoverable" and wipes
//!   every local table before forcing re-authentication
//!
//! The session manager is constructed explicitly at application start and
//! injected into collaborators; there is no ambient global auth state.

pub mod api;
pub mod error;
pub mod invalidation;
pub mod session;
pub mod types;

pub use api::{AuthApi, RegistrationRequest, TokenGrant};
pub use error::{AuthError, Result};
pub use invalidation::InvalidationHandler;
pub use session::{SessionManager, TokenSource, TOKEN_REFRESH_BUFFER_SECS};
pub use types::{AuthTokens, RemoteError};
