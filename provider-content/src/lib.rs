//! # Content API Gateway
//!
//! Issues authenticated queries for song metadata and binary assets against
//! the remote content service.
//!
//! ## Overview
//!
//! - [`ContentProvider`] is the seam the sync orchestrator (and tests)
//!   depend on
//! - [`ContentGateway`] is the production implementation: one GraphQL
//!   catalog query plus authenticated asset downloads, both following the
//!   authenticate-retry protocol (exactly one token refresh and one retry
//!   on an authorization failure)
//! - Every surfaced error first passes through the session-invalidation
//!   detector, so "account no longer valid" signals are never swallowed

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{ContentGateway, ContentProvider, GatewayConfig};
pub use error::{GatewayError, Result};
