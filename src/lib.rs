//! Workspace facade crate.
//!
//! Host applications depend on `hymnal-core` and get the individual
//! workspace crates re-exported under stable module names, without
//! needing to wire each crate dependency themselves.
//!
//! The typical bootstrap wires the pieces together explicitly:
//!
//! ```ignore
//! use hymnal_core::auth::{AuthApi, InvalidationHandler, SessionManager};
//! use hymnal_core::bridge::time::SystemClock;
//! use hymnal_core::desktop::ReqwestHttpClient;
//! use hymnal_core::library::{DatabaseConfig, LocalStore};
//! use hymnal_core::provider::{ContentGateway, GatewayConfig};
//! use hymnal_core::runtime::events::EventBus;
//! use hymnal_core::sync::{SyncConfig, SyncCoordinator};
//! use std::sync::Arc;
//!
//! # async fn bootstrap() -> Result<(), Box<dyn std::error::Error>> {
//! let events = EventBus::default();
//! let http = Arc::new(ReqwestHttpClient::new());
//! let store = Arc::new(LocalStore::open(DatabaseConfig::new("hymnal.db")).await?);
//!
//! let invalidation = Arc::new(InvalidationHandler::new(store.clone(), events.clone()));
//! let api = AuthApi::new("https://content.example.com", http.clone());
//! let session = Arc::new(
//!     SessionManager::new(api, store.clone(), events.clone(), Arc::new(SystemClock), invalidation.clone()),
//! );
//! session.load().await?;
//!
//! let gateway = Arc::new(ContentGateway::new(
//!     GatewayConfig::new("https://content.example.com"),
//!     http,
//!     session.clone(),
//!     invalidation,
//! ));
//! let coordinator = SyncCoordinator::new(SyncConfig::default(), gateway, store, events);
//! # Ok(())
//! # }
//! ```

pub use bridge_desktop as desktop;
pub use bridge_traits as bridge;
pub use core_auth as auth;
pub use core_library as library;
pub use core_runtime as runtime;
pub use core_sync as sync;
pub use provider_content as provider;
