//! Error/session-invalidation handling.
//!
//! Every collaborator that makes a remote call routes its failures through
//! [`InvalidationHandler::inspect`]; this is the single place that decides
//! the current session is unrecoverable. On positive detection it wipes
//! every local table and emits [`AuthEvent::SessionInvalidated`] so the UI
//! shell forces navigation to the login view with a reason code.

use crate::types::RemoteError;
use core_library::store::LocalStore;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, LogoutReason};
use std::sync::Arc;
use tracing::warn;

/// Detects permanently rejected credentials and tears down local state.
pub struct InvalidationHandler {
    store: Arc<LocalStore>,
    events: EventBus,
}

impl InvalidationHandler {
    pub fn new(store: Arc<LocalStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    /// Classify a remote failure; on a credential rejection, wipe all
    /// local data and emit the invalidation event.
    ///
    /// Returns `true` when the error was an invalidation (and was handled),
    /// `false` for transient failures, which the caller surfaces as usual.
    pub async fn inspect(&self, error: &RemoteError) -> bool {
        if !error.is_credential_rejection() {
            return false;
        }

        warn!(error = %error, "Credentials permanently rejected by server");
        // The source treats a detected rejection as a deleted account
        self.invalidate(LogoutReason::AccountDeleted).await;
        true
    }

    /// Wipe every local table (best-effort, two-tier) and announce the
    /// forced logout with the given reason.
    pub async fn invalidate(&self, reason: LogoutReason) {
        self.store.wipe_all().await;

        let _ = self
            .events
            .emit(CoreEvent::Auth(AuthEvent::SessionInvalidated { reason }));
    }
}
