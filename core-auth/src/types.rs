//! Session token types and remote failure normalization.

use chrono::{DateTime, Duration, Utc};
use core_library::models::SessionRecord;
use serde_json::Value;
use std::fmt;

/// Literal substring the server uses for permanently rejected credentials.
const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid user credentials";

/// Structured code the server attaches to the same condition.
const INVALID_CREDENTIALS_CODE: &str = "INVALID_CREDENTIALS";

/// The in-memory token set for the current session.
///
/// # Security
///
/// Tokens must never be logged; the `Debug` implementation redacts them.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthTokens {
    /// The access token used for API requests
    pub access_token: String,
    /// The refresh token used to obtain new access tokens
    pub refresh_token: String,
    /// When the access token expires (UTC)
    pub expires_at: DateTime<Utc>,
}

impl AuthTokens {
    pub fn new(
        access_token: String,
        refresh_token: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Check expiry against an externally supplied "now", applying the
    /// given buffer: the token counts as expired once
    /// `now >= expires_at - buffer`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, buffer_secs: i64) -> bool {
        now >= self.expires_at - Duration::seconds(buffer_secs)
    }

    /// Build from the persisted session row.
    pub fn from_record(record: &SessionRecord) -> Option<Self> {
        let expires_at = DateTime::<Utc>::from_timestamp_millis(record.expires_at)?;
        Some(Self {
            access_token: record.access_token.clone(),
            refresh_token: record.refresh_token.clone(),
            expires_at,
        })
    }

    /// Convert to the persisted session row.
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord::new(
            self.access_token.clone(),
            self.refresh_token.clone(),
            self.expires_at.timestamp_millis(),
        )
    }
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A normalized remote failure.
///
/// Every error surfaced by a remote call is reduced to this shape before
/// classification, so the invalidation detector can run the same layered
/// checks no matter which collaborator produced the error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// HTTP status, when the failure came from a response.
    pub status: Option<u16>,
    /// Best-effort human-readable message.
    pub message: String,
    /// The parsed JSON error body, when one was returned.
    pub body: Option<Value>,
}

impl RemoteError {
    /// Normalize a non-success HTTP response.
    pub fn from_response(response: &bridge_traits::http::HttpResponse) -> Self {
        let body: Option<Value> = serde_json::from_slice(&response.body).ok();

        // Prefer the first structured error message over the raw body text
        let message = body
            .as_ref()
            .and_then(|b| b.get("errors"))
            .and_then(|e| e.as_array())
            .and_then(|errors| errors.first())
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| {
                String::from_utf8_lossy(&response.body)
                    .chars()
                    .take(200)
                    .collect()
            });

        Self {
            status: Some(response.status),
            message,
            body,
        }
    }

    /// Normalize a failure with only a message (transport errors).
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    /// Normalize an arbitrary JSON error value.
    pub fn from_body(body: Value) -> Self {
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_default()
            .to_string();
        Self {
            status: None,
            message,
            body: Some(body),
        }
    }

    /// Whether this failure means the server has permanently rejected the
    /// current credentials (vs. a transient network/server error).
    ///
    /// The checks run in order:
    /// 1. literal message substring match
    /// 2. structured error-list message substring match
    /// 3. nested `errors[].extensions.code` match
    /// 4. raw 401 status match
    pub fn is_credential_rejection(&self) -> bool {
        if self.message.contains(INVALID_CREDENTIALS_MESSAGE) {
            return true;
        }

        if let Some(errors) = self
            .body
            .as_ref()
            .and_then(|b| b.get("errors"))
            .and_then(|e| e.as_array())
        {
            for err in errors {
                if let Some(message) = err.get("message").and_then(|m| m.as_str()) {
                    if message.contains(INVALID_CREDENTIALS_MESSAGE) {
                        return true;
                    }
                }
                if let Some(code) = err
                    .get("extensions")
                    .and_then(|e| e.get("code"))
                    .and_then(|c| c.as_str())
                {
                    if code == INVALID_CREDENTIALS_CODE {
                        return true;
                    }
                }
            }
        }

        self.status == Some(401)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for RemoteError {}
