//! Thin client for the content API's auth endpoints.
//!
//! All endpoints speak JSON with the payload wrapped in a `data` envelope.
//! Non-success responses are normalized to [`RemoteError`] so callers can
//! classify them; this client never interprets failures itself.

use crate::error::{AuthError, Result};
use crate::types::RemoteError;
use bridge_traits::http::{HttpClient, HttpRequest};
use core_library::models::UserRecord;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Token lifetime the server implies when it omits `expires` (15 minutes).
pub const DEFAULT_TOKEN_TTL_MS: i64 = 900_000;

/// Role name that marks a fully activated account.
const ACTIVATED_ROLE: &str = "activated";

/// A token pair issued by login or refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    /// Token lifetime in milliseconds; optional on the wire.
    #[serde(default)]
    pub expires: Option<i64>,
}

impl TokenGrant {
    /// Lifetime in milliseconds, falling back to the server default.
    pub fn expires_ms(&self) -> i64 {
        self.expires.unwrap_or(DEFAULT_TOKEN_TTL_MS)
    }
}

/// Fields accepted by the registration endpoint.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub email: String,
    pub password: String,
    pub activation_code: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// Role arrives either as a plain string or as an expanded object.
#[derive(Deserialize)]
#[serde(untagged)]
enum RoleField {
    Named { name: String },
    Plain(String),
}

impl RoleField {
    fn into_name(self) -> String {
        match self {
            RoleField::Named { name } => name,
            RoleField::Plain(name) => name,
        }
    }
}

#[derive(Deserialize)]
struct ProfilePayload {
    id: String,
    email: String,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    role: Option<RoleField>,
}

/// Auth endpoint client.
pub struct AuthApi {
    base_url: String,
    http: Arc<dyn HttpClient>,
}

impl AuthApi {
    pub fn new(base_url: impl Into<String>, http: Arc<dyn HttpClient>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, http }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Execute a request and map any non-success response to a
    /// normalized [`RemoteError`].
    async fn send(&self, request: HttpRequest) -> Result<bridge_traits::http::HttpResponse> {
        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(AuthError::Api(RemoteError::from_response(&response)));
        }
        Ok(response)
    }

    /// Password login.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenGrant> {
        debug!("Requesting password login");

        let request = HttpRequest::post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))?;

        let response = self.send(request).await?;
        let envelope: DataEnvelope<TokenGrant> = response
            .json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        Ok(envelope.data)
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        debug!("Requesting token refresh");

        let request = HttpRequest::post(self.url("/auth/refresh"))
            .json(&json!({ "refresh_token": refresh_token, "mode": "json" }))?;

        let response = self.send(request).await?;
        let envelope: DataEnvelope<TokenGrant> = response
            .json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        Ok(envelope.data)
    }

    /// Fetch the authenticated user's profile.
    pub async fn me(&self, access_token: &str) -> Result<UserRecord> {
        let request = HttpRequest::get(
            self.url("/users/me?fields=id,email,first_name,last_name,role"),
        )
        .bearer_token(access_token);

        let response = self.send(request).await?;
        let envelope: DataEnvelope<ProfilePayload> = response
            .json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let profile = envelope.data;
        let role = profile
            .role
            .map(RoleField::into_name)
            .unwrap_or_else(|| "user".to_string());

        Ok(UserRecord {
            id: profile.id,
            email: profile.email,
            first_name: profile.first_name,
            last_name: profile.last_name,
            activated: role == ACTIVATED_ROLE,
            role,
            skip_auth: false,
        })
    }

    /// Terminate the remote session for the given refresh token.
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        let request = HttpRequest::post(self.url("/auth/logout"))
            .json(&json!({ "refresh_token": refresh_token }))?;

        self.send(request).await?;
        Ok(())
    }

    /// Register a new account; the activation code is validated server-side
    /// and a valid code yields an already-activated account.
    pub async fn register(&self, registration: &RegistrationRequest) -> Result<()> {
        let request = HttpRequest::post(self.url("/auth/register")).json(&json!({
            "email": registration.email,
            "password": registration.password,
            "activation_code": registration.activation_code,
            "first_name": registration.first_name,
            "last_name": registration.last_name,
        }))?;

        self.send(request).await?;
        Ok(())
    }

    /// Request a password-reset mail for the given address.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let request =
            HttpRequest::post(self.url("/auth/password/request")).json(&json!({ "email": email }))?;

        self.send(request).await?;
        Ok(())
    }

    /// Complete a password reset with the mailed token.
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<()> {
        let request = HttpRequest::post(self.url("/auth/password/reset"))
            .json(&json!({ "token": token, "password": password }))?;

        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[tokio::test]
    async fn test_login_parses_token_grant() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|req| {
            assert!(req.url.ends_with("/auth/login"));
            Ok(json_response(
                200,
                r#"{"data": {"access_token": "at", "refresh_token": "rt", "expires": 900000}}"#,
            ))
        });

        let api = AuthApi::new("https://api.example.com", Arc::new(http));
        let grant = api.login("a@b.c", "pw").await.unwrap();

        assert_eq!(grant.access_token, "at");
        assert_eq!(grant.refresh_token, "rt");
        assert_eq!(grant.expires_ms(), 900_000);
    }

    #[tokio::test]
    async fn test_login_failure_is_typed_api_error() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|_| {
            Ok(json_response(
                401,
                r#"{"errors": [{"message": "Invalid user credentials."}]}"#,
            ))
        });

        let api = AuthApi::new("https://api.example.com", Arc::new(http));
        let err = api.login("a@b.c", "wrong").await.unwrap_err();

        let remote = err.remote().expect("expected an Api error");
        assert_eq!(remote.status, Some(401));
        assert!(remote.message.contains("Invalid user credentials"));
    }

    #[tokio::test]
    async fn test_grant_without_expires_uses_default_ttl() {
        let grant = TokenGrant {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires: None,
        };
        assert_eq!(grant.expires_ms(), DEFAULT_TOKEN_TTL_MS);
    }

    #[tokio::test]
    async fn test_me_maps_plain_role() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|req| {
            assert!(req.headers.contains_key("Authorization"));
            Ok(json_response(
                200,
                r#"{"data": {"id": "u1", "email": "a@b.c", "first_name": "Anna", "role": "activated"}}"#,
            ))
        });

        let api = AuthApi::new("https://api.example.com", Arc::new(http));
        let user = api.me("token").await.unwrap();

        assert_eq!(user.id, "u1");
        assert_eq!(user.role, "activated");
        assert!(user.activated);
        assert!(!user.skip_auth);
    }

    #[tokio::test]
    async fn test_me_maps_expanded_role_object() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|_| {
            Ok(json_response(
                200,
                r#"{"data": {"id": "u1", "email": "a@b.c", "role": {"name": "user"}}}"#,
            ))
        });

        let api = AuthApi::new("https://api.example.com", Arc::new(http));
        let user = api.me("token").await.unwrap();

        assert_eq!(user.role, "user");
        assert!(!user.activated);
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash_is_trimmed() {
        let mut http = MockHttpClient::new();
        http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.url, "https://api.example.com/auth/logout");
            Ok(json_response(204, ""))
        });

        let api = AuthApi::new("https://api.example.com/", Arc::new(http));
        api.logout("rt").await.unwrap();
    }
}
