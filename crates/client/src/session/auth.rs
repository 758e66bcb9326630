//! Credential endpoints of the commerce API.
//!
//! These calls are unauthenticated and never go through the renew-and-replay
//! path: a 401 from the login endpoint means bad credentials, and a failure
//! from the refresh endpoint ends the session.

use nexus_market_core::Role;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::SessionError;
use super::transport::{ApiRequest, Transport};

/// Login endpoint.
pub const LOGIN_PATH: &str = "auth/login/";

/// Token renewal endpoint.
pub const REFRESH_PATH: &str = "auth/refresh/";

/// Account registration endpoint.
pub const REGISTER_PATH: &str = "auth/register/";

/// Access and refresh tokens issued at login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Short-lived bearer credential.
    pub access: SecretString,
    /// Credential used only to obtain a new access token.
    pub refresh: SecretString,
}

/// Tokens issued by the refresh endpoint.
#[derive(Debug, Clone)]
pub struct RenewedTokens {
    /// Replacement access token.
    pub access: SecretString,
    /// Replacement refresh token, when the server rotates them.
    pub refresh: Option<SecretString>,
}

/// New account details for registration.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Plain-text password, sent once over TLS.
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
    /// Requested role (`OWNER` for sellers, `CUSTOMER` for shoppers).
    pub role: Role,
}

/// Server acknowledgement of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Registered {
    /// Confirmation message.
    #[serde(default)]
    pub message: String,
    /// Username of the created account.
    pub username: String,
}

fn serialize_secret<S: serde::Serializer>(
    secret: &SecretString,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

#[derive(Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Exchange a username and password for a token pair.
///
/// # Errors
///
/// Returns `SessionError::RequestFailed` if the credentials are rejected,
/// `SessionError::Http` on network failure, or `SessionError::Parse` if the
/// response is malformed.
#[instrument(skip(transport, password), fields(username = %username))]
pub async fn login(
    transport: &dyn Transport,
    username: &str,
    password: &SecretString,
) -> Result<TokenPair, SessionError> {
    let request = ApiRequest::post(
        LOGIN_PATH,
        serde_json::json!({
            "username": username,
            "password": password.expose_secret(),
        }),
    );

    let response = transport.send(&request, None).await?;
    if !response.is_success() {
        return Err(SessionError::request_failed(&response));
    }

    let tokens: LoginResponse = response.json()?;
    Ok(TokenPair {
        access: SecretString::from(tokens.access),
        refresh: SecretString::from(tokens.refresh),
    })
}

/// Obtain a new access token using a refresh token.
///
/// # Errors
///
/// Returns `SessionError::RequestFailed` if the refresh token is rejected,
/// `SessionError::Http` on network failure, or `SessionError::Parse` if the
/// response is malformed.
#[instrument(skip_all)]
pub async fn refresh_access_token(
    transport: &dyn Transport,
    refresh_token: &SecretString,
) -> Result<RenewedTokens, SessionError> {
    let request = ApiRequest::post(
        REFRESH_PATH,
        serde_json::json!({ "refresh": refresh_token.expose_secret() }),
    );

    let response = transport.send(&request, None).await?;
    if !response.is_success() {
        return Err(SessionError::request_failed(&response));
    }

    let tokens: RefreshResponse = response.json()?;
    Ok(RenewedTokens {
        access: SecretString::from(tokens.access),
        refresh: tokens.refresh.map(SecretString::from),
    })
}

/// Create a new account.
///
/// # Errors
///
/// Returns `SessionError::RequestFailed` if the server rejects the
/// registration (duplicate username, invalid email, ...).
#[instrument(skip(transport, registration), fields(username = %registration.username, role = %registration.role))]
pub async fn register(
    transport: &dyn Transport,
    registration: &Registration,
) -> Result<Registered, SessionError> {
    let request = ApiRequest::post(REGISTER_PATH, serde_json::to_value(registration)?);

    let response = transport.send(&request, None).await?;
    if !response.is_success() {
        return Err(SessionError::request_failed(&response));
    }

    Ok(response.json()?)
}
