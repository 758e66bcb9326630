//! Authenticated session client.
//!
//! Wraps every outbound commerce API call so callers never handle credential
//! attachment or renewal themselves.
//!
//! # Renewal
//!
//! - A 401 triggers one renewal through the refresh endpoint, then the
//!   original request is replayed exactly once with the new token
//! - Renewal is single-flight: concurrent 401s on the same credentials share
//!   one in-flight renewal and observe the same outcome
//! - Renewal is bounded by a timeout; a timed-out renewal ends the session
//! - A failed renewal destroys the session (both tokens discarded)
//!
//! # State
//!
//! Tokens are mirrored into durable storage under fixed keys, and identity
//! changes are published on a `watch` channel for views that render it.

pub mod auth;
mod client;
pub mod identity;
pub mod transport;

pub use auth::{Registered, Registration, RenewedTokens, TokenPair};
pub use client::{DEFAULT_RENEWAL_TIMEOUT, SessionClient};
pub use identity::{Identity, decode_identity};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the session client.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Credentials are required but none are held.
    #[error("No session - authentication required")]
    NoSession,

    /// Renewal was attempted and failed; the session has been discarded.
    #[error("Session expired - please sign in again")]
    SessionExpired,

    /// The API answered with a non-success status.
    #[error("Request failed with HTTP {status}: {message}")]
    RequestFailed {
        /// Response status.
        status: StatusCode,
        /// Error message from the response body.
        message: String,
    },

    /// HTTP request could not be completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not have the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SessionError {
    /// Build a `RequestFailed` from a non-success response.
    #[must_use]
    pub fn request_failed(response: &ApiResponse) -> Self {
        Self::RequestFailed {
            status: response.status,
            message: response.error_message(),
        }
    }

    /// Whether the caller should send the user to sign in.
    #[must_use]
    pub const fn requires_authentication(&self) -> bool {
        matches!(self, Self::NoSession | Self::SessionExpired)
    }

    /// HTTP status of a failed request, if the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Outcome of a failed renewal, shared by every caller awaiting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalFailure {
    /// No refresh token was held.
    NoSession,
    /// The refresh endpoint rejected the token, failed, or timed out.
    SessionExpired,
}

impl From<RenewalFailure> for SessionError {
    fn from(failure: RenewalFailure) -> Self {
        match failure {
            RenewalFailure::NoSession => Self::NoSession,
            RenewalFailure::SessionExpired => Self::SessionExpired,
        }
    }
}
