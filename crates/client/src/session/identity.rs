//! Identity decoded from access token claims.
//!
//! The access token is a JWT issued by the commerce API. The client never
//! verifies its signature (it has no key, and the server re-validates every
//! call); it only reads the payload to learn who is signed in. Decoding is a
//! pure function and any malformed token yields `None`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nexus_market_core::{Role, TenantId, UserId};

/// The signed-in user as described by the access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Account ID (`user_id` claim).
    pub subject_id: UserId,
    /// Login name. Empty when the issuer omits the claim.
    pub username: String,
    /// Account role.
    pub role: Role,
    /// Shop the account belongs to, for owners and staff.
    pub tenant_id: Option<TenantId>,
    /// Display name of the shop, when the issuer includes it.
    pub tenant_name: Option<String>,
    /// Access token expiry (`exp` claim).
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Whether this account may create and edit products.
    #[must_use]
    pub const fn can_manage_products(&self) -> bool {
        self.role.is_seller() && self.tenant_id.is_some()
    }

    /// Whether the access token's `exp` claim is in the past.
    ///
    /// Tokens without an expiry never report expired; the server's 401 is
    /// the authority either way.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Claims read from the token payload.
#[derive(Deserialize)]
struct Claims {
    user_id: UserId,
    #[serde(default)]
    username: Option<String>,
    role: Role,
    #[serde(default)]
    tenant_id: Option<TenantId>,
    #[serde(default)]
    tenant_name: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Decode the identity carried by an access token.
///
/// Returns `None` for anything that is not a three-segment token with a
/// base64url JSON payload containing at least `user_id` and `role`.
#[must_use]
pub fn decode_identity(token: &str) -> Option<Identity> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;

    Some(Identity {
        subject_id: claims.user_id,
        username: claims.username.unwrap_or_default(),
        role: claims.role,
        tenant_id: claims.tenant_id,
        tenant_name: claims.tenant_name,
        expires_at: claims.exp.and_then(|exp| DateTime::from_timestamp(exp, 0)),
    })
}

/// Build an unsigned token around `claims`, for tests.
#[cfg(test)]
pub(crate) fn unsigned_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_owner_token() {
        let token = unsigned_token(&json!({
            "user_id": 7,
            "username": "mira",
            "role": "OWNER",
            "tenant_id": 3,
            "tenant_name": "Mira's Ceramics",
            "exp": 1_900_000_000,
        }));

        let identity = decode_identity(&token).unwrap();
        assert_eq!(identity.subject_id, UserId::new(7));
        assert_eq!(identity.username, "mira");
        assert_eq!(identity.role, Role::Owner);
        assert_eq!(identity.tenant_id, Some(TenantId::new(3)));
        assert_eq!(identity.tenant_name.as_deref(), Some("Mira's Ceramics"));
        assert!(identity.can_manage_products());
        assert_eq!(identity.expires_at.unwrap().timestamp(), 1_900_000_000);
    }

    #[test]
    fn test_decode_customer_without_tenant() {
        let token = unsigned_token(&json!({
            "user_id": 9,
            "role": "CUSTOMER",
            "tenant_id": null,
        }));

        let identity = decode_identity(&token).unwrap();
        assert_eq!(identity.role, Role::Customer);
        assert_eq!(identity.tenant_id, None);
        assert_eq!(identity.username, "");
        assert!(!identity.can_manage_products());
        assert!(!identity.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_garbage_tokens_decode_to_none() {
        assert_eq!(decode_identity(""), None);
        assert_eq!(decode_identity("not-a-token"), None);
        assert_eq!(decode_identity("a.b"), None);
        assert_eq!(decode_identity("a.b.c.d"), None);
        assert_eq!(decode_identity("header.!!!.sig"), None);

        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode("hello"));
        assert_eq!(decode_identity(&not_json), None);
    }

    #[test]
    fn test_missing_required_claims_decode_to_none() {
        let no_role = unsigned_token(&json!({ "user_id": 1 }));
        assert_eq!(decode_identity(&no_role), None);

        let unknown_role = unsigned_token(&json!({ "user_id": 1, "role": "ADMIN" }));
        assert_eq!(decode_identity(&unknown_role), None);
    }

    #[test]
    fn test_expiry_check() {
        let token = unsigned_token(&json!({ "user_id": 1, "role": "STAFF", "exp": 1000 }));
        let identity = decode_identity(&token).unwrap();
        assert!(identity.is_expired_at(Utc::now()));
    }
}
