//! Marketplace account roles.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a role string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role: {0} (expected OWNER, STAFF or CUSTOMER)")]
pub struct RoleParseError(pub String);

/// Account role carried in the access token claims.
///
/// Owners and staff belong to a tenant (a seller's shop) and may manage its
/// catalog; customers browse, fill a cart and place orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Store owner. Creates the tenant and manages its products.
    Owner,
    /// Staff member of a tenant.
    Staff,
    /// Shopper.
    #[default]
    Customer,
}

impl Role {
    /// Whether this role acts on behalf of a seller.
    #[must_use]
    pub const fn is_seller(self) -> bool {
        matches!(self, Self::Owner | Self::Staff)
    }

    /// Wire representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Staff => "STAFF",
            Self::Customer => "CUSTOMER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Ok(Self::Owner),
            "STAFF" => Ok(Self::Staff),
            "CUSTOMER" => Ok(Self::Customer),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"OWNER\"");
        let role: Role = serde_json::from_str("\"CUSTOMER\"").unwrap();
        assert_eq!(role, Role::Customer);
    }

    #[test]
    fn test_role_from_str_is_case_insensitive() {
        assert_eq!("staff".parse::<Role>().unwrap(), Role::Staff);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_is_seller() {
        assert!(Role::Owner.is_seller());
        assert!(Role::Staff.is_seller());
        assert!(!Role::Customer.is_seller());
    }
}
