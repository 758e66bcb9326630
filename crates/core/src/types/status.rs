//! Status enums for marketplace entities.

use serde::{Deserialize, Serialize};

/// Order lifecycle status as reported by the commerce API.
///
/// Unknown values deserialize to [`OrderStatus::Other`] so a server adding a
/// status never breaks order history listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    #[serde(other)]
    Other,
}

impl OrderStatus {
    /// Whether the order can still change state.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Paid | Self::Shipped)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Other => "Unknown",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_is_tolerated() {
        let status: OrderStatus = serde_json::from_str("\"REFUNDED\"").unwrap();
        assert_eq!(status, OrderStatus::Other);
    }

    #[test]
    fn test_known_status() {
        let status: OrderStatus = serde_json::from_str("\"SHIPPED\"").unwrap();
        assert_eq!(status, OrderStatus::Shipped);
        assert!(status.is_open());
        assert!(!OrderStatus::Cancelled.is_open());
    }
}
