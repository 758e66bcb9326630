//! Persisted cart record.
//!
//! The cart is stored as a versioned envelope:
//!
//! ```json
//! { "version": 1, "lines": [ { "product_id": 1, "name": "Mug", "unit_price": "10.00", "quantity": 2 } ] }
//! ```
//!
//! A record with another version, a different shape, a zero quantity or a
//! repeated product id is corrupt.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::CartLine;
use crate::storage::{StorageError, keys};

/// Current record version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    lines: &'a [CartLine],
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    lines: Vec<CartLine>,
}

/// Serialize cart lines for storage.
pub fn encode(lines: &[CartLine]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&SnapshotRef {
        version: SNAPSHOT_VERSION,
        lines,
    })
}

/// Parse a stored cart record.
pub fn decode(raw: &str) -> Result<Vec<CartLine>, StorageError> {
    let corrupt = |reason: String| StorageError::CorruptPersistedState {
        key: keys::CART.to_string(),
        reason,
    };

    let snapshot: Snapshot = serde_json::from_str(raw).map_err(|e| corrupt(e.to_string()))?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(corrupt(format!(
            "unsupported version {}",
            snapshot.version
        )));
    }

    let mut seen = HashSet::with_capacity(snapshot.lines.len());
    for line in &snapshot.lines {
        if line.quantity == 0 {
            return Err(corrupt(format!(
                "zero quantity for product {}",
                line.product_id
            )));
        }
        if !seen.insert(line.product_id) {
            return Err(corrupt(format!(
                "duplicate line for product {}",
                line.product_id
            )));
        }
    }

    Ok(snapshot.lines)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use nexus_market_core::ProductId;

    fn mug(quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(1),
            name: "Mug".to_string(),
            unit_price: Decimal::new(1000, 2),
            quantity,
            vendor_label: Some("Clayworks".to_string()),
        }
    }

    #[test]
    fn test_encoded_record_layout() {
        let raw = encode(&[mug(2)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["version"], 1);
        assert_eq!(value["lines"][0]["unit_price"], "10.00");
        assert_eq!(value["lines"][0]["quantity"], 2);
        assert_eq!(decode(&raw).unwrap(), vec![mug(2)]);
    }

    #[test]
    fn test_rejects_unversioned_array() {
        // Bare array of lines, as written by older front ends
        let raw = r#"[{"id": 1, "name": "Mug", "price": 10, "quantity": 1}]"#;
        assert!(matches!(
            decode(raw),
            Err(StorageError::CorruptPersistedState { .. })
        ));
    }

    #[test]
    fn test_rejects_other_versions() {
        let raw = r#"{"version": 2, "lines": []}"#;
        let err = decode(raw).unwrap_err();
        assert!(err.to_string().contains("unsupported version 2"));
    }

    #[test]
    fn test_rejects_broken_invariants() {
        let zero = format!(r#"{{"version": 1, "lines": [{}]}}"#, serde_json::to_string(&mug(0)).unwrap());
        assert!(decode(&zero).is_err());

        let line = serde_json::to_string(&mug(1)).unwrap();
        let duplicate = format!(r#"{{"version": 1, "lines": [{line}, {line}]}}"#);
        assert!(decode(&duplicate).is_err());

        assert!(decode("not json").is_err());
    }
}
