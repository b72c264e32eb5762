//! Per-company, per-item, per-region inventory rows, plus the
//! regional storage-capacity check production, trading, and shipment arrival
//! all consult before adding stock.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::types::{InventoryKey, Qty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub key: InventoryKey,
    pub quantity: Qty,
    pub reserved_quantity: Qty,
}

impl InventoryRow {
    pub fn new(key: InventoryKey) -> Self {
        Self {
            key,
            quantity: 0,
            reserved_quantity: 0,
        }
    }

    pub fn state(&self) -> crate::reservation::InventoryState {
        crate::reservation::InventoryState {
            quantity: self.quantity,
            reserved_quantity: self.reserved_quantity,
        }
    }

    pub fn apply_state(&mut self, state: crate::reservation::InventoryState) {
        self.quantity = state.quantity;
        self.reserved_quantity = state.reserved_quantity;
    }
}

/// Assert that adding `additional_qty` of any good to a company's regional
/// stock would not exceed its storage capacity (base allowance plus active
/// warehouse slots). Capacity is regional, not per-item: all of a company's
/// holdings in a region share one pool.
pub fn assert_capacity(
    current_regional_total: Qty,
    additional_qty: Qty,
    capacity: Qty,
) -> Result<()> {
    let projected = current_regional_total + additional_qty;
    if projected > capacity {
        return Err(DomainError::DomainInvariant(format!(
            "regional storage capacity {capacity} exceeded by projected total {projected}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_capacity_rejects_overflow() {
        assert!(assert_capacity(900, 200, 1000).is_err());
        assert!(assert_capacity(900, 100, 1000).is_ok());
    }
}
