//! Pure reservation algebra over cash and inventory.
//!
//! These are total functions over immutable value states: every call either
//! returns a new, fully invariant-checked state or a `DomainError`, and never
//! touches anything outside its arguments. Commands compose them; they never
//! reach into storage themselves.

use crate::error::{DomainError, Result};
use crate::types::{Cents, Qty};

/// A company's cash position, the subject of the cash reservation algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CashState {
    pub cash_cents: Cents,
    pub reserved_cash_cents: Cents,
}

impl CashState {
    pub fn available(&self) -> Cents {
        self.cash_cents - self.reserved_cash_cents
    }

    fn assert_invariants(&self) -> Result<()> {
        if self.cash_cents < 0 {
            return Err(DomainError::DomainInvariant(
                "cashCents must be non-negative".into(),
            ));
        }
        if self.reserved_cash_cents < 0 {
            return Err(DomainError::DomainInvariant(
                "reservedCashCents must be non-negative".into(),
            ));
        }
        if self.reserved_cash_cents > self.cash_cents {
            return Err(DomainError::DomainInvariant(
                "reservedCashCents must not exceed cashCents".into(),
            ));
        }
        Ok(())
    }
}

/// A single `(company, item, region)` inventory row, the subject of the
/// inventory reservation algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryState {
    pub quantity: Qty,
    pub reserved_quantity: Qty,
}

impl InventoryState {
    pub fn available(&self) -> Qty {
        self.quantity - self.reserved_quantity
    }

    fn assert_invariants(&self) -> Result<()> {
        if self.reserved_quantity < 0 {
            return Err(DomainError::DomainInvariant(
                "reservedQuantity must be non-negative".into(),
            ));
        }
        if self.reserved_quantity > self.quantity {
            return Err(DomainError::DomainInvariant(
                "reservedQuantity must not exceed quantity".into(),
            ));
        }
        Ok(())
    }
}

/// Reserve `qty * unit_price_cents` of cash for a BUY order. Fails with
/// `InsufficientFunds` rather than letting `available()` go negative.
pub fn reserve_cash_for_buy(
    state: CashState,
    qty: Qty,
    unit_price_cents: Cents,
) -> Result<CashState> {
    if qty <= 0 {
        return Err(DomainError::DomainInvariant(
            "quantity must be positive".into(),
        ));
    }
    if unit_price_cents <= 0 {
        return Err(DomainError::DomainInvariant(
            "unitPriceCents must be positive".into(),
        ));
    }
    let notional = qty as Cents * unit_price_cents;
    if state.available() < notional {
        return Err(DomainError::InsufficientFunds(format!(
            "available {} < required {}",
            state.available(),
            notional
        )));
    }
    let next = CashState {
        cash_cents: state.cash_cents,
        reserved_cash_cents: state.reserved_cash_cents + notional,
    };
    next.assert_invariants()?;
    Ok(next)
}

/// Release a previously-reserved amount of cash back to available, without
/// touching the underlying `cashCents`.
pub fn release_cash(state: CashState, amount_cents: Cents) -> Result<CashState> {
    if amount_cents < 0 {
        return Err(DomainError::DomainInvariant(
            "release amount must be non-negative".into(),
        ));
    }
    let next = CashState {
        cash_cents: state.cash_cents,
        reserved_cash_cents: state.reserved_cash_cents - amount_cents,
    };
    next.assert_invariants()?;
    Ok(next)
}

/// Settle a reservation: move `reserve_reduction_cents` out of the reserve and
/// `spend_cents` out of cash in the same step (used by trade settlement,
/// where price improvement means the two amounts can differ).
pub fn settle_cash(
    state: CashState,
    reserve_reduction_cents: Cents,
    spend_cents: Cents,
) -> Result<CashState> {
    if reserve_reduction_cents < 0 || spend_cents < 0 {
        return Err(DomainError::DomainInvariant(
            "settlement amounts must be non-negative".into(),
        ));
    }
    let next = CashState {
        cash_cents: state.cash_cents - spend_cents,
        reserved_cash_cents: state.reserved_cash_cents - reserve_reduction_cents,
    };
    next.assert_invariants()?;
    Ok(next)
}

/// Credit cash with no reservation effect (seller receiving trade proceeds,
/// operating-cost refunds never occur so this is one-directional in practice).
pub fn credit_cash(state: CashState, amount_cents: Cents) -> Result<CashState> {
    if amount_cents < 0 {
        return Err(DomainError::DomainInvariant(
            "credit amount must be non-negative".into(),
        ));
    }
    let next = CashState {
        cash_cents: state.cash_cents + amount_cents,
        reserved_cash_cents: state.reserved_cash_cents,
    };
    next.assert_invariants()?;
    Ok(next)
}

/// Debit cash directly (operating costs, salaries, fees, acquisitions) without
/// touching the reserve.
pub fn debit_cash(state: CashState, amount_cents: Cents) -> Result<CashState> {
    if amount_cents < 0 {
        return Err(DomainError::DomainInvariant(
            "debit amount must be non-negative".into(),
        ));
    }
    if state.cash_cents - amount_cents < state.reserved_cash_cents {
        return Err(DomainError::InsufficientFunds(format!(
            "available {} < required {}",
            state.available(),
            amount_cents
        )));
    }
    let next = CashState {
        cash_cents: state.cash_cents - amount_cents,
        reserved_cash_cents: state.reserved_cash_cents,
    };
    next.assert_invariants()?;
    Ok(next)
}

/// Reserve `qty` units of inventory for a SELL order.
pub fn reserve_inventory_for_sell(state: InventoryState, qty: Qty) -> Result<InventoryState> {
    if qty <= 0 {
        return Err(DomainError::DomainInvariant(
            "quantity must be positive".into(),
        ));
    }
    if state.available() < qty {
        return Err(DomainError::InsufficientInventory(format!(
            "available {} < required {}",
            state.available(),
            qty
        )));
    }
    let next = InventoryState {
        quantity: state.quantity,
        reserved_quantity: state.reserved_quantity + qty,
    };
    next.assert_invariants()?;
    Ok(next)
}

/// Release a previously-reserved quantity back to available.
pub fn release_inventory(state: InventoryState, qty: Qty) -> Result<InventoryState> {
    if qty < 0 {
        return Err(DomainError::DomainInvariant(
            "release quantity must be non-negative".into(),
        ));
    }
    let next = InventoryState {
        quantity: state.quantity,
        reserved_quantity: state.reserved_quantity - qty,
    };
    next.assert_invariants()?;
    Ok(next)
}

/// Consume `qty` units that were reserved: decrements both `quantity` and
/// `reservedQuantity`.
pub fn consume_inventory(state: InventoryState, qty: Qty) -> Result<InventoryState> {
    if qty < 0 {
        return Err(DomainError::DomainInvariant(
            "consume quantity must be non-negative".into(),
        ));
    }
    if state.reserved_quantity < qty {
        return Err(DomainError::InsufficientInventory(format!(
            "reserved {} < consumed {}",
            state.reserved_quantity, qty
        )));
    }
    let next = InventoryState {
        quantity: state.quantity - qty,
        reserved_quantity: state.reserved_quantity - qty,
    };
    next.assert_invariants()?;
    Ok(next)
}

/// Add unreserved quantity (production output, shipment arrival, trade fill).
pub fn add_inventory(state: InventoryState, qty: Qty) -> Result<InventoryState> {
    if qty < 0 {
        return Err(DomainError::DomainInvariant(
            "add quantity must be non-negative".into(),
        ));
    }
    let next = InventoryState {
        quantity: state.quantity + qty,
        reserved_quantity: state.reserved_quantity,
    };
    next.assert_invariants()?;
    Ok(next)
}

/// Remove unreserved quantity directly (shipment departure).
pub fn remove_inventory(state: InventoryState, qty: Qty) -> Result<InventoryState> {
    if qty < 0 {
        return Err(DomainError::DomainInvariant(
            "remove quantity must be non-negative".into(),
        ));
    }
    if state.available() < qty {
        return Err(DomainError::InsufficientInventory(format!(
            "available {} < required {}",
            state.available(),
            qty
        )));
    }
    let next = InventoryState {
        quantity: state.quantity - qty,
        reserved_quantity: state.reserved_quantity,
    };
    next.assert_invariants()?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_cash_for_buy_succeeds_within_budget() {
        let state = CashState {
            cash_cents: 1000,
            reserved_cash_cents: 0,
        };
        let next = reserve_cash_for_buy(state, 3, 50).unwrap();
        assert_eq!(next.reserved_cash_cents, 150);
        assert_eq!(next.available(), 850);
    }

    #[test]
    fn reserve_cash_for_buy_fails_when_insufficient() {
        let state = CashState {
            cash_cents: 100,
            reserved_cash_cents: 0,
        };
        let err = reserve_cash_for_buy(state, 3, 50).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientFunds(_)));
    }

    #[test]
    fn release_cash_restores_available() {
        let state = CashState {
            cash_cents: 1000,
            reserved_cash_cents: 150,
        };
        let next = release_cash(state, 150).unwrap();
        assert_eq!(next.reserved_cash_cents, 0);
        assert_eq!(next.cash_cents, 1000);
    }

    #[test]
    fn settle_cash_applies_price_improvement() {
        // Buyer reserved 120*4=480 but trade executes at 100 -> pays only 400.
        let state = CashState {
            cash_cents: 1000,
            reserved_cash_cents: 480,
        };
        let next = settle_cash(state, 480, 400).unwrap();
        assert_eq!(next.reserved_cash_cents, 0);
        assert_eq!(next.cash_cents, 600);
    }

    #[test]
    fn reserve_inventory_for_sell_fails_when_insufficient() {
        let state = InventoryState {
            quantity: 5,
            reserved_quantity: 0,
        };
        let err = reserve_inventory_for_sell(state, 10).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientInventory(_)));
    }

    #[test]
    fn consume_inventory_decrements_both_fields() {
        let state = InventoryState {
            quantity: 10,
            reserved_quantity: 4,
        };
        let next = consume_inventory(state, 4).unwrap();
        assert_eq!(next.quantity, 6);
        assert_eq!(next.reserved_quantity, 0);
    }

    #[test]
    fn debit_cash_respects_reserve() {
        let state = CashState {
            cash_cents: 500,
            reserved_cash_cents: 400,
        };
        // Available is only 100, so debiting 200 must fail even though
        // cashCents alone would cover it.
        let err = debit_cash(state, 200).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientFunds(_)));
        let ok = debit_cash(state, 100).unwrap();
        assert_eq!(ok.cash_cents, 400);
        assert_eq!(ok.reserved_cash_cents, 400);
    }
}
