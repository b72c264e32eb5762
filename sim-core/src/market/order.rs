//! Market order entity and its place/cancel commands.

use serde::{Deserialize, Serialize};

use crate::types::{Cents, CompanyId, ItemId, MarketOrderId, OrderStatus, Qty, RegionId, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub id: MarketOrderId,
    pub company_id: CompanyId,
    pub item_id: ItemId,
    pub region_id: RegionId,
    pub side: Side,
    #[serde(with = "crate::types::cents_as_string")]
    pub limit_price_cents: Cents,
    pub quantity: Qty,
    pub filled_quantity: Qty,
    pub status: OrderStatus,
    pub tick_placed: u64,
    pub created_at: i64,
}

impl MarketOrder {
    pub fn remaining_quantity(&self) -> Qty {
        self.quantity - self.filled_quantity
    }

    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }
}

/// Deterministic total order over resting orders at the same price level:
/// earlier tick first, then earlier wall-clock creation, then lower id.
pub fn price_time_key(order: &MarketOrder) -> (u64, i64, u64) {
    (order.tick_placed, order.created_at, order.id.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: u64, tick: u64, created_at: i64) -> MarketOrder {
        MarketOrder {
            id: MarketOrderId::new(id),
            company_id: CompanyId::new(1),
            item_id: ItemId::new(1),
            region_id: RegionId::new(1),
            side: Side::Buy,
            limit_price_cents: 100,
            quantity: 10,
            filled_quantity: 0,
            status: OrderStatus::Open,
            tick_placed: tick,
            created_at,
        }
    }

    #[test]
    fn price_time_key_breaks_ties_by_tick_then_created_at_then_id() {
        let a = order(5, 1, 100);
        let b = order(3, 1, 101);
        let c = order(1, 2, 0);
        let mut keys = vec![price_time_key(&c), price_time_key(&b), price_time_key(&a)];
        keys.sort();
        assert_eq!(keys, vec![price_time_key(&a), price_time_key(&b), price_time_key(&c)]);
    }

    #[test]
    fn remaining_quantity_subtracts_fills() {
        let mut o = order(1, 0, 0);
        o.filled_quantity = 4;
        assert_eq!(o.remaining_quantity(), 6);
    }
}
