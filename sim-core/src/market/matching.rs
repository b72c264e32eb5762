//! Continuous limit order book matching with price-time priority.
//!
//! This module is pure: it only decides which resting orders an incoming
//! order crosses and at what price and quantity. Applying the resulting cash
//! and inventory movements is the caller's job (see `crate::world`), since
//! that step also has to append ledger entries and is where the atomicity
//! boundary actually lives.

use serde::{Deserialize, Serialize};

use crate::market::order::{MarketOrder, price_time_key};
use crate::types::{Cents, CompanyId, ItemId, MarketOrderId, Qty, RegionId, Side, TradeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub buy_order_id: MarketOrderId,
    pub sell_order_id: MarketOrderId,
    pub buyer_company_id: CompanyId,
    pub seller_company_id: CompanyId,
    pub item_id: ItemId,
    pub region_id: RegionId,
    #[serde(with = "crate::types::cents_as_string")]
    pub price_cents: Cents,
    pub quantity: Qty,
    pub tick: u64,
}

/// Match `incoming` against `resting`, the open orders on the opposite side
/// sorted by nothing in particular (this function sorts them itself by
/// price-time priority before walking). Returns trades in execution order and
/// the post-match `filled_quantity` for `incoming` and every resting order it
/// touched; callers apply both back onto their stored orders.
///
/// Execution price is always the resting order's limit price: the order
/// that was already on the book sets the price, matching how every
/// continuous double-auction book in the corpus prices a cross.
pub fn match_incoming_order(
    incoming: &MarketOrder,
    resting: &[MarketOrder],
    tick: u64,
    mut next_trade_id: impl FnMut() -> TradeId,
) -> (Vec<Trade>, Qty, Vec<(MarketOrderId, Qty)>) {
    let mut candidates: Vec<&MarketOrder> = resting
        .iter()
        .filter(|o| o.is_open() && o.item_id == incoming.item_id && o.region_id == incoming.region_id)
        .filter(|o| match incoming.side {
            Side::Buy => o.side == Side::Sell && o.limit_price_cents <= incoming.limit_price_cents,
            Side::Sell => o.side == Side::Buy && o.limit_price_cents >= incoming.limit_price_cents,
        })
        .collect();

    candidates.sort_by(|a, b| match incoming.side {
        // Best price first: lowest ask for an incoming buy, highest bid for
        // an incoming sell. Ties broken by price-time-then-id.
        Side::Buy => a
            .limit_price_cents
            .cmp(&b.limit_price_cents)
            .then_with(|| price_time_key(a).cmp(&price_time_key(b))),
        Side::Sell => b
            .limit_price_cents
            .cmp(&a.limit_price_cents)
            .then_with(|| price_time_key(a).cmp(&price_time_key(b))),
    });

    let mut trades = Vec::new();
    let mut fills: Vec<(MarketOrderId, Qty)> = Vec::new();
    let mut remaining = incoming.remaining_quantity();

    for resting_order in candidates {
        if remaining <= 0 {
            break;
        }
        let available = resting_order.remaining_quantity();
        if available <= 0 {
            continue;
        }
        let trade_qty = remaining.min(available);
        let (buy_id, sell_id, buyer_company_id, seller_company_id) = match incoming.side {
            Side::Buy => (incoming.id, resting_order.id, incoming.company_id, resting_order.company_id),
            Side::Sell => (resting_order.id, incoming.id, resting_order.company_id, incoming.company_id),
        };
        trades.push(Trade {
            id: next_trade_id(),
            buy_order_id: buy_id,
            sell_order_id: sell_id,
            buyer_company_id,
            seller_company_id,
            item_id: incoming.item_id,
            region_id: incoming.region_id,
            price_cents: resting_order.limit_price_cents,
            quantity: trade_qty,
            tick,
        });
        fills.push((resting_order.id, trade_qty));
        remaining -= trade_qty;
    }

    let incoming_filled = incoming.remaining_quantity() - remaining;
    (trades, incoming_filled, fills)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompanyId, ItemId, OrderStatus, RegionId};

    fn make_order(id: u64, side: Side, price: Cents, qty: Qty, tick: u64, created_at: i64) -> MarketOrder {
        MarketOrder {
            id: MarketOrderId::new(id),
            company_id: CompanyId::new(1),
            item_id: ItemId::new(1),
            region_id: RegionId::new(1),
            side,
            limit_price_cents: price,
            quantity: qty,
            filled_quantity: 0,
            status: OrderStatus::Open,
            tick_placed: tick,
            created_at,
        }
    }

    #[test]
    fn incoming_buy_crosses_resting_sell_at_resting_price() {
        let resting_sell = make_order(1, Side::Sell, 90, 10, 0, 0);
        let incoming_buy = make_order(2, Side::Buy, 100, 5, 1, 0);
        let mut next_id = 0u64;
        let (trades, filled, fills) = match_incoming_order(&incoming_buy, &[resting_sell], 1, || {
            next_id += 1;
            TradeId::new(next_id)
        });
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price_cents, 90);
        assert_eq!(trades[0].quantity, 5);
        assert_eq!(filled, 5);
        assert_eq!(fills, vec![(MarketOrderId::new(1), 5)]);
    }

    #[test]
    fn best_price_then_time_priority_is_respected() {
        let cheaper_later = make_order(1, Side::Sell, 90, 10, 2, 0);
        let same_price_earlier = make_order(2, Side::Sell, 90, 10, 1, 0);
        let pricier = make_order(3, Side::Sell, 95, 10, 0, 0);
        let incoming_buy = make_order(4, Side::Buy, 100, 15, 3, 0);
        let resting = vec![pricier, cheaper_later, same_price_earlier];
        let mut next_id = 0u64;
        let (trades, _filled, _fills) = match_incoming_order(&incoming_buy, &resting, 3, || {
            next_id += 1;
            TradeId::new(next_id)
        });
        assert_eq!(trades[0].sell_order_id, MarketOrderId::new(2));
        assert_eq!(trades[0].quantity, 10);
        assert_eq!(trades[1].sell_order_id, MarketOrderId::new(3));
        assert_eq!(trades[1].quantity, 5);
    }

    #[test]
    fn no_match_when_prices_do_not_cross() {
        let resting_sell = make_order(1, Side::Sell, 110, 10, 0, 0);
        let incoming_buy = make_order(2, Side::Buy, 100, 5, 1, 0);
        let mut next_id = 0u64;
        let (trades, filled, _) = match_incoming_order(&incoming_buy, &[resting_sell], 1, || {
            next_id += 1;
            TradeId::new(next_id)
        });
        assert!(trades.is_empty());
        assert_eq!(filled, 0);
    }
}
