//! Per-tick OHLC/VWAP candle aggregation.

use serde::{Deserialize, Serialize};

use crate::types::{Cents, ItemId, Qty, RegionId};

use super::matching::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub item_id: ItemId,
    pub region_id: RegionId,
    pub tick: u64,
    #[serde(with = "crate::types::cents_as_string")]
    pub open_cents: Cents,
    #[serde(with = "crate::types::cents_as_string")]
    pub high_cents: Cents,
    #[serde(with = "crate::types::cents_as_string")]
    pub low_cents: Cents,
    #[serde(with = "crate::types::cents_as_string")]
    pub close_cents: Cents,
    pub volume: Qty,
    #[serde(with = "crate::types::cents_as_string")]
    pub vwap_cents: Cents,
    pub trade_count: u32,
}

/// Integer half-up VWAP: `(sum(price*qty) + floor(sum(qty)/2)) / sum(qty)`,
/// so fractional-cent remainders round to the nearest cent rather than
/// truncating down every time.
pub fn vwap_cents(trades: &[(Cents, Qty)]) -> Cents {
    let total_qty: Qty = trades.iter().map(|(_, qty)| *qty).sum();
    if total_qty == 0 {
        return 0;
    }
    let notional: Cents = trades
        .iter()
        .map(|(price, qty)| *price * *qty as Cents)
        .sum();
    let half = total_qty as Cents / 2;
    (notional + half) / total_qty as Cents
}

/// Fold a tick's trades for one `(item, region)` pair into a single candle.
/// Trades must already be in execution order (the order `match_incoming_order`
/// produced them in) so `open`/`close` reflect the first and last fill.
pub fn build_candle(
    item_id: ItemId,
    region_id: RegionId,
    tick: u64,
    trades: &[Trade],
) -> Option<Candle> {
    let first = trades.first()?;
    let last = trades.last()?;
    let high = trades.iter().map(|t| t.price_cents).max().unwrap();
    let low = trades.iter().map(|t| t.price_cents).min().unwrap();
    let volume: Qty = trades.iter().map(|t| t.quantity).sum();
    let vwap = vwap_cents(
        &trades
            .iter()
            .map(|t| (t.price_cents, t.quantity))
            .collect::<Vec<_>>(),
    );
    Some(Candle {
        item_id,
        region_id,
        tick,
        open_cents: first.price_cents,
        high_cents: high,
        low_cents: low,
        close_cents: last.price_cents,
        volume,
        vwap_cents: vwap,
        trade_count: trades.len() as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketOrderId;

    fn trade(id: u64, price: Cents, qty: Qty) -> Trade {
        Trade {
            id: crate::types::TradeId::new(id),
            buy_order_id: MarketOrderId::new(1),
            sell_order_id: MarketOrderId::new(2),
            buyer_company_id: crate::types::CompanyId::new(1),
            seller_company_id: crate::types::CompanyId::new(2),
            item_id: ItemId::new(1),
            region_id: RegionId::new(1),
            price_cents: price,
            quantity: qty,
            tick: 0,
        }
    }

    #[test]
    fn vwap_rounds_half_up() {
        // (10*3 + 11*1) = 41, total_qty = 4, 41/4 = 10.25 -> rounds to 10.
        assert_eq!(vwap_cents(&[(10, 3), (11, 1)]), 10);
        // (10*1 + 11*1) = 21, total_qty = 2, 21/2 = 10.5 -> rounds up to 11.
        assert_eq!(vwap_cents(&[(10, 1), (11, 1)]), 11);
    }

    #[test]
    fn vwap_of_no_trades_is_zero() {
        assert_eq!(vwap_cents(&[]), 0);
    }

    #[test]
    fn build_candle_tracks_high_low_open_close() {
        let trades = vec![trade(1, 100, 2), trade(2, 120, 1), trade(3, 90, 3)];
        let candle = build_candle(ItemId::new(1), RegionId::new(1), 5, &trades).unwrap();
        assert_eq!(candle.open_cents, 100);
        assert_eq!(candle.close_cents, 90);
        assert_eq!(candle.high_cents, 120);
        assert_eq!(candle.low_cents, 90);
        assert_eq!(candle.volume, 6);
        assert_eq!(candle.trade_count, 3);
    }
}
